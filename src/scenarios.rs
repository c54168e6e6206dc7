//! End-to-end acquisition scenarios
//!
//! These drive a [`Receiver`] tick by tick against a [`MockBus`], servicing
//! the equalizer worker (and the repeater worker where relevant) between
//! ticks the way a firmware main loop would.

#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use std::vec::Vec;

use crate::driver::{DecodeStatus, ErrorCode, Receiver, RxConfig, RxState};
use crate::hal::Reg;
use crate::hdcp::{HdcpConfig, HdcpVersion, RepeaterAuthenticator, RepeaterOutcome};
use crate::phy::{EqConfig, EqualizerEngine};
use crate::sync::{AuthKind, RxEvent, Shared};
use crate::testing::{
    EqCurve, MockBus, MockDelay, MockDownstream, RecordingObserver, curve, ramp,
};

const SHORT_CABLE: [u32; 5] = [600, 600, 600, 600, 300];

/// Never equalizes and slides too shallowly for a long-cable verdict
fn unclassifiable() -> EqCurve {
    ramp(2000, 40)
}

struct Rig {
    rx: Receiver,
    bus: MockBus,
    delay: MockDelay,
    shared: Shared,
    obs: RecordingObserver,
    eq: EqualizerEngine,
}

impl Rig {
    fn new(cfg: RxConfig) -> Self {
        let mut bus = MockBus::new();
        bus.set(Reg::PowerPresent, 0b0001);
        bus.set_eq_curves([curve(&SHORT_CABLE); 3]);
        Self {
            rx: Receiver::new(cfg).unwrap(),
            bus,
            delay: MockDelay::new(),
            shared: Shared::new(),
            obs: RecordingObserver::default(),
            eq: EqualizerEngine::new(cfg.eq),
        }
    }

    /// Source sending 1920x1080p60 RGB with a locking PHY
    fn full_hd(mut self) -> Self {
        self.bus.set(Reg::ClockValid, 1);
        self.bus.set(Reg::PllLock, 1);
        self.bus.set(Reg::ColorDepth, 8);
        self.bus.set(Reg::HActive, 1920);
        self.bus.set(Reg::VActive, 1080);
        self.bus.set(Reg::HTotal, 2200);
        self.bus.set(Reg::VTotal, 1125);
        self.bus.set(Reg::FrameRate, 6000);
        self
    }

    fn curves(mut self, curves: [EqCurve; 3]) -> Self {
        self.bus.set_eq_curves(curves);
        self
    }

    fn tick(&mut self) -> RxState {
        let state = self
            .rx
            .tick(&mut self.bus, &self.shared, &mut self.obs)
            .unwrap();
        self.eq
            .service(&mut self.bus, &mut self.delay, &self.shared)
            .unwrap();
        state
    }

    /// Tick until `target`, returning the number of ticks taken
    fn run_until(&mut self, target: RxState) -> usize {
        for n in 1..=500 {
            if self.tick() == target {
                return n;
            }
        }
        panic!("never reached {target}, stuck in {}", self.rx.state());
    }
}

fn fast_config() -> RxConfig {
    RxConfig::new()
        .with_pow5v_debounce(1)
        .with_hotplug(2, 1)
        .with_hotplug_extend(1)
        .with_clock_budget(2, 10)
        .with_pll_budget(2, 10)
        .with_settle(1, 3)
        .with_timing_budget(10, 50)
        .with_unnormal_wait_max(3)
        .with_unready_max(2)
}

// =============================================================================
// Happy Path
// =============================================================================

#[test]
fn plug_to_signal_ready() {
    let mut rig = Rig::new(fast_config()).full_hd();

    rig.run_until(RxState::SignalReady);

    assert_eq!(
        rig.obs.path(),
        [
            RxState::Init,
            RxState::HotplugLow,
            RxState::HotplugHigh,
            RxState::WaitClockStable,
            RxState::EqualizeStart,
            RxState::WaitEqualizeDone,
            RxState::WaitPhyLock,
            RxState::WaitTimingStable,
            RxState::TimingStable,
            RxState::SignalReady,
        ]
    );
    assert_eq!(rig.rx.context().equalizer(), ([4, 4, 4], false));
    assert_eq!(rig.bus.writes_to(Reg::EqChannelSetting(1)), [4]);
    assert_eq!(rig.bus.writes_to(Reg::SoftReset), [1, 0]);
    assert_eq!(rig.bus.get(Reg::Hotplug(0)), 1);
    assert_eq!(rig.rx.error(), ErrorCode::None);

    let info = rig.rx.signal_info().unwrap();
    assert_eq!((info.width, info.height, info.vic), (1920, 1080, 16));
    assert!(!info.interlaced);
}

#[test]
fn timing_needs_ten_matching_samples() {
    let mut rig = Rig::new(fast_config()).full_hd();
    rig.run_until(RxState::TimingStable);

    for _ in 0..9 {
        assert_eq!(rig.tick(), RxState::TimingStable);
    }
    assert_eq!(rig.tick(), RxState::SignalReady);
}

#[test]
fn frames_skipped_then_delivered() {
    let mut rig = Rig::new(fast_config()).full_hd();
    rig.rx.open(&mut rig.bus, 0).unwrap();
    rig.rx.start(16).unwrap();
    rig.run_until(RxState::SignalReady);

    assert!(rig.rx.check_frame_skip());
    assert_eq!(rig.rx.decode_isr(0), DecodeStatus::Skip);

    for frame in 1..=6 {
        rig.tick();
        rig.rx.decode_isr(frame);
    }
    assert!(!rig.rx.check_frame_skip());
    assert_eq!(rig.rx.decode_isr(7), DecodeStatus::Ok);
    assert_eq!(rig.rx.decode_isr(7), DecodeStatus::Skip);
}

#[test]
fn audio_change_reported_once() {
    let mut rig = Rig::new(fast_config()).full_hd();
    rig.run_until(RxState::SignalReady);

    rig.bus.set(Reg::AudioSampleRate, 48_000);
    for _ in 0..5 {
        rig.tick();
    }

    assert_eq!(rig.obs.audio.len(), 1);
    assert_eq!(rig.obs.audio[0].sample_rate, 48_000);
    assert_eq!(rig.rx.context().audio().sample_rate, 48_000);
}

// =============================================================================
// Stability Gates
// =============================================================================

#[test]
fn clock_needs_consecutive_good_samples() {
    let mut rig = Rig::new(fast_config().with_clock_budget(3, 10)).full_hd();
    rig.run_until(RxState::WaitClockStable);

    rig.bus.queue_reads(Reg::ClockValid, &[1, 1, 0, 1, 1]);
    for _ in 0..5 {
        assert_eq!(rig.tick(), RxState::WaitClockStable);
    }
    // third consecutive good sample after the glitch
    assert_eq!(rig.tick(), RxState::EqualizeStart);
}

#[test]
fn retry_counters_monotonic_and_reset_on_entry() {
    let cfg = fast_config().with_clock_budget(3, 6);
    let mut rig = Rig::new(cfg).full_hd();
    rig.bus.set(Reg::ClockValid, 0);
    rig.run_until(RxState::WaitClockStable);

    rig.bus.queue_reads(Reg::ClockValid, &[0, 1, 0, 1, 0, 0, 1, 0]);
    let mut last = rig.rx.context().clock_counter().unstable();
    assert_eq!(last, 0);
    while rig.tick() == RxState::WaitClockStable {
        let now = rig.rx.context().clock_counter().unstable();
        assert!(now >= last);
        last = now;
    }

    // hot-plug escalation, then the counter starts over
    assert_eq!(rig.rx.state(), RxState::HotplugLow);
    rig.run_until(RxState::WaitClockStable);
    assert_eq!(rig.rx.context().clock_counter().unstable(), 0);
}

#[test]
fn unnormal_format_waits_then_proceeds() {
    let mut rig = Rig::new(fast_config()).full_hd();
    rig.bus.set(Reg::HActive, 1000);
    rig.bus.set(Reg::VActive, 700);
    rig.run_until(RxState::TimingStable);

    // ten matching samples, then three more for the unknown VIC
    for _ in 0..12 {
        assert_eq!(rig.tick(), RxState::TimingStable);
    }
    assert_eq!(rig.tick(), RxState::SignalReady);
    assert_eq!(rig.rx.signal_info().map(|i| i.vic), Some(0));
}

#[test]
fn pll_drop_while_sampling_relocks() {
    let mut rig = Rig::new(fast_config()).full_hd();
    rig.run_until(RxState::TimingStable);

    rig.bus.queue_reads(Reg::PllLock, &[0]);
    assert_eq!(rig.tick(), RxState::WaitPhyLock);
    rig.run_until(RxState::SignalReady);
}

// =============================================================================
// Recovery
// =============================================================================

#[test]
fn init_is_idempotent() {
    let mut rig = Rig::new(fast_config().with_hdcp22(true)).full_hd();
    rig.run_until(RxState::WaitClockStable);

    rig.rx.init(&mut rig.bus, &rig.shared).unwrap();
    let once = rig.rx.context().clone();
    let hotplug = rig.bus.get(Reg::Hotplug(0));
    let ready = rig.bus.get(Reg::Hdcp22Ready);

    rig.rx.init(&mut rig.bus, &rig.shared).unwrap();
    assert_eq!(*rig.rx.context(), once);
    assert_eq!(rig.bus.get(Reg::Hotplug(0)), hotplug);
    assert_eq!(rig.bus.get(Reg::Hdcp22Ready), ready);
    assert!(!rig.shared.hotplug_asserted());
    assert!(rig.rx.can_escalate());
}

#[test]
fn power_loss_during_phy_lock() {
    let mut rig = Rig::new(fast_config()).full_hd();
    rig.bus.set(Reg::PllLock, 0);
    rig.run_until(RxState::WaitPhyLock);
    rig.tick();
    assert!(rig.rx.context().pll_counter().unstable() > 0);

    rig.bus.set(Reg::PowerPresent, 0);
    assert_eq!(rig.tick(), RxState::PowerLost);

    assert_eq!(rig.rx.error(), ErrorCode::PowerLost);
    assert_eq!(rig.bus.get(Reg::Hotplug(0)), 0);
    assert!(!rig.shared.hotplug_asserted());
    assert_eq!(rig.rx.context().pll_counter().unstable(), 0);
    assert_eq!(rig.rx.context().clock_counter().unstable(), 0);

    // power back, lock this time
    rig.bus.set(Reg::PllLock, 1);
    rig.bus.set(Reg::PowerPresent, 1);
    assert_eq!(rig.tick(), RxState::Init);
    rig.run_until(RxState::SignalReady);
    assert_eq!(rig.rx.error(), ErrorCode::None);
}

#[test]
fn equalizer_exhaustion_still_reaches_phy_lock() {
    let mut rig = Rig::new(fast_config())
        .full_hd()
        .curves([unclassifiable(); 3]);

    rig.run_until(RxState::WaitPhyLock);

    assert_eq!(rig.rx.context().equalizer(), ([7, 7, 7], true));
    assert_eq!(rig.eq.report().attempts, 3);
    assert_eq!(rig.bus.writes_to(Reg::EqChannelSetting(0)), [7]);
}

#[test]
fn signal_loss_unwinds_to_clock_wait() {
    let mut rig = Rig::new(fast_config()).full_hd();
    rig.run_until(RxState::SignalReady);
    rig.shared.events.post(RxEvent::AksvReceived);
    assert_eq!(rig.tick(), RxState::SignalReady);
    assert_eq!(rig.rx.context().hdcp_version(), HdcpVersion::V14);

    rig.bus.set(Reg::PllLock, 0);
    // unready_max = 2: the third bad sample unwinds
    assert_eq!(rig.tick(), RxState::SignalReady);
    assert_eq!(rig.rx.error(), ErrorCode::TimingChanged);
    assert_eq!(rig.tick(), RxState::SignalReady);
    assert_eq!(rig.tick(), RxState::WaitClockStable);

    assert_eq!(rig.rx.context().hdcp_version(), HdcpVersion::V14);
    assert_eq!(rig.obs.errors, [ErrorCode::TimingChanged]);
}

#[test]
fn edid_update_restarts_acquisition() {
    let mut rig = Rig::new(fast_config()).full_hd();
    rig.run_until(RxState::SignalReady);

    rig.shared.events.post(RxEvent::EdidUpdated);
    assert_eq!(rig.tick(), RxState::Init);
    assert!(rig.rx.context().edid_pending());

    rig.run_until(RxState::WaitTimingStable);
    // EDID settle window is 3 ticks
    assert_eq!(rig.tick(), RxState::WaitTimingStable);
    assert_eq!(rig.tick(), RxState::WaitTimingStable);
    assert_eq!(rig.tick(), RxState::TimingStable);
    assert!(!rig.rx.context().edid_pending());
}

#[test]
fn port_switch_restarts_or_drops() {
    let mut rig = Rig::new(fast_config()).full_hd();
    rig.bus.set(Reg::PowerPresent, 0b0011);
    rig.run_until(RxState::SignalReady);

    rig.rx.open(&mut rig.bus, 1).unwrap();
    assert_eq!(rig.tick(), RxState::Init);
    rig.run_until(RxState::SignalReady);
    assert_eq!(rig.rx.port(), 1);

    rig.rx.close().unwrap();
    rig.rx.open(&mut rig.bus, 2).unwrap();
    assert_eq!(rig.tick(), RxState::PowerLost);
}

#[test]
fn missing_key_reported_once() {
    let mut rig = Rig::new(fast_config()).full_hd();
    rig.bus.set(Reg::Hdcp14Status, 1);
    rig.run_until(RxState::SignalReady);
    for _ in 0..5 {
        rig.tick();
    }

    let missing: Vec<_> = rig
        .obs
        .errors
        .iter()
        .filter(|&&e| e == ErrorCode::MissingKey)
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(rig.rx.error(), ErrorCode::MissingKey);
}

// =============================================================================
// Repeater
// =============================================================================

const KSV_A: [u8; 5] = [0x11, 0x22, 0x33, 0x44, 0x55];
const KSV_B: [u8; 5] = [0xA1, 0xB2, 0xC3, 0xD4, 0xE5];

fn repeater_rig(hdcp: HdcpConfig) -> (Rig, RepeaterAuthenticator) {
    let mut rig = Rig::new(fast_config().with_hdcp(hdcp)).full_hd();
    let rep = RepeaterAuthenticator::new(rig.rx.config().hdcp);
    rig.rx.enable_hdcp(&mut rig.bus).unwrap();
    rig.rx.set_repeater(&mut rig.bus, &rig.shared, true).unwrap();
    (rig, rep)
}

#[test]
fn repeater_forwards_downstream_list() {
    let (mut rig, mut rep) = repeater_rig(HdcpConfig::new());
    let mut down = MockDownstream::with_ksvs(&[KSV_A, KSV_B]);
    rig.bus.set(Reg::VPrimeReady, 1);

    rig.shared.events.post(RxEvent::AksvReceived);
    rig.tick();
    rep.service(&mut rig.bus, &mut rig.delay, &rig.shared, &mut down)
        .unwrap();

    assert_eq!(rep.outcome(), Some(RepeaterOutcome::ListReady));
    assert_eq!(rig.bus.fifo_entries(), [KSV_A, KSV_B]);
    assert_eq!(rig.bus.writes_to(Reg::KsvListReady), [0, 1]);
    assert_eq!(rig.bus.get(Reg::RepeaterDeviceCount), 2);
    assert!(!rig.shared.auth.in_progress());
}

#[test]
fn repeater_empty_topology_not_ready() {
    let (mut rig, mut rep) = repeater_rig(HdcpConfig::new());
    let mut down = MockDownstream::with_ksvs(&[]);

    rig.shared.events.post(RxEvent::AksvReceived);
    rig.tick();
    rep.service(&mut rig.bus, &mut rig.delay, &rig.shared, &mut down)
        .unwrap();

    assert_eq!(rep.outcome(), Some(RepeaterOutcome::EmptyTopology));
    assert!(!rig.bus.writes_to(Reg::KsvListReady).contains(&1));
}

#[test]
fn repeater_timeout_asserted_once() {
    let (mut rig, mut rep) = repeater_rig(HdcpConfig::new().with_ksv_wait(2, 5));
    let mut down = MockDownstream::with_ksvs(&[KSV_A]);
    rig.bus.set(Reg::KsvWaiting, 1);

    rig.shared.events.post(RxEvent::AksvReceived);
    rig.tick();
    rep.service(&mut rig.bus, &mut rig.delay, &rig.shared, &mut down)
        .unwrap();
    assert!(rig.shared.auth.is_busy(AuthKind::Hdcp14));

    for _ in 0..20 {
        rep.service(&mut rig.bus, &mut rig.delay, &rig.shared, &mut down)
            .unwrap();
    }

    let asserted = rig
        .bus
        .writes_to(Reg::KsvTimeout)
        .into_iter()
        .filter(|&v| v == 1)
        .count();
    assert_eq!(asserted, 1);
    assert_eq!(rep.outcome(), Some(RepeaterOutcome::Timeout));
    assert!(!rig.shared.auth.in_progress());
    assert_eq!(down.topology_reads, 0);
}

#[test]
fn aksv_ignored_by_repeater_when_disabled() {
    let (mut rig, mut rep) = repeater_rig(HdcpConfig::new());
    let mut down = MockDownstream::with_ksvs(&[KSV_A]);
    rig.rx.set_repeater(&mut rig.bus, &rig.shared, false).unwrap();

    rig.shared.events.post(RxEvent::AksvReceived);
    rig.tick();
    rep.service(&mut rig.bus, &mut rig.delay, &rig.shared, &mut down)
        .unwrap();

    assert_eq!(rep.outcome(), None);
    assert_eq!(rig.rx.context().hdcp_version(), HdcpVersion::V14);
}

#[test]
fn equalizer_uses_configured_thresholds() {
    let eq = EqConfig::new().with_error_setting(5);
    let mut rig = Rig::new(fast_config().with_eq(eq))
        .full_hd()
        .curves([unclassifiable(); 3]);

    rig.run_until(RxState::WaitPhyLock);
    assert_eq!(rig.rx.context().equalizer(), ([5, 5, 5], true));
}

#[test]
fn flat_cable_settles_on_short_default() {
    let mut rig = Rig::new(fast_config())
        .full_hd()
        .curves([curve(&[1000]); 3]);

    rig.run_until(RxState::WaitPhyLock);
    assert_eq!(rig.rx.context().equalizer(), ([4, 4, 4], false));
    assert_eq!(rig.eq.report().attempts, 1);
}

// =============================================================================
// Recovery Ladder
// =============================================================================

/// Ticks in `state` until the bad-sample budget of 10 runs out
fn exhaust(
    rig: &mut Rig,
    state: RxState,
    mut bad_sample: impl FnMut(&mut MockBus, usize),
) -> RxState {
    for i in 0..10 {
        bad_sample(&mut rig.bus, i);
        assert_eq!(rig.tick(), state, "sample {i}");
    }
    bad_sample(&mut rig.bus, 10);
    rig.tick()
}

#[test]
fn phy_unlock_escalates_once_then_sticks() {
    let mut rig = Rig::new(fast_config()).full_hd();
    rig.bus.set(Reg::PllLock, 0);
    rig.run_until(RxState::WaitPhyLock);

    assert_eq!(exhaust(&mut rig, RxState::WaitPhyLock, |_, _| {}), RxState::HotplugLow);
    assert!(!rig.rx.can_escalate());
    assert_eq!(rig.rx.error(), ErrorCode::None);

    rig.run_until(RxState::WaitPhyLock);
    assert_eq!(exhaust(&mut rig, RxState::WaitPhyLock, |_, _| {}), RxState::WaitPhyLock);
    for _ in 0..20 {
        assert_eq!(rig.tick(), RxState::WaitPhyLock);
    }
    assert_eq!(rig.rx.error(), ErrorCode::PhyUnlock);
    assert_eq!(rig.obs.errors, [ErrorCode::PhyUnlock]);
    assert!(rig.bus.writes_to(Reg::SoftReset).is_empty());

    // only Init hands the token back
    rig.shared.events.post(RxEvent::EdidUpdated);
    assert_eq!(rig.tick(), RxState::Init);
    rig.tick();
    assert!(rig.rx.can_escalate());
    assert_eq!(rig.rx.error(), ErrorCode::None);
    rig.run_until(RxState::WaitPhyLock);
    assert_eq!(exhaust(&mut rig, RxState::WaitPhyLock, |_, _| {}), RxState::HotplugLow);
}

#[test]
fn timing_instability_escalates_once_then_sticks() {
    fn flapping(bus: &mut MockBus, i: usize) {
        bus.set(Reg::HActive, if i % 2 == 0 { 1280 } else { 1920 });
    }

    let mut rig = Rig::new(fast_config().with_timing_budget(10, 10)).full_hd();
    rig.run_until(RxState::TimingStable);

    assert_eq!(exhaust(&mut rig, RxState::TimingStable, flapping), RxState::HotplugLow);
    assert!(!rig.rx.can_escalate());

    rig.bus.set(Reg::HActive, 1920);
    rig.run_until(RxState::TimingStable);
    assert_eq!(exhaust(&mut rig, RxState::TimingStable, flapping), RxState::TimingStable);
    for i in 0..20 {
        flapping(&mut rig.bus, i + 1);
        assert_eq!(rig.tick(), RxState::TimingStable);
    }
    assert_eq!(rig.rx.error(), ErrorCode::TimingUnstable);
    assert_eq!(rig.obs.errors, [ErrorCode::TimingUnstable]);

    rig.bus.set(Reg::HActive, 1920);
    rig.shared.events.post(RxEvent::EdidUpdated);
    assert_eq!(rig.tick(), RxState::Init);
    rig.tick();
    assert!(rig.rx.can_escalate());
    rig.run_until(RxState::SignalReady);
    assert_eq!(rig.rx.error(), ErrorCode::None);
}
