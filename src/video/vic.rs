//! CTA-861 video identification codes
//!
//! Only the formats a receiver front-end is expected to classify are listed.
//! A lookup key is (active width, active height, interlace, 4:2:0); among
//! entries sharing a key the nominal frame rate closest to the measured one
//! wins.

/// Code reported when no entry matches
pub const VIC_UNKNOWN: u8 = 0;

/// Largest frame-rate distance accepted for a match (hundredths of a Hz)
const RATE_WINDOW: u32 = 200;

struct VicEntry {
    vic: u8,
    h_active: u16,
    v_active: u16,
    interlaced: bool,
    yuv420: bool,
    /// Nominal field/frame rate in hundredths of a Hz
    rate: u32,
}

const fn entry(vic: u8, h_active: u16, v_active: u16, interlaced: bool, rate: u32) -> VicEntry {
    VicEntry {
        vic,
        h_active,
        v_active,
        interlaced,
        yuv420: false,
        rate,
    }
}

const fn entry_420(vic: u8, h_active: u16, v_active: u16, rate: u32) -> VicEntry {
    VicEntry {
        vic,
        h_active,
        v_active,
        interlaced: false,
        yuv420: true,
        rate,
    }
}

#[rustfmt::skip]
const TABLE: &[VicEntry] = &[
    entry(1,   640,  480,  false, 6000),
    entry(2,   720,  480,  false, 6000),
    entry(4,   1280, 720,  false, 6000),
    entry(5,   1920, 1080, true,  6000),
    entry(6,   1440, 480,  true,  6000),
    entry(16,  1920, 1080, false, 6000),
    entry(17,  720,  576,  false, 5000),
    entry(19,  1280, 720,  false, 5000),
    entry(20,  1920, 1080, true,  5000),
    entry(21,  1440, 576,  true,  5000),
    entry(31,  1920, 1080, false, 5000),
    entry(32,  1920, 1080, false, 2400),
    entry(33,  1920, 1080, false, 2500),
    entry(34,  1920, 1080, false, 3000),
    entry(93,  3840, 2160, false, 2400),
    entry(94,  3840, 2160, false, 2500),
    entry(95,  3840, 2160, false, 3000),
    entry(96,  3840, 2160, false, 5000),
    entry(97,  3840, 2160, false, 6000),
    entry_420(96, 3840, 2160, 5000),
    entry_420(97, 3840, 2160, 6000),
];

/// Classify a measured timing.
///
/// `rate` is in hundredths of a Hz; zero means "not measured" and accepts
/// the first entry matching the other keys. Returns [`VIC_UNKNOWN`] when
/// nothing matches.
pub fn lookup(h_active: u16, v_active: u16, interlaced: bool, yuv420: bool, rate: u32) -> u8 {
    let mut candidates = TABLE.iter().filter(|e| {
        e.h_active == h_active
            && e.v_active == v_active
            && e.interlaced == interlaced
            && e.yuv420 == yuv420
    });

    if rate == 0 {
        return candidates.next().map_or(VIC_UNKNOWN, |e| e.vic);
    }

    candidates
        .map(|e| (e.rate.abs_diff(rate), e.vic))
        .filter(|&(distance, _)| distance <= RATE_WINDOW)
        .min_by_key(|&(distance, _)| distance)
        .map_or(VIC_UNKNOWN, |(_, vic)| vic)
}
