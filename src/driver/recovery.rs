//! Recovery policy
//!
//! Every wait stage shares one ladder: keep sampling in place while the
//! stage's own budget lasts, then spend the single hot-plug escalation
//! token, then report a sticky error and keep sampling. The token comes
//! back only when `Init` runs.

/// What to do once a stage's in-place budget is spent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Escalation {
    /// Toggle hot-plug and restart from the low window
    HotplugReset,
    /// Token already spent: record the stage's error and stay
    Sticky,
}

/// One-shot escalation token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecoveryPolicy {
    token: bool,
}

impl RecoveryPolicy {
    /// Policy with the token available
    pub const fn new() -> Self {
        Self { token: true }
    }

    /// Make the token available again
    pub fn rearm(&mut self) {
        self.token = true;
    }

    /// Escalate a stage failure, consuming the token if it is available
    pub fn escalate(&mut self) -> Escalation {
        if core::mem::take(&mut self.token) {
            Escalation::HotplugReset
        } else {
            Escalation::Sticky
        }
    }

    /// Token still available
    #[inline]
    pub fn can_reset(&self) -> bool {
        self.token
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_reset_then_sticky() {
        let mut policy = RecoveryPolicy::new();
        assert_eq!(policy.escalate(), Escalation::HotplugReset);
        assert_eq!(policy.escalate(), Escalation::Sticky);
        assert_eq!(policy.escalate(), Escalation::Sticky);
    }

    #[test]
    fn rearm_restores_token() {
        let mut policy = RecoveryPolicy::new();
        policy.escalate();
        policy.rearm();
        assert!(policy.can_reset());
        assert_eq!(policy.escalate(), Escalation::HotplugReset);
    }
}
