//! Typing indicator countdown.
//!
//! The indicator itself never sleeps. Arming hands out a generation number;
//! whoever runs the countdown reports back with [`TypingIndicator::expire`],
//! which only takes effect if no arm or disarm happened in between.

/// Single-shot, restartable typing indicator.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypingIndicator {
    generation: u64,
    active: bool,
}

impl TypingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the indicator and start a new countdown, replacing any pending
    /// one. Returns the generation the countdown must report back with.
    pub fn arm(&mut self) -> u64 {
        self.generation += 1;
        self.active = true;
        self.generation
    }

    /// Cancel any pending countdown and lower the indicator.
    pub fn disarm(&mut self) {
        self.generation += 1;
        self.active = false;
    }

    /// Countdown for `generation` elapsed. Returns `true` if it lowered the
    /// indicator; stale generations are ignored.
    pub fn expire(&mut self, generation: u64) -> bool {
        if generation != self.generation || !self.active {
            return false;
        }
        self.active = false;
        true
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_lowered() {
        assert!(!TypingIndicator::new().is_active());
    }

    #[test]
    fn expiry_lowers_armed_indicator() {
        let mut typing = TypingIndicator::new();
        let generation = typing.arm();
        assert!(typing.is_active());
        assert!(typing.expire(generation));
        assert!(!typing.is_active());
    }

    #[test]
    fn expiry_after_disarm_is_ignored() {
        let mut typing = TypingIndicator::new();
        let generation = typing.arm();
        typing.disarm();
        assert!(!typing.expire(generation));
        assert!(!typing.is_active());
    }

    #[test]
    fn rearm_invalidates_previous_countdown() {
        let mut typing = TypingIndicator::new();
        let first = typing.arm();
        let second = typing.arm();
        assert_ne!(first, second);

        assert!(!typing.expire(first));
        assert!(typing.is_active());
        assert!(typing.expire(second));
    }

    #[test]
    fn stale_expiry_after_disarm_and_rearm_is_ignored() {
        let mut typing = TypingIndicator::new();
        let stale = typing.arm();
        typing.disarm();
        let _current = typing.arm();
        assert!(!typing.expire(stale));
        assert!(typing.is_active());
    }
}
