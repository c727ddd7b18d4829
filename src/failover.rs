//! Failover state: which broker handles this call and every call after it.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Operating mode of a distributor instance.
///
/// The transition is one-directional: once Degraded, the instance stays on
/// the mock broker for the rest of its life. There is no recovery probe back
/// to Normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Normal,
    Degraded,
}

impl Mode {
    /// Next mode given whether the attempted broker call failed.
    pub fn on_outcome(self, failed: bool) -> Mode {
        match (self, failed) {
            (Mode::Normal, true) => Mode::Degraded,
            (mode, _) => mode,
        }
    }

    pub fn is_degraded(self) -> bool {
        self == Mode::Degraded
    }
}

/// Sticky mode flag shared by all callers of one distributor instance.
///
/// Two threads may race to flip it; last-writer-wins is fine because the
/// flag only ever moves Normal -> Degraded.
pub struct FailoverPolicy {
    degraded: AtomicBool,
}

impl FailoverPolicy {
    pub fn new(initial: Mode) -> Self {
        Self {
            degraded: AtomicBool::new(initial.is_degraded()),
        }
    }

    pub fn mode(&self) -> Mode {
        if self.degraded.load(Ordering::SeqCst) {
            Mode::Degraded
        } else {
            Mode::Normal
        }
    }

    /// Record a failed broker call: Normal becomes Degraded, permanently.
    pub fn record_failure(&self) {
        self.degraded.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_degrades_normal_mode() {
        assert_eq!(Mode::Normal.on_outcome(true), Mode::Degraded);
        assert_eq!(Mode::Normal.on_outcome(false), Mode::Normal);
    }

    #[test]
    fn degraded_mode_never_recovers() {
        assert_eq!(Mode::Degraded.on_outcome(false), Mode::Degraded);
        assert_eq!(Mode::Degraded.on_outcome(true), Mode::Degraded);
    }

    #[test]
    fn policy_flag_is_sticky() {
        let policy = FailoverPolicy::new(Mode::Normal);
        assert_eq!(policy.mode(), Mode::Normal);

        policy.record_failure();
        assert_eq!(policy.mode(), Mode::Degraded);

        // A second failure changes nothing.
        policy.record_failure();
        assert_eq!(policy.mode(), Mode::Degraded);
    }

    #[test]
    fn policy_honors_initial_mode() {
        let policy = FailoverPolicy::new(Mode::Degraded);
        assert_eq!(policy.mode(), Mode::Degraded);
    }
}
