//! Backoff policies and the wait-for-ready loop (spec §4.2, §6.4).

use std::time::{Duration, Instant};

/// A linear backoff schedule: start at `initial_ms`, add `step_ms` after each attempt, capped
/// at `cap_ms`.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub initial_ms: u32,
    pub step_ms: u32,
    pub cap_ms: u32,
}

impl Backoff {
    /// TEST UNIT READY-style polling: 100ms, +100ms, capped at 500ms.
    pub const POLLING: Backoff = Backoff {
        initial_ms: 100,
        step_ms: 100,
        cap_ms: 500,
    };

    /// WRITE(10)/WRITE(12) retry-on-busy: 0ms, +2ms, capped at 25ms.
    pub const WRITE: Backoff = Backoff {
        initial_ms: 0,
        step_ms: 2,
        cap_ms: 25,
    };

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let ms = self
            .initial_ms
            .saturating_add(self.step_ms.saturating_mul(attempt))
            .min(self.cap_ms);
        Duration::from_millis(u64::from(ms))
    }
}

/// How long a caller is willing to tolerate "LOGICAL UNIT NOT READY, CAUSE NOT REPORTABLE"
/// before treating the drive as stuck rather than merely slow to spin up.
pub const CAUSE_NOT_REPORTABLE_TOLERANCE: Duration = Duration::from_secs(5);

/// Tracks elapsed time against a command's timeout budget, independent of the backoff used
/// between attempts.
pub struct DeadlineClock {
    started: Instant,
    budget: Duration,
}

impl DeadlineClock {
    pub fn new(budget_ms: u32) -> Self {
        Self {
            started: Instant::now(),
            budget: Duration::from_millis(u64::from(budget_ms)),
        }
    }

    pub fn expired(&self) -> bool {
        self.started.elapsed() >= self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polling_backoff_caps() {
        assert_eq!(Backoff::POLLING.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(Backoff::POLLING.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(Backoff::POLLING.delay_for_attempt(10), Duration::from_millis(500));
    }

    #[test]
    fn write_backoff_starts_at_zero() {
        assert_eq!(Backoff::WRITE.delay_for_attempt(0), Duration::from_millis(0));
        assert_eq!(Backoff::WRITE.delay_for_attempt(20), Duration::from_millis(25));
    }

    #[test]
    fn deadline_clock_not_expired_immediately() {
        let clock = DeadlineClock::new(1_000);
        assert!(!clock.expired());
    }
}
