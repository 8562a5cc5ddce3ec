//! Time source for credential verification
//!
//! Verification compares `exp` against a caller-provided `now`; services pass
//! [`SystemClock`], tests pass a [`ManualClock`] they can move forward.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{Duration, Utc};

/// Current time as Unix seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_recent() {
        // 2023-01-01T00:00:00Z
        assert!(SystemClock.now() > 1_672_531_200);
    }

    #[test]
    fn test_manual_clock_moves_only_on_request() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);

        clock.advance(Duration::seconds(25));
        assert_eq!(clock.now(), 125);

        clock.set(10);
        assert_eq!(clock.now(), 10);
    }
}
