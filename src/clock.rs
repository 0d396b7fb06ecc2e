//! Injected time source, so timeout and scheduling logic can be driven by a
//! fake clock in tests instead of monkey-patching `SystemTime`/`Instant`.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// A source of wall-clock time.
///
/// Production code uses [`SystemClock`]; tests construct a [`FakeClock`] and
/// advance it explicitly, so timeout/scheduling paths are deterministic.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> chrono::DateTime<chrono::Utc>;
}

/// Real wall-clock time via `SystemTime::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::Utc::now()
    }
}

/// A clock that only advances when told to. Used in tests for idle-timeout,
/// cleanup-scheduler, and auto-update window logic.
#[derive(Debug)]
pub struct FakeClock {
    now: std::sync::Mutex<chrono::DateTime<chrono::Utc>>,
}

impl FakeClock {
    pub fn new(start: chrono::DateTime<chrono::Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: std::sync::Mutex::new(start),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("fake clock mutex poisoned");
        *now += chrono::Duration::from_std(by).expect("duration fits in chrono::Duration");
    }

    pub fn set(&self, to: chrono::DateTime<chrono::Utc>) {
        *self.now.lock().expect("fake clock mutex poisoned") = to;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        *self.now.lock().expect("fake clock mutex poisoned")
    }
}

/// Returns true when `current_hour` falls inside the half-open window
/// `[start_hour, end_hour)`, wrapping across midnight when `start_hour >
/// end_hour`. `start_hour == end_hour` means "always active".
///
/// Used by the cleanup scheduler's log-retention gate and the auto-update
/// coordinator's `scheduled` mode.
pub fn hour_in_active_window(current_hour: u32, start_hour: u32, end_hour: u32) -> bool {
    if start_hour == end_hour {
        return true;
    }
    if start_hour < end_hour {
        current_hour >= start_hour && current_hour < end_hour
    } else {
        current_hour >= start_hour || current_hour < end_hour
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_wrapping_window() {
        assert!(!hour_in_active_window(1, 2, 5));
        assert!(hour_in_active_window(2, 2, 5));
        assert!(hour_in_active_window(4, 2, 5));
        assert!(!hour_in_active_window(5, 2, 5));
    }

    #[test]
    fn midnight_wrapping_window() {
        // {22, 5}: 23 is inside, 6 is outside.
        assert!(hour_in_active_window(23, 22, 5));
        assert!(hour_in_active_window(3, 22, 5));
        assert!(!hour_in_active_window(6, 22, 5));
        assert!(!hour_in_active_window(12, 22, 5));
    }

    #[test]
    fn equal_start_end_is_always_active() {
        for hour in 0..24 {
            assert!(hour_in_active_window(hour, 9, 9));
        }
    }

    #[test]
    fn fake_clock_advances_deterministically() {
        let start = "2026-01-01T00:00:00Z".parse().unwrap();
        let clock = FakeClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(Duration::from_secs(3600));
        assert_eq!(clock.now(), start + chrono::Duration::hours(1));
    }
}
