//! Time sources for tick timestamps

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

const NANOS_PER_SECOND: f64 = 1e9;

/// Time provider trait for dependency injection and testing
pub trait TimeProvider: Send + Sync {
    fn now_nanos(&self) -> u64;

    fn now_micros(&self) -> u64 {
        self.now_nanos() / 1000
    }

    fn now_seconds(&self) -> f64 {
        self.now_nanos() as f64 / NANOS_PER_SECOND
    }
}

/// Monotonic provider counting from its own creation
pub struct MonotonicTimeProvider {
    origin: Instant,
}

impl MonotonicTimeProvider {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for MonotonicTimeProvider {
    fn now_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Mock time provider for deterministic testing
pub struct MockTimeProvider {
    current_time: AtomicU64,
}

impl MockTimeProvider {
    pub fn new(initial_time_nanos: u64) -> Self {
        Self {
            current_time: AtomicU64::new(initial_time_nanos),
        }
    }

    pub fn advance_by(&self, nanos: u64) {
        self.current_time.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn advance_by_seconds(&self, seconds: f64) {
        self.advance_by((seconds * NANOS_PER_SECOND) as u64);
    }

    pub fn set_time(&self, nanos: u64) {
        self.current_time.store(nanos, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_nanos(&self) -> u64 {
        self.current_time.load(Ordering::Relaxed)
    }
}

pub fn current_timestamp_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_advances() {
        let clock = MockTimeProvider::new(0);
        clock.advance_by_seconds(1.5);
        assert_eq!(clock.now_nanos(), 1_500_000_000);
        assert!((clock.now_seconds() - 1.5).abs() < 1e-12);

        clock.set_time(2_000);
        assert_eq!(clock.now_micros(), 2);
    }

    #[test]
    fn test_monotonic_provider_never_goes_back() {
        let clock = MonotonicTimeProvider::new();
        let first = clock.now_nanos();
        let second = clock.now_nanos();
        assert!(second >= first);
    }

    #[test]
    fn test_unix_timestamp_is_after_epoch() {
        assert!(current_timestamp_nanos() > 0);
    }
}
