use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Internal UTC-instant source. Components depend on this rather than
/// calling `Utc::now()` directly so that tests can advance time
/// deterministically (spec.md §9, required for scenarios 2–5 of §8).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock: wall-clock UTC.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock: starts at a fixed instant and only moves when advanced.
#[derive(Clone)]
pub struct FixedClock {
    epoch_millis: Arc<AtomicI64>,
}

impl FixedClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            epoch_millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        self.epoch_millis
            .fetch_add(delta.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.epoch_millis.load(Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).expect("fixed clock millis always valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances_by_exact_delta() {
        let start = Utc::now();
        let clock = FixedClock::new(start);
        clock.advance(chrono::Duration::minutes(6));
        let elapsed = clock.now() - start;
        assert_eq!(elapsed.num_seconds(), 360);
    }

    #[test]
    fn fixed_clock_does_not_move_on_its_own() {
        let clock = FixedClock::new(Utc::now());
        let a = clock.now();
        let b = clock.now();
        assert_eq!(a, b);
    }
}
