use std::time::Duration;

/// Largest doubling exponent; keeps the shift well inside `u32`.
const MAX_EXPONENT: u32 = 16;

/// Delay before the next relay cycle.
///
/// A single failure keeps the base interval. Each further consecutive
/// failure doubles it, capped at `max`, and the first success drops it back
/// to the base.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    consecutive_failures: u32,
}

impl Backoff {
    /// `max` below `base` is raised to `base`.
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            consecutive_failures: 0,
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn delay(&self) -> Duration {
        let exponent = self.consecutive_failures.saturating_sub(1).min(MAX_EXPONENT);
        let factor = 1u32 << exponent;
        self.base.saturating_mul(factor).min(self.max)
    }
}
