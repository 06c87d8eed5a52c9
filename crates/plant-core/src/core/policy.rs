//! Reconnect policy for telemetry sessions.

use std::time::Duration;

/// Bounded retry policy
///
/// A session makes one initial connect and then at most `max_attempts`
/// reconnects. The delay before reconnect `n` (1-based) is
/// `initial_delay * multiplier^(n-1)`, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl ReconnectPolicy {
    /// Same delay before every attempt.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
        }
    }

    /// Delay that doubles per attempt up to `max_delay`.
    pub fn exponential(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            multiplier: 2.0,
        }
    }

    /// Delay to wait before reconnect `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        if exponent == 0 || self.multiplier <= 1.0 {
            return self.initial_delay;
        }
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64().max(self.initial_delay.as_secs_f64()));
        Duration::from_secs_f64(capped)
    }

    /// Whether reconnect `attempt` (1-based) is still allowed.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(5, Duration::from_secs(1))
    }
}
