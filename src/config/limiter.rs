//! Limiter configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::limiter::DEFAULT_DRAIN_DELAY;

/// Configuration for a [`RateLimiter`](crate::core::RateLimiter).
///
/// The rate, interval, capacity, initial balance, and drain-retry delay are
/// the whole configuration surface of the limiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Tokens credited per elapsed interval.
    pub rate_per_interval: u64,
    /// Length of one replenishment interval. Must be non-zero.
    pub interval: Duration,
    /// Maximum token balance (burst size).
    pub capacity: u64,
    /// Starting balance, clamped to `capacity`.
    #[serde(default)]
    pub initial_tokens: u64,
    /// Fixed delay between drain attempts over the deferred queue.
    #[serde(default = "default_drain_delay")]
    pub drain_delay: Duration,
}

fn default_drain_delay() -> Duration {
    DEFAULT_DRAIN_DELAY
}

impl RateLimiterConfig {
    /// Create a configuration with no initial tokens and the default drain
    /// delay.
    #[must_use]
    pub const fn new(rate_per_interval: u64, interval: Duration, capacity: u64) -> Self {
        Self {
            rate_per_interval,
            interval,
            capacity,
            initial_tokens: 0,
            drain_delay: DEFAULT_DRAIN_DELAY,
        }
    }

    /// Set the starting token balance.
    #[must_use]
    pub const fn with_initial_tokens(mut self, initial_tokens: u64) -> Self {
        self.initial_tokens = initial_tokens;
        self
    }

    /// Override the fixed drain-retry delay.
    #[must_use]
    pub const fn with_drain_delay(mut self, drain_delay: Duration) -> Self {
        self.drain_delay = drain_delay;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        if self.interval.is_zero() {
            return Err("interval must be greater than zero".into());
        }
        if self.rate_per_interval == 0 {
            return Err("rate_per_interval must be greater than zero".into());
        }
        if self.drain_delay.is_zero() {
            return Err("drain_delay must be greater than zero".into());
        }
        Ok(())
    }

    /// Parse a limiter configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error description.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
