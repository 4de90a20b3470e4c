//! Token bucket with lazy, elapsed-time-based refill.
//!
//! Tokens accrue at `rate_per_interval` per `interval` up to `capacity`.
//! Refill happens lazily on every query instead of via a background timer:
//! the bucket credits whole elapsed intervals and resets its refill
//! timestamp to "now", discarding any fractional remainder. Over many
//! refills this slightly under-credits versus an idealized continuous
//! model; that approximation is intentional and preserved.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::LimiterError;
use crate::util::clock::Clock;

/// Replenishing token balance used for admission decisions.
///
/// All quantities are non-negative integers with saturating arithmetic; the
/// invariant `tokens <= capacity` holds after every mutation. Timestamps
/// come from an injected [`Clock`] so tests can simulate elapsed time.
pub struct TokenBucket {
    rate_per_interval: u64,
    interval: Duration,
    capacity: u64,
    tokens: u64,
    last_refill: Instant,
    clock: Arc<dyn Clock>,
}

impl TokenBucket {
    /// Create a bucket.
    ///
    /// `initial_tokens` is clamped to `[0, capacity]`.
    ///
    /// # Errors
    ///
    /// Returns `LimiterError::InvalidConfig` when `interval` is zero or
    /// `rate_per_interval` is zero; either would let deferred work starve
    /// forever.
    pub fn new(
        rate_per_interval: u64,
        interval: Duration,
        capacity: u64,
        initial_tokens: u64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LimiterError> {
        if interval.is_zero() {
            return Err(LimiterError::InvalidConfig(
                "interval must be greater than zero".into(),
            ));
        }
        if rate_per_interval == 0 {
            return Err(LimiterError::InvalidConfig(
                "rate_per_interval must be greater than zero".into(),
            ));
        }
        let last_refill = clock.now();
        Ok(Self {
            rate_per_interval,
            interval,
            capacity,
            tokens: initial_tokens.min(capacity),
            last_refill,
            clock,
        })
    }

    /// Whether `count` tokens are currently affordable.
    ///
    /// Replenishes lazily first; never deducts.
    pub fn can_consume(&mut self, count: u64) -> bool {
        self.replenish();
        self.tokens >= count
    }

    /// Deduct `count` tokens if affordable after a lazy replenish.
    ///
    /// Returns `false` and leaves the balance untouched when the bucket
    /// cannot afford the cost.
    pub fn consume(&mut self, count: u64) -> bool {
        self.replenish();
        if self.tokens >= count {
            self.tokens -= count;
            return true;
        }
        false
    }

    /// Current balance after a lazy replenish.
    pub fn tokens(&mut self) -> u64 {
        self.replenish();
        self.tokens
    }

    /// Maximum balance the bucket can hold.
    #[must_use]
    pub const fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Credit whole elapsed intervals, capped at capacity.
    ///
    /// Resets `last_refill` to now rather than advancing it by the intervals
    /// consumed, so the fractional remainder of the elapsed time is dropped.
    fn replenish(&mut self) {
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed < self.interval {
            return;
        }
        let whole_intervals = elapsed.as_nanos() / self.interval.as_nanos();
        let whole_intervals = u64::try_from(whole_intervals).unwrap_or(u64::MAX);
        let credit = self.rate_per_interval.saturating_mul(whole_intervals);
        self.tokens = self.tokens.saturating_add(credit).min(self.capacity);
        self.last_refill = now;
    }
}
