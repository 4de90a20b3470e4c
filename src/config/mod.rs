//! Configuration models for the limiter.

pub mod limiter;

pub use limiter::RateLimiterConfig;
