//! # Rategate
//!
//! A token-bucket admission-control scheduler for in-process workloads.
//!
//! Callers submit discrete units of work tagged with a token cost. The
//! limiter admits or defers each unit against a replenishing token budget,
//! guaranteeing that the long-run rate of admitted cost never exceeds the
//! configured rate while allowing short bursts up to the bucket capacity.
//!
//! ## Core Problem Solved
//!
//! Many in-process workloads need smoothing rather than rejection:
//!
//! - **Bursty producers**: a caller may submit a burst of work that would
//!   overwhelm a downstream resource if run immediately
//! - **No caller-side backpressure**: submission must never block or fail;
//!   overload is absorbed by deferral, not surfaced as an error
//! - **Strict ordering**: deferred work must run in submission order; a
//!   cheap late arrival must not jump ahead of an older queued item
//!
//! ## Key Features
//!
//! - **Token Bucket**: lazy, elapsed-time-based refill up to a burst capacity
//! - **Deferred Queue**: a resizable FIFO ring buffer absorbs overload
//! - **Serialized Worker**: one dedicated OS thread owns all mutable state,
//!   so admission decisions never race
//! - **Polling Drain**: deferred items are retried on a fixed cadence until
//!   the backlog empties; no timer storms, bounded extra latency
//! - **Conditional Charging**: a work closure reports whether its cost should
//!   actually be charged, so no-op actions stay free
//!
//! ## Example
//!
//! ```rust,ignore
//! use rategate::config::RateLimiterConfig;
//! use rategate::core::RateLimiter;
//! use std::time::Duration;
//!
//! // 3 tokens per 500ms, burst capacity 20, 5 tokens up front.
//! let limiter = RateLimiter::new(
//!     RateLimiterConfig::new(3, Duration::from_millis(500), 20)
//!         .with_initial_tokens(5),
//! )?;
//!
//! // Runs immediately while tokens last, queues afterwards.
//! for i in 1..=20 {
//!     limiter.execute(1, move || {
//!         println!("+++ {i}");
//!         true // charge the cost
//!     });
//! }
//!
//! limiter.shutdown();
//! ```
//!
//! For complete examples, see:
//! - `tests/rate_limiter_test.rs` - Full integration tests
//! - `README.md` - Comprehensive documentation

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core admission-control engine: ring queue, token bucket, and scheduler.
pub mod core;
/// Configuration models for the limiter.
pub mod config;
/// Shared utilities.
pub mod util;
