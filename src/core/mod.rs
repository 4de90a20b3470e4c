//! Core admission-control engine and capacity accounting.

pub mod error;
pub mod limiter;
pub mod ring_queue;
pub mod token_bucket;
pub mod work;

pub use error::{AppResult, LimiterError};
pub use limiter::{RateLimiter, RateLimiterStats, DEFAULT_DRAIN_DELAY};
pub use ring_queue::RingQueue;
pub use token_bucket::TokenBucket;
pub use work::WorkItem;
