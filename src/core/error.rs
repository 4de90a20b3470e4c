//! Error types for limiter operations.

use thiserror::Error;

/// Errors produced by limiter components.
#[derive(Debug, Error)]
pub enum LimiterError {
    /// Configuration validation failed at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The limiter has been shut down and no longer accepts work.
    #[error("limiter has been shut down")]
    Shutdown,
    /// The worker thread could not be spawned.
    #[error("worker error: {0}")]
    Worker(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
