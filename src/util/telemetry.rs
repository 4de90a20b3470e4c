//! Tracing setup for the limiter.

/// Install a default tracing subscriber for limiter diagnostics.
///
/// Library users normally install their own subscriber; this helper is a
/// no-op when one is already set. The env-based filter applies, so
/// `RUST_LOG=rategate=debug` surfaces admission and drain decisions.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
