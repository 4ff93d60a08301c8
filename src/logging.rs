//! Structured logging setup, shared by every binary entry point.

use tracing_subscriber::EnvFilter;

/// Initializes a global `tracing` subscriber honoring `RUST_LOG`, falling
/// back to `info` for this crate and `warn` for dependencies.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
