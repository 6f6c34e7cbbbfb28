//! Tracing initialization for hosts and tests.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize a global subscriber honoring `GAUNTLET_LOG` (falling back to
/// `RUST_LOG`, then `info`). Safe to call more than once; later calls are
/// no-ops.
pub fn init() {
    let filter = std::env::var("GAUNTLET_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    let _ = fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(true)
        .try_init();
}
