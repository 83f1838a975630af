//! Logging setup. Everything goes to stderr; stdout carries results.

use tracing_subscriber::EnvFilter;

/// Any non-empty value turns on debug logging.
pub const DEBUG_ENV: &str = "BRIDGE_DEBUG";

/// Level used when `RUST_LOG` is not set.
pub fn default_level(verbose: bool, debug_env: Option<&str>) -> &'static str {
    let debug = verbose || debug_env.is_some_and(|v| !v.is_empty());
    if debug { "debug" } else { "info" }
}

/// Install the global subscriber. `RUST_LOG` wins over the computed level.
pub fn init(verbose: bool) {
    let level = default_level(verbose, std::env::var(DEBUG_ENV).ok().as_deref());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}
