//! Logging initialization

use tracing_subscriber::EnvFilter;

/// Initialize tracing at the given level
///
/// `RUST_LOG`, when set, takes precedence over `level`. Calling this more
/// than once is harmless; only the first call installs a subscriber.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .try_init();
}
