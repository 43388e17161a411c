use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;

/// Initializes the global tracing subscriber from `-l/--loglevel` (falling
/// back to `RUST_LOG`, then `info`).
pub fn init_tracing(level: Option<LogLevel>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level.as_tracing_filter()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
