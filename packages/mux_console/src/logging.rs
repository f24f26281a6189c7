use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;
use view_mux::Stream;

use crate::config::LogLevel;

/// Install the global subscriber, writing every event into `logs`.
///
/// `RUST_LOG` takes priority over the configured level.
pub fn init_logging(level: LogLevel, logs: &Stream) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
    let writer = logs.writer();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}
