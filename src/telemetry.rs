//! Log subscriber installation.
//!
//! The request-logging middleware emits `tracing` events; this module decides
//! where they are written. `RUST_LOG` always wins over the configured level.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::BoxError;

/// Installs the global fmt subscriber: JSON lines when `config.json`,
/// human-readable otherwise.
///
/// Fails if a global subscriber is already set.
pub fn try_init(config: &LoggingConfig) -> Result<(), BoxError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if config.json {
        builder.json().flatten_event(true).try_init()?;
    } else {
        builder.try_init()?;
    }
    Ok(())
}
