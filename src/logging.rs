//! Tracing subscriber setup

use crate::config::LoggingConfig;
use crate::error::{ChainError, Result};
use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` wins over `config.filter`. Returns `false` when a subscriber
/// was already installed, which leaves the existing one in place.
pub fn init(config: &LoggingConfig) -> Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|e| {
            ChainError::ConfigError(format!("Invalid log filter {:?}: {}", config.filter, e))
        })?,
    };

    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok())
}
