//! Logging initialization
//!
//! `RUST_LOG` takes precedence over any configured filter. Initialization
//! is idempotent: later calls are ignored once a subscriber is installed.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

const DEFAULT_FILTER: &str = "info";

fn env_filter(filter: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter.unwrap_or(DEFAULT_FILTER)))
}

/// Initialize human-readable logging
pub fn init_logging(filter: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter))
        .with_target(true)
        .try_init();
}

/// Initialize JSON logging (for log aggregation systems)
pub fn init_json_logging(filter: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter(filter))
        .try_init();
}

/// Initialize logging from configuration
pub fn init_logging_from_config(config: &LoggingConfig) {
    if config.json_format {
        init_json_logging(config.filter.as_deref());
    } else {
        init_logging(config.filter.as_deref());
    }
}
