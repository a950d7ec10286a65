//! # Logging
//!
//! Tracing subscriber setup. `RUST_LOG` wins over `LOG_LEVEL` when both are set.

use crate::config::ControllerConfig;
use tracing_subscriber::EnvFilter;

/// Build the env filter for the controller
///
/// `level` is applied to this crate only, dependencies stay at `warn`.
#[must_use]
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,configmap_sync_controller={}",
            level.to_lowercase()
        ))
    })
}

/// Install the global tracing subscriber
///
/// Returns an error if a subscriber is already installed.
pub fn init_tracing(config: &ControllerConfig) -> anyhow::Result<()> {
    let filter = env_filter(&config.log_level);
    let result = if config.log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
}
