//! Tracing initialization.

use std::io;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LogConfig;

/// Initializes the tracing subscriber for structured logging on stderr.
///
/// # Errors
///
/// Returns an error if the filter is malformed or a subscriber is already set.
pub(crate) fn init_tracing(config: &LogConfig) -> anyhow::Result<()> {
    let env_filter = create_env_filter(config.log_filter.as_deref())?;

    let json_layer = config
        .log_json
        .then(|| fmt::layer().json().with_writer(io::stderr));
    let text_layer = (!config.log_json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    Ok(())
}

/// Creates an environment filter for tracing.
fn create_env_filter(directives: Option<&str>) -> anyhow::Result<EnvFilter> {
    match directives {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| anyhow::anyhow!("Invalid log filter '{directives}': {e}")),
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .map_err(|e| anyhow::anyhow!("Failed to create env filter: {e}")),
    }
}
