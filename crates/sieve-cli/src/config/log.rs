//! Logging configuration.

use clap::Args;
use serde::{Deserialize, Serialize};

/// Log filter and output format.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Args)]
pub struct LogConfig {
    /// Filter directives, e.g. `sieve_workflow=debug`.
    ///
    /// Falls back to `RUST_LOG`, then to `info`.
    #[arg(long, env = "SIEVE_LOG_FILTER", global = true)]
    pub log_filter: Option<String>,

    /// Emits logs as JSON lines.
    #[arg(long, env = "SIEVE_LOG_JSON", global = true)]
    #[serde(default)]
    pub log_json: bool,
}
