//! Preview configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Configuration of a stage preview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(rename_all = "camelCase")]
pub struct PreviewConfig {
    /// Maximum number of rows to show; all rows when unset.
    #[cfg_attr(
        feature = "config",
        arg(long = "preview-limit", alias = "limit", env = "SIEVE_PREVIEW_LIMIT")
    )]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl PreviewConfig {
    /// Creates a configuration showing at most `limit` rows.
    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit) }
    }
}
