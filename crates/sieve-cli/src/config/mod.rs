//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── log: LogConfig     # Log filter and format
//! └── command: Command   # references | pivot | import | check
//! ```
//!
//! Options can be given as arguments or environment variables.

mod log;

use std::process;

use clap::Parser;
pub use log::LogConfig;

use crate::TRACING_TARGET_STARTUP;
use crate::command::Command;

/// Complete CLI configuration.
#[derive(Debug, Parser)]
#[command(name = "sieve")]
#[command(about = "Inspect, preview and import extraction workflows")]
#[command(version)]
pub struct Cli {
    /// Logging configuration.
    #[clap(flatten)]
    pub log: LogConfig,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Logs build information and the selected command at debug level.
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            features = ?Self::enabled_features(),
            command = self.command.name(),
            "Build information"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_pivot_command() {
        let stage = sieve_workflow::prelude::StageId::new();
        let cli = Cli::try_parse_from([
            "sieve",
            "--log-json",
            "pivot",
            "--workflow",
            "flow.json",
            "--stage",
            &stage.to_string(),
            "--records",
            "records.json",
            "--preview-limit",
            "5",
        ])
        .unwrap();

        assert!(cli.log.log_json);
        match cli.command {
            Command::Pivot(args) => {
                assert_eq!(args.stage, stage);
                assert_eq!(args.preview.limit, Some(5));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
