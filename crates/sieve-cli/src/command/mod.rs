//! Subcommands of the `sieve` binary.

mod check;
mod import;
mod pivot;
mod references;

use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use clap::Subcommand;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sieve_workflow::prelude::WorkflowDefinition;

pub use self::check::CheckArgs;
pub use self::import::ImportArgs;
pub use self::pivot::PivotArgs;
pub use self::references::ReferencesArgs;

/// Command to run.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lists the outputs visible from a position in a stage.
    References(ReferencesArgs),
    /// Pivots validation records into a preview table for a stage.
    Pivot(PivotArgs),
    /// Converts a legacy project schema into a workflow.
    Import(ImportArgs),
    /// Audits ordering, bindings and prompt mentions of a workflow.
    Check(CheckArgs),
}

impl Command {
    /// Returns the subcommand name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::References(_) => "references",
            Self::Pivot(_) => "pivot",
            Self::Import(_) => "import",
            Self::Check(_) => "check",
        }
    }
}

/// Runs a command to completion.
pub async fn execute(command: Command) -> anyhow::Result<()> {
    match command {
        Command::References(args) => references::run(args).await,
        Command::Pivot(args) => pivot::run(args).await,
        Command::Import(args) => import::run(args).await,
        Command::Check(args) => check::run(args).await,
    }
}

/// Reads and parses a JSON file.
async fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {what} from {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {what} in {}", path.display()))
}

/// Reads a workflow exactly as stored, without repairing it.
async fn read_workflow(path: &Path) -> anyhow::Result<WorkflowDefinition> {
    read_json(path, "workflow").await
}

/// Writes pretty JSON to stdout.
fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("failed to write output")?;
    writeln!(stdout).context("failed to write output")?;
    Ok(())
}

/// Writes pretty JSON to a file.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}
