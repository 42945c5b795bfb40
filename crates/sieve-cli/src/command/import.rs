use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use sieve_workflow::import::{LegacySchema, import_if_absent, import_legacy_schema};
use sieve_workflow::prelude::{FileWorkflowStore, WorkflowId};

use super::{print_json, read_json, write_json};
use crate::TRACING_TARGET_COMMAND;

/// Arguments of `sieve import`.
#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Legacy project schema file.
    #[arg(long)]
    pub schema: PathBuf,

    /// Writes the workflow to this file instead of stdout.
    #[arg(long, conflicts_with = "store")]
    pub output: Option<PathBuf>,

    /// Workflow store directory; nothing is imported if the workflow exists.
    #[arg(long, requires = "workflow_id", env = "SIEVE_STORE")]
    pub store: Option<PathBuf>,

    /// Id of the workflow in the store.
    #[arg(long)]
    pub workflow_id: Option<WorkflowId>,
}

pub async fn run(args: ImportArgs) -> anyhow::Result<()> {
    let schema: LegacySchema = read_json(&args.schema, "legacy schema").await?;

    if let Some(root) = args.store {
        let workflow_id = args
            .workflow_id
            .context("--workflow-id is required with --store")?;
        let store = FileWorkflowStore::new(root);
        let (workflow, created) = import_if_absent(&store, workflow_id, &schema)
            .await
            .context("failed to import into the store")?;

        tracing::info!(
            target: TRACING_TARGET_COMMAND,
            workflow_id = %workflow_id,
            created,
            path = %store.path_of(workflow_id).display(),
            "store import finished"
        );
        return print_json(&workflow);
    }

    let workflow = import_legacy_schema(&schema);
    match args.output {
        Some(path) => {
            write_json(&path, &workflow).await?;
            tracing::info!(
                target: TRACING_TARGET_COMMAND,
                path = %path.display(),
                stages = workflow.stages().len(),
                "workflow written"
            );
            Ok(())
        }
        None => print_json(&workflow),
    }
}
