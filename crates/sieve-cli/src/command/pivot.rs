use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use sieve_preview::{PreviewConfig, ValidationRecord, preview_stage};
use sieve_workflow::prelude::StageId;

use super::{print_json, read_json, read_workflow};
use crate::TRACING_TARGET_COMMAND;

/// Arguments of `sieve pivot`.
#[derive(Debug, Args)]
pub struct PivotArgs {
    /// Workflow definition file.
    #[arg(long)]
    pub workflow: PathBuf,

    /// Stage whose columns lay out the table.
    #[arg(long)]
    pub stage: StageId,

    /// JSON array of validation records.
    #[arg(long)]
    pub records: PathBuf,

    /// Preview options.
    #[clap(flatten)]
    pub preview: PreviewConfig,
}

pub async fn run(args: PivotArgs) -> anyhow::Result<()> {
    let mut workflow = read_workflow(&args.workflow).await?;
    workflow.normalize();
    let stage = workflow.stage(args.stage).context("cannot pivot records")?;

    let records: Vec<ValidationRecord> = read_json(&args.records, "validation records").await?;
    let table = preview_stage(stage, &records, &args.preview);

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        stage_id = %args.stage,
        records = records.len(),
        rows = table.rows.len(),
        dropped = table.dropped,
        "records pivoted"
    );
    print_json(&table)
}
