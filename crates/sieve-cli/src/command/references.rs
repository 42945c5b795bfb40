use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use sieve_workflow::prelude::{ResolveOptions, StageId};

use super::{print_json, read_workflow};
use crate::TRACING_TARGET_COMMAND;

/// Arguments of `sieve references`.
#[derive(Debug, Args)]
pub struct ReferencesArgs {
    /// Workflow definition file.
    #[arg(long)]
    pub workflow: PathBuf,

    /// Stage asking for references.
    #[arg(long)]
    pub stage: StageId,

    /// Position of the asking value; defaults to the end of the stage.
    #[arg(long)]
    pub value_index: Option<usize>,

    /// Lists page fields as well as whole values.
    #[arg(long)]
    pub expand_fields: bool,
}

pub async fn run(args: ReferencesArgs) -> anyhow::Result<()> {
    let mut workflow = read_workflow(&args.workflow).await?;
    workflow.normalize();

    let stage = workflow.stage(args.stage).context("cannot list references")?;
    let value_index = args.value_index.unwrap_or(stage.values().len());
    let candidates = workflow.available_references(
        args.stage,
        value_index,
        ResolveOptions {
            expand_fields: args.expand_fields,
        },
    )?;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        stage_id = %args.stage,
        value_index,
        candidates = candidates.len(),
        "references listed"
    );
    print_json(&candidates)
}
