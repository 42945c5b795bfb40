//! Workflow definition model.
//!
//! This module contains the serializable, editor-friendly tree describing a
//! workflow:
//!
//! ```text
//! WorkflowDefinition
//! └── Stage (TABLE | PAGE | BOARD)
//!     ├── Value            (TABLE and PAGE stages)
//!     │   └── Field        (PAGE stages only)
//!     └── BoardConfig      (BOARD stages only)
//! ```
//!
//! All mutations go through methods on [`WorkflowDefinition`]. Every method
//! validates before it touches anything, so a rejected call leaves the tree
//! exactly as it was, and every method that changes the membership of an
//! ordered collection leaves it densely indexed before returning.

use serde::{Deserialize, Serialize};
use sieve_core::order::{self, Direction, Ordered};
use sieve_core::{Error, Result, StageId, ValueId, WorkflowId};

use crate::TRACING_TARGET;

mod board;
mod field;
mod metadata;
mod stage;
mod value;

pub use board::{BoardConfig, BoardPatch, STATUS_PALETTE, StatusColumn};
pub use field::{Field, FieldPatch};
pub use metadata::WorkflowMetadata;
pub use stage::{Stage, StageKind, StagePatch};
pub use value::{DataType, Value, ValuePatch};

/// Serializable workflow definition.
///
/// Stages are kept sorted by their explicit `order_index`, which is always
/// dense `0..n-1` between operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct WorkflowDefinition {
    /// Workflow id.
    #[serde(default)]
    id: WorkflowId,
    /// Workflow metadata.
    #[serde(default)]
    metadata: WorkflowMetadata,
    /// Ordered stages.
    #[serde(default)]
    stages: Vec<Stage>,
}

impl WorkflowDefinition {
    /// Creates a new empty workflow definition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a workflow definition with metadata.
    pub fn with_metadata(metadata: WorkflowMetadata) -> Self {
        Self {
            id: WorkflowId::new(),
            metadata,
            stages: Vec::new(),
        }
    }

    /// Returns the workflow id.
    pub fn id(&self) -> WorkflowId {
        self.id
    }

    /// Returns the workflow metadata.
    pub fn metadata(&self) -> &WorkflowMetadata {
        &self.metadata
    }

    /// Returns the workflow metadata for editing.
    pub fn metadata_mut(&mut self) -> &mut WorkflowMetadata {
        &mut self.metadata
    }

    /// Returns the stages in ascending `order_index`.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Looks up a stage by id.
    pub fn stage(&self, stage_id: StageId) -> Result<&Stage> {
        self.stages
            .iter()
            .find(|stage| stage.id() == stage_id)
            .ok_or_else(|| stage_not_found(stage_id))
    }

    /// Looks up a value by stage and value id.
    pub fn value(&self, stage_id: StageId, value_id: ValueId) -> Result<&Value> {
        self.stage(stage_id)?
            .value(value_id)
            .ok_or_else(|| value_not_found(stage_id, value_id))
    }

    /// Finds the stage owning a value.
    pub fn stage_of_value(&self, value_id: ValueId) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|stage| stage.value(value_id).is_some())
    }

    pub(crate) fn stage_mut(&mut self, stage_id: StageId) -> Result<&mut Stage> {
        self.stages
            .iter_mut()
            .find(|stage| stage.id() == stage_id)
            .ok_or_else(|| stage_not_found(stage_id))
    }

    pub(crate) fn value_mut(&mut self, stage_id: StageId, value_id: ValueId) -> Result<&mut Value> {
        self.stage_mut(stage_id)?
            .value_mut(value_id)
            .ok_or_else(|| value_not_found(stage_id, value_id))
    }

    /// Appends a stage of the given kind with a placeholder name.
    pub fn add_stage(&mut self, kind: StageKind) -> StageId {
        let name = placeholder_name(
            kind.placeholder_name(),
            self.stages.iter().map(Stage::name),
        );
        order::renormalize(&mut self.stages);
        let stage = Stage::new(kind, name, order::next_index(&self.stages));
        let stage_id = stage.id();

        tracing::debug!(
            target: TRACING_TARGET,
            stage_id = %stage_id,
            kind = %kind,
            order_index = stage.order_index(),
            "stage added"
        );

        self.stages.push(stage);
        order::enforce_dense(&mut self.stages, "stages");
        self.touch();
        stage_id
    }

    /// Renames or re-describes a stage.
    pub fn update_stage(&mut self, stage_id: StageId, patch: StagePatch) -> Result<()> {
        let name = match &patch.name {
            Some(name) => Some(validate_name(
                name,
                self.stages
                    .iter()
                    .filter(|stage| stage.id() != stage_id)
                    .map(Stage::name),
            )?),
            None => None,
        };

        let stage = self.stage_mut(stage_id)?;
        if let Some(name) = name {
            stage.name = name;
        }
        if let Some(description) = patch.description {
            stage.description = description;
        }

        tracing::debug!(target: TRACING_TARGET, stage_id = %stage_id, "stage updated");
        self.touch();
        Ok(())
    }

    /// Removes a stage and re-packs the order of the remaining stages.
    ///
    /// Bindings that pointed into the removed stage are flagged as stale,
    /// and board configurations stop referring to it.
    pub fn delete_stage(&mut self, stage_id: StageId) -> Result<Stage> {
        let position = self.stage_position(stage_id)?;
        let removed = self.stages.remove(position);
        order::renormalize(&mut self.stages);
        order::enforce_dense(&mut self.stages, "stages");

        for board in self.stages.iter_mut().filter_map(Stage::board_config_mut) {
            board.forget_stage(stage_id);
        }

        let issues = self.refresh_binding_flags();
        tracing::debug!(
            target: TRACING_TARGET,
            stage_id = %stage_id,
            remaining = self.stages.len(),
            stale_bindings = issues.len(),
            "stage deleted"
        );

        self.touch();
        Ok(removed)
    }

    /// Swaps a stage with its neighbour. Returns `false` at the boundary.
    ///
    /// Board references that would point forward after the move are dropped.
    pub fn move_stage(&mut self, stage_id: StageId, direction: Direction) -> Result<bool> {
        order::renormalize(&mut self.stages);
        let position = self.stage_position(stage_id)?;
        if !order::move_adjacent(&mut self.stages, position, direction) {
            return Ok(false);
        }
        order::enforce_dense(&mut self.stages, "stages");

        let dropped_board_references = self.prune_board_references();
        let issues = self.refresh_binding_flags();
        tracing::debug!(
            target: TRACING_TARGET,
            stage_id = %stage_id,
            direction = %direction,
            stale_bindings = issues.len(),
            dropped_board_references,
            "stage moved"
        );

        self.touch();
        Ok(true)
    }

    /// Restores every structural invariant on a tree that did not come from
    /// this model, such as one loaded from storage or built by hand.
    ///
    /// Explicit order indices are trusted; array position only breaks ties.
    pub fn normalize(&mut self) {
        order::renormalize(&mut self.stages);
        for stage in &mut self.stages {
            stage.normalize();
        }
        self.prune_board_references();
        self.refresh_binding_flags();
    }

    /// Verifies that every ordered collection is densely indexed.
    pub fn check_order(&self) -> Result<()> {
        order::check_dense(&self.stages)?;
        for stage in &self.stages {
            order::check_dense(stage.values())?;
        }
        Ok(())
    }

    pub(crate) fn stage_position(&self, stage_id: StageId) -> Result<usize> {
        self.stages
            .iter()
            .position(|stage| stage.id() == stage_id)
            .ok_or_else(|| stage_not_found(stage_id))
    }

    pub(crate) fn stages_mut(&mut self) -> &mut [Stage] {
        &mut self.stages
    }

    pub(crate) fn push_stage(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    pub(crate) fn touch(&mut self) {
        self.metadata.touch();
    }
}

impl Ordered for Stage {
    fn order_index(&self) -> usize {
        self.order_index
    }

    fn set_order_index(&mut self, index: usize) {
        self.order_index = index;
    }
}

impl Ordered for Value {
    fn order_index(&self) -> usize {
        self.order_index
    }

    fn set_order_index(&mut self, index: usize) {
        self.order_index = index;
    }
}

pub(crate) fn stage_not_found(stage_id: StageId) -> Error {
    Error::not_found().with_message(format!("stage {stage_id}"))
}

pub(crate) fn value_not_found(stage_id: StageId, value_id: ValueId) -> Error {
    Error::not_found().with_message(format!("value {value_id} in stage {stage_id}"))
}

/// Returns `base`, or `base N` with the smallest `N >= 2` not already taken.
pub(crate) fn placeholder_name<'a>(base: &str, taken: impl Iterator<Item = &'a str>) -> String {
    let taken: Vec<&str> = taken.collect();
    if !taken.contains(&base) {
        return base.to_owned();
    }
    (2..)
        .map(|n| format!("{base} {n}"))
        .find(|candidate| !taken.contains(&candidate.as_str()))
        .unwrap_or_else(|| base.to_owned())
}

/// Trims a proposed name and rejects empty names or names used by a sibling.
pub(crate) fn validate_name<'a>(
    name: &str,
    mut siblings: impl Iterator<Item = &'a str>,
) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid_operation().with_message("name must not be empty"));
    }
    if siblings.any(|sibling| sibling == name) {
        return Err(Error::invalid_operation().with_message(format!("name '{name}' is already used")));
    }
    Ok(name.to_owned())
}
