//! Board configuration for kanban-style stages.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sieve_core::{DocumentId, Error, Result, StageId};

use super::WorkflowDefinition;
use super::stage::StageKind;
use crate::TRACING_TARGET;

/// Colors assigned to status columns without an explicit color, by position.
pub const STATUS_PALETTE: [&str; 8] = [
    "#64748b", "#3b82f6", "#f59e0b", "#10b981", "#ef4444", "#8b5cf6", "#ec4899", "#14b8a6",
];

/// A status column of a board stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct StatusColumn {
    /// Column name, unique within the board.
    pub name: String,
    /// Explicit color; the palette is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl StatusColumn {
    /// Creates a column that takes its color from the palette.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
        }
    }

    /// Returns the explicit color, or the palette color for `position`.
    pub fn color_at(&self, position: usize) -> &str {
        self.color
            .as_deref()
            .unwrap_or(STATUS_PALETTE[position % STATUS_PALETTE.len()])
    }
}

/// Configuration of a board stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct BoardConfig {
    pub(crate) status_columns: Vec<StatusColumn>,
    #[serde(default)]
    pub(crate) ai_instructions: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) knowledge_document_ids: Vec<DocumentId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) reference_step_ids: Vec<StageId>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            status_columns: ["To Do", "In Progress", "Done"]
                .into_iter()
                .map(StatusColumn::new)
                .collect(),
            ai_instructions: String::new(),
            knowledge_document_ids: Vec::new(),
            reference_step_ids: Vec::new(),
        }
    }
}

impl BoardConfig {
    /// Returns the status columns in display order.
    pub fn status_columns(&self) -> &[StatusColumn] {
        &self.status_columns
    }

    /// Returns the instructions handed to the assistant triaging the board.
    pub fn ai_instructions(&self) -> &str {
        &self.ai_instructions
    }

    /// Returns the knowledge documents attached to the board.
    pub fn knowledge_document_ids(&self) -> &[DocumentId] {
        &self.knowledge_document_ids
    }

    /// Returns the earlier stages whose output the board consumes.
    pub fn reference_step_ids(&self) -> &[StageId] {
        &self.reference_step_ids
    }

    /// Returns `(name, color)` pairs with palette defaults applied.
    pub fn resolved_colors(&self) -> Vec<(&str, &str)> {
        self.status_columns
            .iter()
            .enumerate()
            .map(|(position, column)| (column.name.as_str(), column.color_at(position)))
            .collect()
    }

    pub(crate) fn forget_stage(&mut self, stage_id: StageId) {
        self.reference_step_ids.retain(|id| *id != stage_id);
    }
}

/// Partial update applied to a board configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct BoardPatch {
    /// Replacement status columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_columns: Option<Vec<StatusColumn>>,
    /// Replacement instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_instructions: Option<String>,
    /// Replacement knowledge documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_document_ids: Option<Vec<DocumentId>>,
    /// Replacement stage references; each must precede the board.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_step_ids: Option<Vec<StageId>>,
}

impl WorkflowDefinition {
    /// Applies a partial update to the configuration of a board stage.
    pub fn update_board(&mut self, stage_id: StageId, patch: BoardPatch) -> Result<()> {
        let stage = self.stage(stage_id)?;
        if stage.kind() != StageKind::Board {
            return Err(not_a_board(stage.name(), stage.kind()));
        }

        if let Some(columns) = &patch.status_columns {
            validate_columns(columns)?;
        }
        if let Some(references) = &patch.reference_step_ids {
            for reference in references {
                let target = self.stage(*reference).map_err(|_| {
                    Error::invalid_reference().with_message(format!("unknown stage {reference}"))
                })?;
                if target.order_index() >= stage.order_index() {
                    return Err(Error::invalid_reference().with_message(format!(
                        "board '{}' may only reference earlier stages, '{}' is not",
                        stage.name(),
                        target.name()
                    )));
                }
            }
        }

        let board = self.board_mut(stage_id)?;
        if let Some(columns) = patch.status_columns {
            board.status_columns = columns;
        }
        if let Some(instructions) = patch.ai_instructions {
            board.ai_instructions = instructions;
        }
        if let Some(documents) = patch.knowledge_document_ids {
            board.knowledge_document_ids = documents;
        }
        if let Some(mut references) = patch.reference_step_ids {
            let mut seen = Vec::with_capacity(references.len());
            references.retain(|id| {
                let fresh = !seen.contains(id);
                seen.push(*id);
                fresh
            });
            board.reference_step_ids = references;
        }

        tracing::debug!(target: TRACING_TARGET, stage_id = %stage_id, "board updated");
        self.touch();
        Ok(())
    }

    /// Appends a status column to a board stage.
    pub fn add_status_column(
        &mut self,
        stage_id: StageId,
        name: &str,
        color: Option<String>,
    ) -> Result<()> {
        let board = self.board_mut(stage_id)?;
        let mut columns = board.status_columns.clone();
        columns.push(StatusColumn {
            name: name.trim().to_owned(),
            color,
        });
        validate_columns(&columns)?;
        board.status_columns = columns;

        self.touch();
        Ok(())
    }

    /// Removes a status column from a board stage.
    pub fn remove_status_column(&mut self, stage_id: StageId, name: &str) -> Result<StatusColumn> {
        let board = self.board_mut(stage_id)?;
        let position = board
            .status_columns
            .iter()
            .position(|column| column.name == name)
            .ok_or_else(|| Error::not_found().with_message(format!("status column '{name}'")))?;
        let removed = board.status_columns.remove(position);

        self.touch();
        Ok(removed)
    }

    /// Lists `(board, referenced stage)` pairs where the referenced stage
    /// is missing or no longer precedes the board.
    pub fn stale_board_references(&self) -> Vec<(StageId, StageId)> {
        let positions: HashMap<StageId, usize> = self
            .stages()
            .iter()
            .map(|stage| (stage.id(), stage.order_index()))
            .collect();

        let mut stale = Vec::new();
        for stage in self.stages() {
            let Some(board) = stage.board_config() else {
                continue;
            };
            stale.extend(
                board
                    .reference_step_ids
                    .iter()
                    .filter(|id| {
                        positions
                            .get(id)
                            .is_none_or(|index| *index >= stage.order_index())
                    })
                    .map(|id| (stage.id(), *id)),
            );
        }
        stale
    }

    /// Drops every stale board reference. Returns the number dropped.
    pub(crate) fn prune_board_references(&mut self) -> usize {
        let stale = self.stale_board_references();
        for (board_id, reference) in &stale {
            tracing::warn!(
                target: TRACING_TARGET,
                stage_id = %board_id,
                reference = %reference,
                "board reference no longer points to an earlier stage"
            );
            if let Ok(stage) = self.stage_mut(*board_id)
                && let Some(board) = stage.board_config_mut()
            {
                board.forget_stage(*reference);
            }
        }
        stale.len()
    }

    fn board_mut(&mut self, stage_id: StageId) -> Result<&mut BoardConfig> {
        let stage = self.stage_mut(stage_id)?;
        let (name, kind) = (stage.name.clone(), stage.kind);
        stage
            .board_config_mut()
            .ok_or_else(|| not_a_board(&name, kind))
    }
}

fn not_a_board(name: &str, kind: StageKind) -> Error {
    Error::invalid_operation().with_message(format!("stage '{name}' is {kind}, not BOARD"))
}

fn validate_columns(columns: &[StatusColumn]) -> Result<()> {
    for (position, column) in columns.iter().enumerate() {
        if column.name.trim().is_empty() {
            return Err(Error::invalid_operation().with_message("status column names must not be empty"));
        }
        if columns[..position].iter().any(|other| other.name == column.name) {
            return Err(Error::invalid_operation()
                .with_message(format!("duplicate status column '{}'", column.name)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use sieve_core::{Direction, ErrorKind};

    use super::*;

    #[test]
    fn test_palette_defaults_by_position() {
        let board = BoardConfig {
            status_columns: vec![
                StatusColumn::new("Open"),
                StatusColumn {
                    name: "Blocked".into(),
                    color: Some("#000000".into()),
                },
                StatusColumn::new("Done"),
            ],
            ..BoardConfig::default()
        };

        assert_eq!(
            board.resolved_colors(),
            [
                ("Open", STATUS_PALETTE[0]),
                ("Blocked", "#000000"),
                ("Done", STATUS_PALETTE[2]),
            ]
        );
    }

    #[test]
    fn test_palette_wraps() {
        let column = StatusColumn::new("Late");
        assert_eq!(column.color_at(STATUS_PALETTE.len() + 1), STATUS_PALETTE[1]);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut workflow = WorkflowDefinition::new();
        let board = workflow.add_stage(StageKind::Board);

        let error = workflow.add_status_column(board, "Done", None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidOperation);
        assert_eq!(
            workflow.stage(board).unwrap().board_config().unwrap().status_columns().len(),
            3
        );
    }

    #[test]
    fn test_add_and_remove_column() {
        let mut workflow = WorkflowDefinition::new();
        let board = workflow.add_stage(StageKind::Board);

        workflow.add_status_column(board, "Review", None).unwrap();
        let removed = workflow.remove_status_column(board, "To Do").unwrap();
        assert_eq!(removed.name, "To Do");

        let names: Vec<_> = workflow
            .stage(board)
            .unwrap()
            .board_config()
            .unwrap()
            .status_columns()
            .iter()
            .map(|column| column.name.as_str())
            .collect();
        assert_eq!(names, ["In Progress", "Done", "Review"]);
    }

    #[test]
    fn test_update_board_on_table_is_invalid() {
        let mut workflow = WorkflowDefinition::new();
        let table = workflow.add_stage(StageKind::Table);
        let error = workflow.update_board(table, BoardPatch::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn test_board_references_must_precede() {
        let mut workflow = WorkflowDefinition::new();
        let before = workflow.add_stage(StageKind::Table);
        let board = workflow.add_stage(StageKind::Board);
        let after = workflow.add_stage(StageKind::Page);

        workflow
            .update_board(
                board,
                BoardPatch {
                    reference_step_ids: Some(vec![before, before]),
                    ..BoardPatch::default()
                },
            )
            .unwrap();
        let config = workflow.stage(board).unwrap().board_config().unwrap();
        assert_eq!(config.reference_step_ids(), [before]);

        let error = workflow
            .update_board(
                board,
                BoardPatch {
                    reference_step_ids: Some(vec![after]),
                    ..BoardPatch::default()
                },
            )
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidReference);
    }

    #[test]
    fn test_deleting_referenced_stage_drops_board_reference() {
        let mut workflow = WorkflowDefinition::new();
        let before = workflow.add_stage(StageKind::Table);
        let board = workflow.add_stage(StageKind::Board);
        workflow
            .update_board(
                board,
                BoardPatch {
                    reference_step_ids: Some(vec![before]),
                    ..BoardPatch::default()
                },
            )
            .unwrap();

        workflow.delete_stage(before).unwrap();
        let config = workflow.stage(board).unwrap().board_config().unwrap();
        assert!(config.reference_step_ids().is_empty());
    }

    #[test]
    fn test_moving_board_above_reference_drops_it() {
        let mut workflow = WorkflowDefinition::new();
        let table = workflow.add_stage(StageKind::Table);
        let board = workflow.add_stage(StageKind::Board);
        workflow
            .update_board(
                board,
                BoardPatch {
                    reference_step_ids: Some(vec![table]),
                    ..BoardPatch::default()
                },
            )
            .unwrap();

        assert!(workflow.move_stage(board, Direction::Up).unwrap());
        assert_eq!(workflow.stage(board).unwrap().order_index(), 0);
        let config = workflow.stage(board).unwrap().board_config().unwrap();
        assert!(config.reference_step_ids().is_empty());

        assert!(workflow.move_stage(board, Direction::Down).unwrap());
        let config = workflow.stage(board).unwrap().board_config().unwrap();
        assert!(config.reference_step_ids().is_empty());
    }

    #[test]
    fn test_normalize_drops_forward_board_references() {
        let mut workflow = WorkflowDefinition::new();
        let board = workflow.add_stage(StageKind::Board);
        let table = workflow.add_stage(StageKind::Table);

        let mut json = serde_json::to_value(&workflow).unwrap();
        json["stages"][0]["board_config"]["reference_step_ids"] =
            serde_json::json!([table.to_string(), StageId::new().to_string()]);
        let mut loaded: WorkflowDefinition = serde_json::from_value(json).unwrap();

        loaded.normalize();
        let config = loaded.stage(board).unwrap().board_config().unwrap();
        assert!(config.reference_step_ids().is_empty());
    }
}
