//! Stage definition types.

use serde::{Deserialize, Serialize};
use sieve_core::order;
use sieve_core::{StageId, ValueId};
use strum::{AsRefStr, Display, EnumString};

use super::board::BoardConfig;
use super::value::Value;

/// Kind of a workflow stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum StageKind {
    /// Repeating records; one row per extracted item.
    Table,
    /// A single information page; values may carry fields.
    Page,
    /// A kanban-style task board driven by status columns.
    Board,
}

impl StageKind {
    /// Name given to a freshly created stage of this kind.
    pub fn placeholder_name(self) -> &'static str {
        match self {
            Self::Table => "New Table",
            Self::Page => "New Page",
            Self::Board => "New Board",
        }
    }

    /// Returns true if stages of this kind hold values.
    pub fn holds_values(self) -> bool {
        !matches!(self, Self::Board)
    }
}

/// A top-level phase of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct Stage {
    pub(crate) id: StageId,
    pub(crate) kind: StageKind,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) order_index: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) board_config: Option<BoardConfig>,
}

impl Stage {
    pub(crate) fn new(kind: StageKind, name: String, order_index: usize) -> Self {
        Self {
            id: StageId::new(),
            kind,
            name,
            description: String::new(),
            order_index,
            values: Vec::new(),
            board_config: matches!(kind, StageKind::Board).then(BoardConfig::default),
        }
    }

    /// Returns the stage id.
    pub fn id(&self) -> StageId {
        self.id
    }

    /// Returns the stage kind.
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// Returns the display name used in reference labels.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stage description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the position of this stage in the workflow.
    pub fn order_index(&self) -> usize {
        self.order_index
    }

    /// Returns the values in ascending `order_index`.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Looks up a value by id.
    pub fn value(&self, value_id: ValueId) -> Option<&Value> {
        self.values.iter().find(|value| value.id() == value_id)
    }

    /// Looks up a value by its display name.
    pub fn value_named(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|value| value.name() == name)
    }

    /// Returns the board configuration of a BOARD stage.
    pub fn board_config(&self) -> Option<&BoardConfig> {
        self.board_config.as_ref()
    }

    /// Returns the value flagged as the record identifier, if any.
    pub fn identifier_value(&self) -> Option<&Value> {
        self.values.iter().find(|value| value.is_identifier())
    }

    /// Returns the column keys extraction results are stored under, in
    /// declared order.
    ///
    /// Table values map to one column each. Page values with fields map to
    /// one `value.field` column per field, and to a single column otherwise.
    pub fn declared_columns(&self) -> Vec<String> {
        let mut columns = Vec::new();
        for value in &self.values {
            match value.fields() {
                fields if self.kind == StageKind::Page && !fields.is_empty() => {
                    columns.extend(
                        fields
                            .iter()
                            .map(|field| format!("{}.{}", value.name(), field.name)),
                    );
                }
                _ => columns.push(value.name().to_owned()),
            }
        }
        columns
    }

    pub(crate) fn value_mut(&mut self, value_id: ValueId) -> Option<&mut Value> {
        self.values.iter_mut().find(|value| value.id() == value_id)
    }

    pub(crate) fn value_position(&self, value_id: ValueId) -> Option<usize> {
        self.values.iter().position(|value| value.id() == value_id)
    }

    pub(crate) fn board_config_mut(&mut self) -> Option<&mut BoardConfig> {
        self.board_config.as_mut()
    }

    /// Makes `value_id` the only identifier of this stage.
    pub(crate) fn set_identifier(&mut self, value_id: Option<ValueId>) {
        for value in &mut self.values {
            value.is_identifier = Some(value.id) == value_id;
        }
    }

    /// Promotes the first value of a table stage when no identifier is left.
    pub(crate) fn ensure_identifier(&mut self) {
        if self.kind == StageKind::Table && self.identifier_value().is_none() {
            let first = self.values.first().map(Value::id);
            self.set_identifier(first);
        }
    }

    /// Repairs a stage that did not come from this model.
    pub(crate) fn normalize(&mut self) {
        match self.kind {
            StageKind::Board => {
                self.values.clear();
                self.board_config.get_or_insert_with(BoardConfig::default);
            }
            StageKind::Table | StageKind::Page => {
                self.board_config = None;
            }
        }

        order::renormalize(&mut self.values);
        let is_page = self.kind == StageKind::Page;
        for value in &mut self.values {
            value.normalize(is_page);
        }

        let identifier = self.identifier_value().map(Value::id);
        if self.kind == StageKind::Table {
            self.set_identifier(identifier);
            self.ensure_identifier();
        } else {
            self.set_identifier(None);
        }
    }

    pub(crate) fn enforce_value_order(&mut self) {
        order::enforce_dense(&mut self.values, "values");
    }
}

/// Partial update applied to a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct StagePatch {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
