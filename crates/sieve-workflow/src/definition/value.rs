//! Value definition types and value-level operations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sieve_core::order::{self, Direction};
use sieve_core::{Error, Result, StageId, ToolId, ValueId};
use strum::{AsRefStr, Display, EnumString};

use super::field::Field;
use super::stage::StageKind;
use super::{WorkflowDefinition, placeholder_name, validate_name, value_not_found};
use crate::TRACING_TARGET;
use crate::binding::Binding;

/// Data type of an extracted value or field.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum DataType {
    /// Free text.
    #[default]
    Text,
    /// Numeric value.
    Number,
    /// Calendar date.
    Date,
    /// Yes/no value.
    Boolean,
    /// One of a fixed list of choices.
    Choice,
}

/// A named, tool-bound unit of extraction within a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct Value {
    pub(crate) id: ValueId,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) data_type: DataType,
    #[serde(default)]
    pub(crate) order_index: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) is_identifier: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) tool_id: Option<ToolId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) input_bindings: BTreeMap<String, Binding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) fields: Option<Vec<Field>>,
}

impl Value {
    pub(crate) fn new(name: String, order_index: usize, with_fields: bool) -> Self {
        Self {
            id: ValueId::new(),
            name,
            description: String::new(),
            data_type: DataType::default(),
            order_index,
            is_identifier: false,
            choices: Vec::new(),
            tool_id: None,
            input_bindings: BTreeMap::new(),
            fields: with_fields.then(Vec::new),
        }
    }

    /// Returns the value id.
    pub fn id(&self) -> ValueId {
        self.id
    }

    /// Returns the display name used in reference labels.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the data type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns the position of this value in its stage.
    pub fn order_index(&self) -> usize {
        self.order_index
    }

    /// Returns true if this value keys the records of its stage.
    pub fn is_identifier(&self) -> bool {
        self.is_identifier
    }

    /// Returns the allowed choices of a CHOICE value.
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// Returns the extraction tool this value is bound to.
    pub fn tool_id(&self) -> Option<ToolId> {
        self.tool_id
    }

    /// Returns the tool parameter bindings keyed by parameter id.
    pub fn input_bindings(&self) -> &BTreeMap<String, Binding> {
        &self.input_bindings
    }

    /// Returns the binding of one tool parameter.
    pub fn binding(&self, param_id: &str) -> Option<&Binding> {
        self.input_bindings.get(param_id)
    }

    /// Returns the fields of a page-stage value; empty for other values.
    pub fn fields(&self) -> &[Field] {
        self.fields.as_deref().unwrap_or_default()
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().iter().find(|field| field.name == name)
    }

    pub(crate) fn input_bindings_mut(&mut self) -> &mut BTreeMap<String, Binding> {
        &mut self.input_bindings
    }

    /// Repairs a value that did not come from this model.
    pub(crate) fn normalize(&mut self, in_page: bool) {
        if in_page {
            let fields = self.fields.get_or_insert_with(Vec::new);
            let mut seen = Vec::new();
            fields.retain(|field| {
                let fresh = !seen.contains(&field.name);
                seen.push(field.name.clone());
                fresh
            });
        } else {
            self.fields = None;
        }

        if self.data_type != DataType::Choice {
            self.choices.clear();
        }
    }
}

/// Partial update applied to a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ValuePatch {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New data type. Leaving CHOICE clears the choices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    /// New choice list; only valid for CHOICE values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    /// New tool (`Some(None)` unbinds). Changing the tool drops all bindings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<Option<ToolId>>,
    /// Marks this value as the identifier of a table stage. Unmarking the
    /// current identifier is rejected; mark another value instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_identifier: Option<bool>,
}

impl WorkflowDefinition {
    /// Appends a value with a placeholder name to a table or page stage.
    ///
    /// The first value of a table stage becomes its identifier.
    pub fn add_value(&mut self, stage_id: StageId) -> Result<ValueId> {
        let stage = self.stage_mut(stage_id)?;
        if !stage.kind().holds_values() {
            return Err(Error::invalid_operation()
                .with_message(format!("{} stages hold no values", stage.kind())));
        }

        order::renormalize(&mut stage.values);
        let name = placeholder_name("New Value", stage.values.iter().map(Value::name));
        let value = Value::new(
            name,
            order::next_index(&stage.values),
            stage.kind() == StageKind::Page,
        );
        let value_id = value.id();
        stage.values.push(value);
        stage.enforce_value_order();
        stage.ensure_identifier();

        tracing::debug!(
            target: TRACING_TARGET,
            stage_id = %stage_id,
            value_id = %value_id,
            "value added"
        );

        self.touch();
        Ok(value_id)
    }

    /// Applies a partial update to a value.
    pub fn update_value(
        &mut self,
        stage_id: StageId,
        value_id: ValueId,
        patch: ValuePatch,
    ) -> Result<()> {
        let stage = self.stage(stage_id)?;
        let current = stage
            .value(value_id)
            .ok_or_else(|| value_not_found(stage_id, value_id))?;

        let name = match &patch.name {
            Some(name) => Some(validate_name(
                name,
                stage
                    .values()
                    .iter()
                    .filter(|value| value.id() != value_id)
                    .map(Value::name),
            )?),
            None => None,
        };

        let data_type = patch.data_type.unwrap_or(current.data_type());
        if patch.choices.is_some() && data_type != DataType::Choice {
            return Err(Error::invalid_operation()
                .with_message("choices are only allowed on CHOICE values"));
        }
        if patch.is_identifier == Some(true) && stage.kind() != StageKind::Table {
            return Err(Error::invalid_operation()
                .with_message("only table stages have an identifier value"));
        }
        if patch.is_identifier == Some(false) && current.is_identifier() {
            return Err(Error::invalid_operation().with_message(
                "a table stage always has an identifier, mark another value instead",
            ));
        }

        let stage = self.stage_mut(stage_id)?;
        if patch.is_identifier == Some(true) {
            stage.set_identifier(Some(value_id));
        }

        let value = stage
            .value_mut(value_id)
            .ok_or_else(|| value_not_found(stage_id, value_id))?;
        if let Some(name) = name {
            value.name = name;
        }
        if let Some(description) = patch.description {
            value.description = description;
        }
        value.data_type = data_type;
        if data_type != DataType::Choice {
            value.choices.clear();
        }
        if let Some(choices) = patch.choices {
            value.choices = choices;
        }
        if let Some(tool_id) = patch.tool_id
            && tool_id != value.tool_id
        {
            tracing::debug!(
                target: TRACING_TARGET,
                value_id = %value_id,
                dropped_bindings = value.input_bindings.len(),
                "tool changed, bindings cleared"
            );
            value.tool_id = tool_id;
            value.input_bindings.clear();
        }

        tracing::debug!(target: TRACING_TARGET, stage_id = %stage_id, value_id = %value_id, "value updated");
        self.touch();
        Ok(())
    }

    /// Removes a value and re-packs the order of its siblings.
    pub fn delete_value(&mut self, stage_id: StageId, value_id: ValueId) -> Result<Value> {
        let stage = self.stage_mut(stage_id)?;
        let position = stage
            .value_position(value_id)
            .ok_or_else(|| value_not_found(stage_id, value_id))?;

        let removed = stage.values.remove(position);
        order::renormalize(&mut stage.values);
        stage.enforce_value_order();
        stage.ensure_identifier();

        let issues = self.refresh_binding_flags();
        tracing::debug!(
            target: TRACING_TARGET,
            stage_id = %stage_id,
            value_id = %value_id,
            stale_bindings = issues.len(),
            "value deleted"
        );

        self.touch();
        Ok(removed)
    }

    /// Swaps a value with its neighbour. Returns `false` at the boundary.
    pub fn move_value(
        &mut self,
        stage_id: StageId,
        value_id: ValueId,
        direction: Direction,
    ) -> Result<bool> {
        let stage = self.stage_mut(stage_id)?;
        order::renormalize(&mut stage.values);
        let position = stage
            .value_position(value_id)
            .ok_or_else(|| value_not_found(stage_id, value_id))?;

        if !order::move_adjacent(&mut stage.values, position, direction) {
            return Ok(false);
        }
        stage.enforce_value_order();

        let issues = self.refresh_binding_flags();
        tracing::debug!(
            target: TRACING_TARGET,
            stage_id = %stage_id,
            value_id = %value_id,
            direction = %direction,
            stale_bindings = issues.len(),
            "value moved"
        );

        self.touch();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use sieve_core::ErrorKind;

    use super::*;

    fn table_with_values(count: usize) -> (WorkflowDefinition, StageId, Vec<ValueId>) {
        let mut workflow = WorkflowDefinition::new();
        let stage = workflow.add_stage(StageKind::Table);
        let values = (0..count)
            .map(|_| workflow.add_value(stage).unwrap())
            .collect();
        (workflow, stage, values)
    }

    fn value_names(workflow: &WorkflowDefinition, stage: StageId) -> Vec<String> {
        workflow
            .stage(stage)
            .unwrap()
            .values()
            .iter()
            .map(|value| value.name().to_owned())
            .collect()
    }

    #[test]
    fn test_add_value_assigns_dense_indices() {
        let (workflow, stage, values) = table_with_values(3);
        assert_eq!(value_names(&workflow, stage), ["New Value", "New Value 2", "New Value 3"]);
        for (index, id) in values.iter().enumerate() {
            assert_eq!(workflow.value(stage, *id).unwrap().order_index(), index);
        }
    }

    #[test]
    fn test_first_table_value_is_identifier() {
        let (workflow, stage, values) = table_with_values(2);
        let identifier = workflow.stage(stage).unwrap().identifier_value().unwrap();
        assert_eq!(identifier.id(), values[0]);
    }

    #[test]
    fn test_add_value_to_board_is_invalid() {
        let mut workflow = WorkflowDefinition::new();
        let board = workflow.add_stage(StageKind::Board);
        let error = workflow.add_value(board).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn test_page_values_carry_fields_table_values_do_not() {
        let mut workflow = WorkflowDefinition::new();
        let page = workflow.add_stage(StageKind::Page);
        let table = workflow.add_stage(StageKind::Table);
        let page_value = workflow.add_value(page).unwrap();
        let table_value = workflow.add_value(table).unwrap();

        assert!(workflow.value(page, page_value).unwrap().fields.is_some());
        assert!(workflow.value(table, table_value).unwrap().fields.is_none());
    }

    #[test]
    fn test_update_value_moves_identifier() {
        let (mut workflow, stage, values) = table_with_values(2);
        workflow
            .update_value(
                stage,
                values[1],
                ValuePatch {
                    is_identifier: Some(true),
                    ..ValuePatch::default()
                },
            )
            .unwrap();

        assert!(!workflow.value(stage, values[0]).unwrap().is_identifier());
        assert!(workflow.value(stage, values[1]).unwrap().is_identifier());
    }

    #[test]
    fn test_update_value_rejects_choices_on_text() {
        let (mut workflow, stage, values) = table_with_values(1);
        let error = workflow
            .update_value(
                stage,
                values[0],
                ValuePatch {
                    name: Some("Status".into()),
                    choices: Some(vec!["Open".into()]),
                    ..ValuePatch::default()
                },
            )
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::InvalidOperation);
        assert_eq!(workflow.value(stage, values[0]).unwrap().name(), "New Value");
    }

    #[test]
    fn test_update_value_choice_round() {
        let (mut workflow, stage, values) = table_with_values(1);
        workflow
            .update_value(
                stage,
                values[0],
                ValuePatch {
                    data_type: Some(DataType::Choice),
                    choices: Some(vec!["Open".into(), "Closed".into()]),
                    ..ValuePatch::default()
                },
            )
            .unwrap();
        assert_eq!(workflow.value(stage, values[0]).unwrap().choices().len(), 2);

        workflow
            .update_value(
                stage,
                values[0],
                ValuePatch {
                    data_type: Some(DataType::Text),
                    ..ValuePatch::default()
                },
            )
            .unwrap();
        assert!(workflow.value(stage, values[0]).unwrap().choices().is_empty());
    }

    #[test]
    fn test_changing_tool_clears_bindings() {
        let (mut workflow, stage, values) = table_with_values(1);
        let tool = ToolId::new();
        workflow
            .update_value(
                stage,
                values[0],
                ValuePatch {
                    tool_id: Some(Some(tool)),
                    ..ValuePatch::default()
                },
            )
            .unwrap();
        workflow
            .value_mut(stage, values[0])
            .unwrap()
            .input_bindings
            .insert("flag".into(), Binding::Flag { value: true });

        workflow
            .update_value(
                stage,
                values[0],
                ValuePatch {
                    tool_id: Some(Some(tool)),
                    ..ValuePatch::default()
                },
            )
            .unwrap();
        assert_eq!(workflow.value(stage, values[0]).unwrap().input_bindings().len(), 1);

        workflow
            .update_value(
                stage,
                values[0],
                ValuePatch {
                    tool_id: Some(None),
                    ..ValuePatch::default()
                },
            )
            .unwrap();
        let value = workflow.value(stage, values[0]).unwrap();
        assert!(value.tool_id().is_none());
        assert!(value.input_bindings().is_empty());
    }

    #[test]
    fn test_delete_value_repacks_and_promotes_identifier() {
        let (mut workflow, stage, values) = table_with_values(3);
        workflow.delete_value(stage, values[0]).unwrap();

        let remaining = workflow.stage(stage).unwrap();
        assert_eq!(remaining.values().len(), 2);
        assert_eq!(remaining.values()[0].id(), values[1]);
        assert_eq!(remaining.values()[0].order_index(), 0);
        assert_eq!(remaining.values()[1].order_index(), 1);
        assert_eq!(remaining.identifier_value().unwrap().id(), values[1]);
    }

    #[test]
    fn test_delete_unknown_value_is_not_found() {
        let (mut workflow, stage, _) = table_with_values(1);
        let error = workflow.delete_value(stage, ValueId::new()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_move_value() {
        let (mut workflow, stage, values) = table_with_values(3);
        assert!(workflow.move_value(stage, values[2], Direction::Up).unwrap());
        assert_eq!(
            value_names(&workflow, stage),
            ["New Value", "New Value 3", "New Value 2"]
        );
        assert!(!workflow.move_value(stage, values[0], Direction::Up).unwrap());
        assert!(workflow.check_order().is_ok());
    }

    #[test]
    fn test_unmarking_identifier_is_rejected() {
        let (mut workflow, stage, values) = table_with_values(2);
        let error = workflow
            .update_value(
                stage,
                values[0],
                ValuePatch {
                    is_identifier: Some(false),
                    ..ValuePatch::default()
                },
            )
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidOperation);
        assert!(workflow.value(stage, values[0]).unwrap().is_identifier());

        workflow
            .update_value(
                stage,
                values[1],
                ValuePatch {
                    is_identifier: Some(false),
                    ..ValuePatch::default()
                },
            )
            .unwrap();
        let identifier = workflow.stage(stage).unwrap().identifier_value().unwrap();
        assert_eq!(identifier.id(), values[0]);
    }

    #[test]
    fn test_add_and_move_on_sparse_indices() {
        let (mut workflow, stage, values) = table_with_values(2);
        workflow.stages_mut()[0].values[1].order_index = 7;

        let added = workflow.add_value(stage).unwrap();
        assert_eq!(workflow.value(stage, added).unwrap().order_index(), 2);
        assert!(workflow.check_order().is_ok());

        workflow.stages_mut()[0].values[2].order_index = 9;
        assert!(workflow.move_value(stage, values[1], Direction::Down).unwrap());
        assert_eq!(workflow.value(stage, values[1]).unwrap().order_index(), 2);
        assert!(workflow.check_order().is_ok());
    }
}
