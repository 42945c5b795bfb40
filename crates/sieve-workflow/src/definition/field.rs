//! Field definition types and field-level operations.
//!
//! Fields only exist under values of page stages. They have no tool binding
//! of their own and are addressed through their parent value plus their name.

use serde::{Deserialize, Serialize};
use sieve_core::{Error, Result, StageId, ValueId};

use super::stage::StageKind;
use super::value::DataType;
use super::{WorkflowDefinition, placeholder_name, validate_name};
use crate::TRACING_TARGET;

/// A named sub-element of a page-stage value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct Field {
    /// Field name, unique within the parent value.
    pub name: String,
    /// Data type of the field.
    #[serde(default)]
    pub data_type: DataType,
    /// Field description.
    #[serde(default)]
    pub description: String,
}

impl Field {
    /// Creates a text field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::default(),
            description: String::new(),
        }
    }
}

/// Partial update applied to a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct FieldPatch {
    /// New name; references to the field follow the rename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New data type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl WorkflowDefinition {
    /// Appends a field with a placeholder name and returns that name.
    pub fn add_field(&mut self, stage_id: StageId, value_id: ValueId) -> Result<String> {
        self.ensure_page(stage_id)?;
        let fields = self.page_fields_mut(stage_id, value_id)?;

        let name = placeholder_name("New Field", fields.iter().map(|field| field.name.as_str()));
        fields.push(Field::new(name.clone()));

        tracing::debug!(
            target: TRACING_TARGET,
            value_id = %value_id,
            field = %name,
            "field added"
        );

        self.touch();
        Ok(name)
    }

    /// Applies a partial update to a field.
    ///
    /// Renaming rewrites every reference that pointed at the old name.
    pub fn update_field(
        &mut self,
        stage_id: StageId,
        value_id: ValueId,
        field_name: &str,
        patch: FieldPatch,
    ) -> Result<()> {
        self.ensure_page(stage_id)?;
        let fields = self.page_fields_mut(stage_id, value_id)?;
        let position = field_position(fields, value_id, field_name)?;

        let name = match &patch.name {
            Some(name) => Some(validate_name(
                name,
                fields
                    .iter()
                    .enumerate()
                    .filter(|(index, _)| *index != position)
                    .map(|(_, field)| field.name.as_str()),
            )?),
            None => None,
        };

        let field = &mut fields[position];
        if let Some(data_type) = patch.data_type {
            field.data_type = data_type;
        }
        if let Some(description) = patch.description {
            field.description = description;
        }

        if let Some(name) = name
            && name != field_name
        {
            field.name = name.clone();
            let rewritten = self.rename_field_references(stage_id, value_id, field_name, &name);
            tracing::debug!(
                target: TRACING_TARGET,
                value_id = %value_id,
                from = field_name,
                to = %name,
                rewritten,
                "field renamed"
            );
        }

        self.touch();
        Ok(())
    }

    /// Removes a field from a page-stage value.
    pub fn delete_field(
        &mut self,
        stage_id: StageId,
        value_id: ValueId,
        field_name: &str,
    ) -> Result<Field> {
        self.ensure_page(stage_id)?;
        let fields = self.page_fields_mut(stage_id, value_id)?;
        let position = field_position(fields, value_id, field_name)?;
        let removed = fields.remove(position);

        let issues = self.refresh_binding_flags();
        tracing::debug!(
            target: TRACING_TARGET,
            value_id = %value_id,
            field = field_name,
            stale_bindings = issues.len(),
            "field deleted"
        );

        self.touch();
        Ok(removed)
    }

    fn ensure_page(&self, stage_id: StageId) -> Result<()> {
        let stage = self.stage(stage_id)?;
        if stage.kind() != StageKind::Page {
            return Err(Error::invalid_operation().with_message(format!(
                "fields are only allowed in PAGE stages, '{}' is {}",
                stage.name(),
                stage.kind()
            )));
        }
        Ok(())
    }

    fn page_fields_mut(&mut self, stage_id: StageId, value_id: ValueId) -> Result<&mut Vec<Field>> {
        Ok(self
            .value_mut(stage_id, value_id)?
            .fields
            .get_or_insert_default())
    }
}

fn field_position(fields: &[Field], value_id: ValueId, field_name: &str) -> Result<usize> {
    fields
        .iter()
        .position(|field| field.name == field_name)
        .ok_or_else(|| {
            Error::not_found().with_message(format!("field '{field_name}' in value {value_id}"))
        })
}
