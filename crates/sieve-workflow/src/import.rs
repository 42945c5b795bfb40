//! One-way import of legacy project schemas.
//!
//! Legacy projects describe their extraction as a flat list of document
//! fields plus collections of properties. Fields become values of a single
//! page stage, and each collection becomes a table stage.

use serde::{Deserialize, Serialize};
use sieve_core::order;
use sieve_core::{Result, WorkflowId};

use crate::TRACING_TARGET_IMPORT;
use crate::definition::{
    DataType, Stage, StageKind, Value, WorkflowDefinition, placeholder_name,
};
use crate::store::WorkflowStore;

/// Name of the page stage holding imported document fields.
pub const DOCUMENT_INFO_STAGE: &str = "Document Info";

/// Legacy project schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacySchema {
    /// Document-level fields.
    pub fields: Vec<LegacyField>,
    /// Repeating collections.
    pub collections: Vec<LegacyCollection>,
}

impl LegacySchema {
    /// Parses a legacy schema from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns true if the schema declares nothing.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.collections.is_empty()
    }
}

/// Legacy document-level field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyField {
    /// Field name.
    pub field_name: String,
    /// Legacy type name, e.g. `TEXT` or `CURRENCY`.
    pub field_type: String,
    /// Field description.
    pub description: Option<String>,
    /// Position of the field.
    pub order_index: Option<i64>,
    /// Allowed values of a `CHOICE` field.
    pub choice_options: Vec<String>,
}

/// Legacy collection of repeating records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyCollection {
    /// Collection name.
    pub collection_name: String,
    /// Collection description.
    pub description: Option<String>,
    /// Properties of each record.
    pub properties: Vec<LegacyProperty>,
}

/// Legacy property of a collection record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyProperty {
    /// Property name.
    pub property_name: String,
    /// Legacy type name.
    pub property_type: String,
    /// Property description.
    pub description: Option<String>,
    /// Position of the property.
    pub order_index: Option<i64>,
    /// Marks the property keying the records.
    pub is_identifier: bool,
    /// Allowed values of a `CHOICE` property.
    pub choice_options: Vec<String>,
}

/// Converts a legacy schema into a workflow definition.
///
/// Legacy `orderIndex` decides the order of values; array position only
/// breaks ties and stands in for a missing index. Empty or duplicate names
/// get placeholder names.
pub fn import_legacy_schema(schema: &LegacySchema) -> WorkflowDefinition {
    let mut workflow = WorkflowDefinition::new();

    if !schema.fields.is_empty() {
        let mut stage = Stage::new(
            StageKind::Page,
            DOCUMENT_INFO_STAGE.to_owned(),
            order::next_index(workflow.stages()),
        );
        for field in sort_legacy(&schema.fields, |field| field.order_index) {
            let value = import_value(
                &stage,
                &field.field_name,
                &field.field_type,
                field.description.as_deref(),
                &field.choice_options,
            );
            stage.values.push(value);
        }
        workflow.push_stage(stage);
    }

    for collection in &schema.collections {
        let name = unique_name(
            &collection.collection_name,
            StageKind::Table.placeholder_name(),
            workflow.stages().iter().map(Stage::name),
        );
        let mut stage = Stage::new(StageKind::Table, name, order::next_index(workflow.stages()));
        stage.description = collection.description.clone().unwrap_or_default();

        let mut identifier = None;
        for property in sort_legacy(&collection.properties, |property| property.order_index) {
            let value = import_value(
                &stage,
                &property.property_name,
                &property.property_type,
                property.description.as_deref(),
                &property.choice_options,
            );
            if property.is_identifier && identifier.is_none() {
                identifier = Some(value.id());
            }
            stage.values.push(value);
        }
        stage.set_identifier(identifier);
        workflow.push_stage(stage);
    }

    workflow.normalize();

    tracing::info!(
        target: TRACING_TARGET_IMPORT,
        fields = schema.fields.len(),
        collections = schema.collections.len(),
        stages = workflow.stages().len(),
        "legacy schema imported"
    );
    workflow
}

/// Imports a legacy schema unless a workflow is already stored.
///
/// Returns the stored workflow untouched when one exists, and `false` as the
/// second element. Otherwise the imported workflow is saved and returned
/// with `true`.
pub async fn import_if_absent(
    store: &dyn WorkflowStore,
    workflow_id: WorkflowId,
    schema: &LegacySchema,
) -> Result<(WorkflowDefinition, bool)> {
    if let Some(existing) = store.load(workflow_id).await? {
        tracing::debug!(
            target: TRACING_TARGET_IMPORT,
            workflow_id = %workflow_id,
            "workflow already stored, legacy import skipped"
        );
        return Ok((existing, false));
    }

    let workflow = import_legacy_schema(schema);
    store.save(workflow_id, &workflow).await?;
    Ok((workflow, true))
}

/// Maps a legacy type name onto a data type.
pub fn legacy_data_type(type_name: &str) -> DataType {
    match type_name.trim().to_ascii_uppercase().as_str() {
        "TEXT" | "STRING" | "TEXTAREA" => DataType::Text,
        "NUMBER" | "INTEGER" | "DECIMAL" | "CURRENCY" | "PERCENTAGE" => DataType::Number,
        "DATE" | "DATETIME" => DataType::Date,
        "BOOLEAN" | "BOOL" => DataType::Boolean,
        "CHOICE" | "SELECT" => DataType::Choice,
        _ => {
            tracing::debug!(
                target: TRACING_TARGET_IMPORT,
                type_name,
                "unknown legacy type, imported as TEXT"
            );
            DataType::Text
        }
    }
}

fn import_value(
    stage: &Stage,
    name: &str,
    type_name: &str,
    description: Option<&str>,
    choices: &[String],
) -> Value {
    let name = unique_name(name, "New Value", stage.values().iter().map(Value::name));
    let mut value = Value::new(
        name,
        order::next_index(stage.values()),
        stage.kind() == StageKind::Page,
    );
    value.description = description.unwrap_or_default().to_owned();
    value.data_type = legacy_data_type(type_name);
    if value.data_type == DataType::Choice {
        value.choices = choices.to_vec();
    }
    value
}

fn sort_legacy<T>(items: &[T], order_index: impl Fn(&T) -> Option<i64>) -> Vec<&T> {
    let mut sorted: Vec<(i64, &T)> = items
        .iter()
        .enumerate()
        .map(|(position, item)| (order_index(item).unwrap_or(position as i64), item))
        .collect();
    sorted.sort_by_key(|(key, _)| *key);
    sorted.into_iter().map(|(_, item)| item).collect()
}

fn unique_name<'a>(name: &str, fallback: &str, taken: impl Iterator<Item = &'a str>) -> String {
    let name = name.trim();
    placeholder_name(if name.is_empty() { fallback } else { name }, taken)
}
