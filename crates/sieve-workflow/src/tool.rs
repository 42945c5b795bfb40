//! Extraction tool metadata.
//!
//! Tool metadata arrives in more than one shape: parameters may be a JSON
//! array of descriptors or an object keyed by parameter id, and keys may be
//! camelCase or snake_case. [`ToolDescriptor::from_json`] normalizes all of
//! them into one canonical form on ingestion.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use sieve_core::{Error, Result, ToolId};
use strum::{AsRefStr, Display, EnumString};

use crate::TRACING_TARGET;

/// How a tool produces its output.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ToolKind {
    /// Output is produced by a model prompt.
    #[default]
    #[strum(to_string = "AI_ONLY", serialize = "AI")]
    AiOnly,
    /// Output is produced by a script.
    #[strum(to_string = "CODE", serialize = "SCRIPT")]
    Code,
    /// Output is looked up in an external table.
    #[strum(to_string = "DATABASE_LOOKUP", serialize = "LOOKUP")]
    DatabaseLookup,
}

/// Canonical description of one tool input parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ParamDescriptor {
    /// Key the binding is stored under.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Declared type tag, if any.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,
    /// Parameter description.
    #[serde(default)]
    pub description: String,
}

/// Canonical tool metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Json")]
pub struct ToolDescriptor {
    /// Tool id.
    pub id: ToolId,
    /// Display name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// Execution kind.
    pub kind: ToolKind,
    /// Input parameters in declared order.
    pub parameters: Vec<ParamDescriptor>,
}

impl ToolDescriptor {
    /// Normalizes tool metadata from any accepted JSON shape.
    pub fn from_json(json: &Json) -> Result<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| invalid("tool metadata must be a JSON object"))?;

        let id = string_field(object, &["id", "toolId", "tool_id"])
            .ok_or_else(|| invalid("tool metadata has no id"))?;
        let id = id
            .parse::<ToolId>()
            .map_err(|error| invalid(format!("invalid tool id '{id}'")).with_source(error))?;
        let name = string_field(object, &["name", "toolName", "tool_name"])
            .unwrap_or_default()
            .to_owned();
        let description = string_field(object, &["description"])
            .unwrap_or_default()
            .to_owned();

        let kind = match string_field(object, &["kind", "toolType", "tool_type"]) {
            Some(tag) => tag.parse::<ToolKind>().unwrap_or_else(|_| {
                tracing::debug!(target: TRACING_TARGET, tool_id = %id, tag, "unknown tool kind");
                ToolKind::default()
            }),
            None => ToolKind::default(),
        };

        let parameters = ["parameters", "inputParameters", "input_parameters"]
            .iter()
            .find_map(|key| object.get(*key))
            .map(normalize_parameters)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            id,
            name,
            description,
            kind,
            parameters,
        })
    }

    /// Parses and normalizes tool metadata from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_json(&serde_json::from_str(json)?)
    }

    /// Looks up a parameter by id.
    pub fn parameter(&self, param_id: &str) -> Option<&ParamDescriptor> {
        self.parameters.iter().find(|param| param.id == param_id)
    }

    /// Returns true if the tool matches against an external table.
    pub fn is_lookup(&self) -> bool {
        self.kind == ToolKind::DatabaseLookup
    }
}

impl TryFrom<Json> for ToolDescriptor {
    type Error = Error;

    fn try_from(json: Json) -> Result<Self> {
        Self::from_json(&json)
    }
}

/// Set of tools keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: HashMap<ToolId, ToolDescriptor>,
}

impl ToolCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON array of tool metadata.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let tools: Vec<ToolDescriptor> = serde_json::from_str(json)?;
        Ok(tools.into_iter().collect())
    }

    /// Adds a tool, replacing any tool with the same id.
    pub fn insert(&mut self, tool: ToolDescriptor) -> Option<ToolDescriptor> {
        self.tools.insert(tool.id, tool)
    }

    /// Looks up a tool by id.
    pub fn get(&self, tool_id: ToolId) -> Option<&ToolDescriptor> {
        self.tools.get(&tool_id)
    }

    /// Returns the number of tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if the catalog holds no tools.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl FromIterator<ToolDescriptor> for ToolCatalog {
    fn from_iter<I: IntoIterator<Item = ToolDescriptor>>(iter: I) -> Self {
        Self {
            tools: iter.into_iter().map(|tool| (tool.id, tool)).collect(),
        }
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::serialization().with_message(message)
}

fn string_field<'a>(object: &'a Map<String, Json>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| object.get(*key))
        .and_then(Json::as_str)
}

fn normalize_parameters(json: &Json) -> Result<Vec<ParamDescriptor>> {
    let parameters = match json {
        Json::Null => Vec::new(),
        Json::Array(items) => items
            .iter()
            .map(|item| normalize_parameter(None, item))
            .collect::<Result<Vec<_>>>()?,
        Json::Object(entries) => entries
            .iter()
            .map(|(id, item)| normalize_parameter(Some(id.as_str()), item))
            .collect::<Result<Vec<_>>>()?,
        _ => return Err(invalid("tool parameters must be an array or an object")),
    };

    for (position, param) in parameters.iter().enumerate() {
        if parameters[..position].iter().any(|other| other.id == param.id) {
            return Err(invalid(format!("duplicate parameter id '{}'", param.id)));
        }
    }
    Ok(parameters)
}

fn normalize_parameter(key: Option<&str>, json: &Json) -> Result<ParamDescriptor> {
    match json {
        Json::String(type_tag) => {
            let id = key.ok_or_else(|| invalid("parameter entries in an array must be objects"))?;
            Ok(ParamDescriptor {
                id: id.to_owned(),
                name: id.to_owned(),
                type_tag: Some(type_tag.clone()),
                description: String::new(),
            })
        }
        Json::Object(object) => {
            let name = string_field(object, &["name", "paramName", "param_name"])
                .or(key)
                .ok_or_else(|| invalid("parameter has no name"))?
                .to_owned();
            let id = string_field(object, &["id", "paramId", "param_id"])
                .or(key)
                .map(str::to_owned)
                .unwrap_or_else(|| name.clone());
            Ok(ParamDescriptor {
                id,
                name,
                type_tag: string_field(object, &["type", "paramType", "param_type"])
                    .map(str::to_owned),
                description: string_field(object, &["description"])
                    .unwrap_or_default()
                    .to_owned(),
            })
        }
        _ => Err(invalid("parameter must be an object or a type tag")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sieve_core::ErrorKind;

    use super::*;

    const TOOL_ID: &str = "0190f1c2-7d3a-7c3e-9a51-2f4c8e6b1d00";

    #[test]
    fn test_array_parameters() {
        let tool = ToolDescriptor::from_json(&json!({
            "id": TOOL_ID,
            "name": "Column Extractor",
            "toolType": "CODE",
            "inputParameters": [
                { "name": "Column Name", "type": "data", "description": "Column to read" },
                { "id": "file", "name": "Excel File", "type": "document" }
            ]
        }))
        .unwrap();

        assert_eq!(tool.kind, ToolKind::Code);
        assert_eq!(tool.parameters.len(), 2);
        assert_eq!(tool.parameters[0].id, "Column Name");
        assert_eq!(tool.parameters[0].type_tag.as_deref(), Some("data"));
        assert_eq!(tool.parameter("file").unwrap().name, "Excel File");
    }

    #[test]
    fn test_keyed_object_parameters() {
        let tool = ToolDescriptor::from_json(&json!({
            "id": TOOL_ID,
            "tool_type": "lookup",
            "input_parameters": {
                "source": { "name": "Source Document", "type": "document" },
                "strict": "boolean",
                "notes": { "description": "Free notes" }
            }
        }))
        .unwrap();

        assert!(tool.is_lookup());
        let ids: Vec<_> = tool.parameters.iter().map(|param| param.id.as_str()).collect();
        assert_eq!(ids, ["source", "strict", "notes"]);
        assert_eq!(tool.parameter("strict").unwrap().type_tag.as_deref(), Some("boolean"));
        assert_eq!(tool.parameter("notes").unwrap().name, "notes");
    }

    #[test]
    fn test_canonical_form_round_trips() {
        let tool = ToolDescriptor::from_json(&json!({
            "id": TOOL_ID,
            "name": "Summarizer",
            "inputParameters": [{ "name": "Instructions", "type": "textarea" }]
        }))
        .unwrap();

        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["kind"], "AI_ONLY");
        assert_eq!(json["parameters"][0]["type"], "textarea");

        let parsed: ToolDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, tool);
    }

    #[test]
    fn test_unknown_kind_defaults_to_ai() {
        let tool = ToolDescriptor::from_json(&json!({ "id": TOOL_ID, "kind": "quantum" })).unwrap();
        assert_eq!(tool.kind, ToolKind::AiOnly);
        assert!(tool.parameters.is_empty());
    }

    #[test]
    fn test_rejects_malformed_metadata() {
        let cases = [
            json!([]),
            json!({ "name": "no id" }),
            json!({ "id": "not-a-uuid" }),
            json!({ "id": TOOL_ID, "inputParameters": 3 }),
            json!({ "id": TOOL_ID, "inputParameters": ["data"] }),
            json!({ "id": TOOL_ID, "inputParameters": [{ "type": "data" }] }),
            json!({ "id": TOOL_ID, "inputParameters": [{ "name": "A" }, { "name": "A" }] }),
        ];
        for case in cases {
            let error = ToolDescriptor::from_json(&case).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Serialization, "{case}");
        }
    }

    #[test]
    fn test_catalog_from_json() {
        let catalog = ToolCatalog::from_json_str(&format!(r#"[{{"id":"{TOOL_ID}","name":"A"}}]"#))
            .unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(TOOL_ID.parse().unwrap()).unwrap().name, "A");
    }
}
