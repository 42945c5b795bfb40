//! Tool parameter bindings.
//!
//! A binding is the input a tool parameter receives. Which shape of binding a
//! parameter accepts is decided by [`classify`]; [`WorkflowDefinition::bind_input`]
//! rejects anything that does not fit and validates every reference against
//! the positions visible from the bound value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sieve_core::{DocumentId, Error, Result, StageId, ValueId};

use crate::TRACING_TARGET_BINDING;
use crate::definition::WorkflowDefinition;
use crate::reference::{ReferenceAddress, ReferenceCandidate, ResolveOptions};
use crate::tool::{ToolDescriptor, ToolKind};

mod classify;
pub mod lookup;

pub use classify::{BindingKind, classify};
pub use lookup::{ColumnFilter, FilterChain, FilterOperator, Fuzziness, LookupConfig};

/// Where a document input comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DocumentSource {
    /// The document uploaded when the workflow runs.
    UserSupplied,
    /// A stored document.
    Document(DocumentId),
}

impl DocumentSource {
    /// Serialized form of [`DocumentSource::UserSupplied`].
    pub const USER_SUPPLIED: &'static str = "user-supplied document";
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserSupplied => f.write_str(Self::USER_SUPPLIED),
            Self::Document(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for DocumentSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case(Self::USER_SUPPLIED) {
            return Ok(Self::UserSupplied);
        }
        DocumentId::from_str(s.trim())
            .map(Self::Document)
            .map_err(|error| {
                Error::invalid_operation()
                    .with_message(format!("'{s}' is neither a document id nor '{}'", Self::USER_SUPPLIED))
                    .with_source(error)
            })
    }
}

impl TryFrom<String> for DocumentSource {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DocumentSource> for String {
    fn from(value: DocumentSource) -> Self {
        value.to_string()
    }
}

/// Ordered set of references bound to a field-reference-list parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ReferenceList {
    /// Referenced outputs in the order they are fed to the tool.
    pub references: Vec<ReferenceAddress>,
    /// Set when a reference no longer resolves.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stale: bool,
}

impl ReferenceList {
    /// Creates a list from addresses.
    pub fn new(references: impl IntoIterator<Item = ReferenceAddress>) -> Self {
        Self {
            references: references.into_iter().collect(),
            stale: false,
        }
    }
}

/// Input bound to one tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Binding {
    /// Document to extract from.
    Document {
        #[cfg_attr(feature = "schema", schemars(with = "String"))]
        source: DocumentSource,
    },
    /// Knowledge document to consult.
    Knowledge {
        #[cfg_attr(feature = "schema", schemars(with = "String"))]
        source: DocumentSource,
    },
    /// Earlier outputs fed to the tool.
    References(ReferenceList),
    /// Boolean switch.
    Flag { value: bool },
    /// Multi-line instructions.
    Prompt { text: String },
    /// Single line of text.
    Text { text: String },
    /// Lookup against an external table.
    Lookup(LookupConfig),
}

impl Binding {
    /// Returns the parameter kind this binding satisfies.
    pub fn kind(&self) -> BindingKind {
        match self {
            Self::Document { .. } => BindingKind::DocumentInput,
            Self::Knowledge { .. } => BindingKind::KnowledgeReference,
            Self::References(_) | Self::Lookup(_) => BindingKind::FieldReferenceList,
            Self::Flag { .. } => BindingKind::BooleanFlag,
            Self::Prompt { .. } => BindingKind::MultilinePrompt,
            Self::Text { .. } => BindingKind::FreeText,
        }
    }

    /// Returns every reference address the binding holds.
    pub fn addresses(&self) -> Vec<&ReferenceAddress> {
        match self {
            Self::References(list) => list.references.iter().collect(),
            Self::Lookup(config) => config.bound_references().collect(),
            _ => Vec::new(),
        }
    }

    /// Returns true if a held reference no longer resolves.
    pub fn stale(&self) -> bool {
        match self {
            Self::References(list) => list.stale,
            Self::Lookup(config) => config.stale,
            _ => false,
        }
    }

    pub(crate) fn set_stale(&mut self, stale: bool) {
        match self {
            Self::References(list) => list.stale = stale,
            Self::Lookup(config) => config.stale = stale,
            _ => {}
        }
    }

    fn addresses_mut(&mut self) -> Vec<&mut ReferenceAddress> {
        match self {
            Self::References(list) => list.references.iter_mut().collect(),
            Self::Lookup(config) => config.bound_references_mut().collect(),
            _ => Vec::new(),
        }
    }
}

/// A binding reference that points outside the positions visible from its value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingIssue {
    /// Stage of the value holding the binding.
    pub stage_id: StageId,
    /// Value holding the binding.
    pub value_id: ValueId,
    /// Bound parameter.
    pub param_id: String,
    /// Address that no longer resolves.
    pub address: ReferenceAddress,
    /// Current label of the target, if the target still exists.
    pub label: Option<String>,
}

impl WorkflowDefinition {
    /// Binds a tool parameter of a value.
    ///
    /// The value must already use `tool`. Text and prompt bindings are
    /// interchangeable and stored as whichever the parameter classifies as.
    /// Duplicate references collapse onto their first occurrence.
    pub fn bind_input(
        &mut self,
        stage_id: StageId,
        value_id: ValueId,
        tool: &ToolDescriptor,
        param_id: &str,
        binding: Binding,
    ) -> Result<()> {
        let value = self.value(stage_id, value_id)?;
        if value.tool_id() != Some(tool.id) {
            return Err(Error::invalid_operation().with_message(format!(
                "value '{}' is not bound to tool '{}'",
                value.name(),
                tool.name
            )));
        }
        let param = tool.parameter(param_id).ok_or_else(|| {
            Error::not_found().with_message(format!("parameter '{param_id}' of tool '{}'", tool.name))
        })?;

        let kind = classify(param);
        let scope = self.available_references(
            stage_id,
            value.order_index(),
            ResolveOptions { expand_fields: true },
        )?;
        let binding = check_binding(kind, tool, &scope, binding)?;

        self.value_mut(stage_id, value_id)?
            .input_bindings_mut()
            .insert(param_id.to_owned(), binding);

        tracing::debug!(
            target: TRACING_TARGET_BINDING,
            stage_id = %stage_id,
            value_id = %value_id,
            param_id,
            kind = %kind,
            "input bound"
        );

        self.touch();
        Ok(())
    }

    /// Removes the binding of a tool parameter.
    pub fn unbind_input(
        &mut self,
        stage_id: StageId,
        value_id: ValueId,
        param_id: &str,
    ) -> Result<Binding> {
        let removed = self
            .value_mut(stage_id, value_id)?
            .input_bindings_mut()
            .remove(param_id)
            .ok_or_else(|| {
                Error::not_found().with_message(format!("binding '{param_id}' of value {value_id}"))
            })?;

        tracing::debug!(
            target: TRACING_TARGET_BINDING,
            value_id = %value_id,
            param_id,
            "input unbound"
        );

        self.touch();
        Ok(removed)
    }

    /// Lists every bound reference that is no longer visible from its value.
    pub fn binding_issues(&self) -> Vec<BindingIssue> {
        let mut issues = Vec::new();
        for stage in self.stages() {
            for value in stage.values() {
                if value.input_bindings().values().all(|binding| binding.addresses().is_empty()) {
                    continue;
                }
                let scope = self
                    .available_references(
                        stage.id(),
                        value.order_index(),
                        ResolveOptions { expand_fields: true },
                    )
                    .unwrap_or_default();

                for (param_id, binding) in value.input_bindings() {
                    for address in binding.addresses() {
                        if in_scope(&scope, address) {
                            continue;
                        }
                        issues.push(BindingIssue {
                            stage_id: stage.id(),
                            value_id: value.id(),
                            param_id: param_id.clone(),
                            address: address.clone(),
                            label: self.render_label(address),
                        });
                    }
                }
            }
        }
        issues
    }

    /// Re-checks every binding and updates its stale flag.
    pub(crate) fn refresh_binding_flags(&mut self) -> Vec<BindingIssue> {
        let issues = self.binding_issues();
        for stage in self.stages_mut() {
            let stage_id = stage.id();
            for value in &mut stage.values {
                let value_id = value.id();
                for (param_id, binding) in value.input_bindings_mut() {
                    let stale = issues.iter().any(|issue| {
                        issue.stage_id == stage_id
                            && issue.value_id == value_id
                            && issue.param_id == *param_id
                    });
                    if stale && !binding.stale() {
                        tracing::warn!(
                            target: TRACING_TARGET_BINDING,
                            value_id = %value_id,
                            param_id = %param_id,
                            "binding references an unavailable output"
                        );
                    }
                    binding.set_stale(stale);
                }
            }
        }
        issues
    }

    /// Points references at a renamed field. Returns how many were rewritten.
    pub(crate) fn rename_field_references(
        &mut self,
        stage_id: StageId,
        value_id: ValueId,
        old_name: &str,
        new_name: &str,
    ) -> usize {
        let mut rewritten = 0;
        for stage in self.stages_mut() {
            for value in &mut stage.values {
                for binding in value.input_bindings_mut().values_mut() {
                    for address in binding.addresses_mut() {
                        if address.stage_id == stage_id
                            && address.value_id == value_id
                            && address.field_name.as_deref() == Some(old_name)
                        {
                            address.field_name = Some(new_name.to_owned());
                            rewritten += 1;
                        }
                    }
                }
            }
        }
        rewritten
    }
}

fn check_binding(
    kind: BindingKind,
    tool: &ToolDescriptor,
    scope: &[ReferenceCandidate],
    binding: Binding,
) -> Result<Binding> {
    match (kind, binding) {
        (BindingKind::DocumentInput, binding @ Binding::Document { .. })
        | (BindingKind::KnowledgeReference, binding @ Binding::Knowledge { .. })
        | (BindingKind::BooleanFlag, binding @ Binding::Flag { .. }) => Ok(binding),
        (
            BindingKind::MultilinePrompt,
            Binding::Prompt { text } | Binding::Text { text },
        ) => Ok(Binding::Prompt { text }),
        (BindingKind::FreeText, Binding::Prompt { text } | Binding::Text { text }) => {
            Ok(Binding::Text { text })
        }
        (BindingKind::FieldReferenceList, Binding::References(list)) => {
            let mut references: Vec<ReferenceAddress> = Vec::with_capacity(list.references.len());
            for address in list.references {
                check_scope(scope, &address)?;
                if !references.contains(&address) {
                    references.push(address);
                }
            }
            Ok(Binding::References(ReferenceList {
                references,
                stale: false,
            }))
        }
        (BindingKind::FieldReferenceList, Binding::Lookup(mut config)) => {
            if tool.kind != ToolKind::DatabaseLookup {
                return Err(Error::invalid_operation()
                    .with_message(format!("tool '{}' is not a lookup tool", tool.name)));
            }
            config.validate()?;
            for address in config.bound_references() {
                check_scope(scope, address)?;
            }
            config.stale = false;
            Ok(Binding::Lookup(config))
        }
        (kind, binding) => Err(Error::invalid_operation().with_message(format!(
            "parameter expects a {kind} binding, got {}",
            binding.kind()
        ))),
    }
}

fn in_scope(scope: &[ReferenceCandidate], address: &ReferenceAddress) -> bool {
    scope.iter().any(|candidate| candidate.address == *address)
}

fn check_scope(scope: &[ReferenceCandidate], address: &ReferenceAddress) -> Result<()> {
    if in_scope(scope, address) {
        Ok(())
    } else {
        Err(Error::invalid_reference().with_message(format!(
            "{address} is not available at this position"
        )))
    }
}

#[cfg(test)]
mod tests {
    use sieve_core::{ErrorKind, ToolId};

    use super::*;
    use crate::definition::{StageKind, ValuePatch};
    use crate::tool::ParamDescriptor;

    fn tool(kind: ToolKind) -> ToolDescriptor {
        let param = |id: &str, type_tag: Option<&str>| ParamDescriptor {
            id: id.to_owned(),
            name: id.to_owned(),
            type_tag: type_tag.map(str::to_owned),
            description: String::new(),
        };
        ToolDescriptor {
            id: ToolId::new(),
            name: "Extractor".into(),
            description: String::new(),
            kind,
            parameters: vec![
                param("Input Data", None),
                param("Instructions", None),
                param("Language", None),
                param("Source Document", None),
                param("strict", Some("boolean")),
            ],
        }
    }

    struct Fixture {
        workflow: WorkflowDefinition,
        first: StageId,
        earlier: ValueId,
        second: StageId,
        target: ValueId,
        later: ValueId,
        tool: ToolDescriptor,
    }

    fn fixture(kind: ToolKind) -> Fixture {
        let mut workflow = WorkflowDefinition::new();
        let first = workflow.add_stage(StageKind::Table);
        let earlier = workflow.add_value(first).unwrap();
        let second = workflow.add_stage(StageKind::Table);
        let target = workflow.add_value(second).unwrap();
        let later = workflow.add_value(second).unwrap();

        let tool = tool(kind);
        workflow
            .update_value(
                second,
                target,
                ValuePatch {
                    tool_id: Some(Some(tool.id)),
                    ..ValuePatch::default()
                },
            )
            .unwrap();

        Fixture {
            workflow,
            first,
            earlier,
            second,
            target,
            later,
            tool,
        }
    }

    #[test]
    fn test_document_source_serialization() {
        let binding = Binding::Document {
            source: DocumentSource::UserSupplied,
        };
        let json = serde_json::to_value(&binding).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "document", "source": "user-supplied document" })
        );

        let id = DocumentId::new();
        let parsed: DocumentSource = serde_json::from_value(serde_json::json!(id.to_string())).unwrap();
        assert_eq!(parsed, DocumentSource::Document(id));
        assert!(serde_json::from_value::<DocumentSource>(serde_json::json!("somewhere")).is_err());
    }

    #[test]
    fn test_bind_references_dedupes_in_order() {
        let mut f = fixture(ToolKind::AiOnly);
        let earlier = ReferenceAddress::value(f.first, f.earlier);
        f.workflow
            .bind_input(
                f.second,
                f.target,
                &f.tool,
                "Input Data",
                Binding::References(ReferenceList::new([earlier.clone(), earlier.clone()])),
            )
            .unwrap();

        let binding = f.workflow.value(f.second, f.target).unwrap().binding("Input Data").unwrap();
        assert_eq!(binding.addresses(), [&earlier]);
    }

    #[test]
    fn test_bind_out_of_scope_reference_is_rejected() {
        let mut f = fixture(ToolKind::AiOnly);
        let later = ReferenceAddress::value(f.second, f.later);
        let own = ReferenceAddress::value(f.second, f.target);

        for address in [later, own] {
            let error = f
                .workflow
                .bind_input(
                    f.second,
                    f.target,
                    &f.tool,
                    "Input Data",
                    Binding::References(ReferenceList::new([address])),
                )
                .unwrap_err();
            assert_eq!(error.kind(), ErrorKind::InvalidReference);
        }
        assert!(f.workflow.value(f.second, f.target).unwrap().input_bindings().is_empty());
    }

    #[test]
    fn test_shape_mismatch_is_invalid_operation() {
        let mut f = fixture(ToolKind::AiOnly);
        let error = f
            .workflow
            .bind_input(f.second, f.target, &f.tool, "strict", Binding::Text { text: "yes".into() })
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn test_text_and_prompt_are_interchangeable() {
        let mut f = fixture(ToolKind::AiOnly);
        f.workflow
            .bind_input(
                f.second,
                f.target,
                &f.tool,
                "Instructions",
                Binding::Text { text: "Be brief".into() },
            )
            .unwrap();
        f.workflow
            .bind_input(
                f.second,
                f.target,
                &f.tool,
                "Language",
                Binding::Prompt { text: "English".into() },
            )
            .unwrap();

        let value = f.workflow.value(f.second, f.target).unwrap();
        assert_eq!(value.binding("Instructions").unwrap().kind(), BindingKind::MultilinePrompt);
        assert_eq!(value.binding("Language").unwrap().kind(), BindingKind::FreeText);
    }

    #[test]
    fn test_unknown_parameter_and_foreign_tool() {
        let mut f = fixture(ToolKind::AiOnly);
        let error = f
            .workflow
            .bind_input(f.second, f.target, &f.tool, "missing", Binding::Flag { value: true })
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);

        let other = tool(ToolKind::AiOnly);
        let error = f
            .workflow
            .bind_input(f.second, f.target, &other, "strict", Binding::Flag { value: true })
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn test_lookup_binding_requires_lookup_tool() {
        let mut config = LookupConfig::new("Salary");
        config.filters.append_filter("Name");
        config.filters.bind_input(0, Some(ReferenceAddress::value(Default::default(), Default::default())));

        let mut f = fixture(ToolKind::AiOnly);
        let error = f
            .workflow
            .bind_input(f.second, f.target, &f.tool, "Input Data", Binding::Lookup(config.clone()))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidOperation);

        let mut f = fixture(ToolKind::DatabaseLookup);
        let error = f
            .workflow
            .bind_input(f.second, f.target, &f.tool, "Input Data", Binding::Lookup(config.clone()))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidReference);

        config
            .filters
            .bind_input(0, Some(ReferenceAddress::value(f.first, f.earlier)));
        f.workflow
            .bind_input(f.second, f.target, &f.tool, "Input Data", Binding::Lookup(config))
            .unwrap();
    }

    #[test]
    fn test_moving_stage_flags_and_unflags_bindings() {
        let mut f = fixture(ToolKind::AiOnly);
        f.workflow
            .bind_input(
                f.second,
                f.target,
                &f.tool,
                "Input Data",
                Binding::References(ReferenceList::new([ReferenceAddress::value(
                    f.first, f.earlier,
                )])),
            )
            .unwrap();

        f.workflow.move_stage(f.second, sieve_core::Direction::Up).unwrap();
        let issues = f.workflow.binding_issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].param_id, "Input Data");
        assert!(issues[0].label.is_some());
        assert!(f.workflow.value(f.second, f.target).unwrap().binding("Input Data").unwrap().stale());

        f.workflow.move_stage(f.second, sieve_core::Direction::Down).unwrap();
        assert!(f.workflow.binding_issues().is_empty());
        assert!(!f.workflow.value(f.second, f.target).unwrap().binding("Input Data").unwrap().stale());
    }

    #[test]
    fn test_unbind_input() {
        let mut f = fixture(ToolKind::AiOnly);
        f.workflow
            .bind_input(f.second, f.target, &f.tool, "strict", Binding::Flag { value: false })
            .unwrap();
        let removed = f.workflow.unbind_input(f.second, f.target, "strict").unwrap();
        assert_eq!(removed, Binding::Flag { value: false });

        let error = f.workflow.unbind_input(f.second, f.target, "strict").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }
}
