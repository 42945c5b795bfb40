//! Cross-stage reference resolution.
//!
//! A value may only consume outputs that are produced before it: values of
//! earlier stages, and values placed above it in its own stage. References
//! are stored as ids and turned into `Stage.Value[.Field]` labels only for
//! display, so renaming never breaks a binding.

use std::fmt;

use serde::{Deserialize, Serialize};
use sieve_core::{Error, Result, StageId, ValueId};

use crate::definition::{DataType, Stage, StageKind, WorkflowDefinition};

mod mention;

pub use mention::{Mention, scan_mentions};

/// Stable address of a value, or of a field under a page-stage value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ReferenceAddress {
    /// Stage owning the referenced value.
    pub stage_id: StageId,
    /// Referenced value.
    pub value_id: ValueId,
    /// Referenced field of the value, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
}

impl ReferenceAddress {
    /// Addresses a whole value.
    pub fn value(stage_id: StageId, value_id: ValueId) -> Self {
        Self {
            stage_id,
            value_id,
            field_name: None,
        }
    }

    /// Addresses one field of a page-stage value.
    pub fn field(stage_id: StageId, value_id: ValueId, field_name: impl Into<String>) -> Self {
        Self {
            stage_id,
            value_id,
            field_name: Some(field_name.into()),
        }
    }
}

impl fmt::Display for ReferenceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stage_id, self.value_id)?;
        if let Some(field_name) = &self.field_name {
            write!(f, "/{field_name}")?;
        }
        Ok(())
    }
}

/// An output visible from some position, with its current label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceCandidate {
    /// Stable address stored in bindings.
    pub address: ReferenceAddress,
    /// `Stage.Value` or `Stage.Value.Field`, built from current names.
    pub label: String,
    /// Data type of the referenced value or field.
    pub data_type: DataType,
    /// Order index of the owning stage.
    pub stage_index: usize,
    /// Order index of the referenced value.
    pub value_index: usize,
}

/// Options of [`WorkflowDefinition::available_references`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// List the fields of page-stage values right after their parent value.
    #[serde(default)]
    pub expand_fields: bool,
}

impl WorkflowDefinition {
    /// Lists the outputs a value at `value_order_index` of `stage_id` may
    /// reference, in stage order then value order.
    ///
    /// `value_order_index` may equal the number of values in the stage to
    /// ask on behalf of a value that is about to be appended.
    pub fn available_references(
        &self,
        stage_id: StageId,
        value_order_index: usize,
        options: ResolveOptions,
    ) -> Result<Vec<ReferenceCandidate>> {
        let target = self.stage(stage_id)?;

        let mut candidates = Vec::new();
        for stage in self
            .stages()
            .iter()
            .filter(|stage| stage.order_index() < target.order_index())
        {
            push_candidates(&mut candidates, stage, usize::MAX, options);
        }
        push_candidates(&mut candidates, target, value_order_index, options);

        Ok(candidates)
    }

    /// Builds the current label of an address, or `None` if the target is gone.
    pub fn render_label(&self, address: &ReferenceAddress) -> Option<String> {
        let stage = self.stage(address.stage_id).ok()?;
        let value = stage.value(address.value_id)?;
        match &address.field_name {
            None => Some(value_label(stage, value.name())),
            Some(field_name) => {
                let field = value.field(field_name)?;
                Some(format!("{}.{}", value_label(stage, value.name()), field.name))
            }
        }
    }

    /// Resolves a label typed at a position into the address it denotes.
    pub fn resolve_label(
        &self,
        stage_id: StageId,
        value_order_index: usize,
        text: &str,
    ) -> Result<ReferenceAddress> {
        let candidates = self.available_references(
            stage_id,
            value_order_index,
            ResolveOptions { expand_fields: true },
        )?;
        parse_label(text, &candidates)
            .map(|candidate| candidate.address.clone())
            .ok_or_else(|| {
                Error::invalid_reference()
                    .with_message(format!("'{}' is not available at this position", text.trim()))
            })
    }

    /// Returns true if `address` is visible from the given position.
    pub fn is_available(
        &self,
        stage_id: StageId,
        value_order_index: usize,
        address: &ReferenceAddress,
    ) -> Result<bool> {
        let candidates = self.available_references(
            stage_id,
            value_order_index,
            ResolveOptions { expand_fields: true },
        )?;
        Ok(candidates
            .iter()
            .any(|candidate| candidate.address == *address))
    }

    /// Scans prompt text bound to a value for `@` mentions.
    pub fn scan_prompt(
        &self,
        stage_id: StageId,
        value_id: ValueId,
        text: &str,
    ) -> Result<Vec<Mention>> {
        let value = self.value(stage_id, value_id)?;
        let candidates = self.available_references(
            stage_id,
            value.order_index(),
            ResolveOptions { expand_fields: true },
        )?;
        Ok(scan_mentions(text, &candidates))
    }
}

/// Finds the candidate a label denotes.
///
/// A leading `@` is ignored. When several candidates share a label the one
/// closest to the asking position, i.e. the last one, wins.
pub fn parse_label<'a>(
    text: &str,
    candidates: &'a [ReferenceCandidate],
) -> Option<&'a ReferenceCandidate> {
    let text = text.trim();
    let text = text.strip_prefix('@').unwrap_or(text);
    candidates
        .iter()
        .rev()
        .find(|candidate| candidate.label == text)
}

fn value_label(stage: &Stage, value_name: &str) -> String {
    format!("{}.{}", stage.name(), value_name)
}

fn push_candidates(
    candidates: &mut Vec<ReferenceCandidate>,
    stage: &Stage,
    value_limit: usize,
    options: ResolveOptions,
) {
    if !stage.kind().holds_values() {
        return;
    }
    let expand = options.expand_fields && stage.kind() == StageKind::Page;

    for value in stage
        .values()
        .iter()
        .filter(|value| value.order_index() < value_limit)
    {
        let label = value_label(stage, value.name());
        candidates.push(ReferenceCandidate {
            address: ReferenceAddress::value(stage.id(), value.id()),
            label: label.clone(),
            data_type: value.data_type(),
            stage_index: stage.order_index(),
            value_index: value.order_index(),
        });
        if !expand {
            continue;
        }
        candidates.extend(value.fields().iter().map(|field| ReferenceCandidate {
            address: ReferenceAddress::field(stage.id(), value.id(), &field.name),
            label: format!("{label}.{}", field.name),
            data_type: field.data_type,
            stage_index: stage.order_index(),
            value_index: value.order_index(),
        }));
    }
}
