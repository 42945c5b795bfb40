//! Editor presentation state.
//!
//! Which entities are expanded and which one is being edited is kept here,
//! keyed by entity id, so the workflow model itself stays free of UI flags.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sieve_core::{StageId, ValueId};

use crate::definition::WorkflowDefinition;

/// Key of an entity shown in the editor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum EntityKey {
    /// A stage.
    Stage { stage_id: StageId },
    /// A value.
    Value { value_id: ValueId },
    /// A field, addressed through its value.
    Field { value_id: ValueId, field_name: String },
}

impl EntityKey {
    fn exists_in(&self, workflow: &WorkflowDefinition) -> bool {
        match self {
            Self::Stage { stage_id } => workflow.stage(*stage_id).is_ok(),
            Self::Value { value_id } => workflow.stage_of_value(*value_id).is_some(),
            Self::Field {
                value_id,
                field_name,
            } => workflow
                .stage_of_value(*value_id)
                .and_then(|stage| stage.value(*value_id))
                .is_some_and(|value| value.field(field_name).is_some()),
        }
    }
}

/// Expanded and editing state of the editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    expanded: HashSet<EntityKey>,
    editing: Option<EntityKey>,
}

impl ViewState {
    /// Creates a state with everything collapsed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the expanded state of an entity and returns the new state.
    pub fn toggle_expanded(&mut self, key: EntityKey) -> bool {
        if self.expanded.remove(&key) {
            false
        } else {
            self.expanded.insert(key);
            true
        }
    }

    /// Returns true if the entity is expanded.
    pub fn is_expanded(&self, key: &EntityKey) -> bool {
        self.expanded.contains(key)
    }

    /// Marks an entity as being edited, replacing any previous one.
    pub fn set_editing(&mut self, key: EntityKey) {
        self.editing = Some(key);
    }

    /// Returns the entity being edited.
    pub fn editing(&self) -> Option<&EntityKey> {
        self.editing.as_ref()
    }

    /// Stops editing.
    pub fn clear_editing(&mut self) -> Option<EntityKey> {
        self.editing.take()
    }

    /// Forgets state of entities that no longer exist.
    pub fn prune(&mut self, workflow: &WorkflowDefinition) {
        self.expanded.retain(|key| key.exists_in(workflow));
        if self
            .editing
            .as_ref()
            .is_some_and(|key| !key.exists_in(workflow))
        {
            self.editing = None;
        }
    }
}
