//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use sieve_workflow::prelude::*;
//! ```

pub use sieve_core::{Direction, DocumentId, StageId, ToolId, ValueId, WorkflowId};

pub use crate::binding::{
    Binding, BindingIssue, BindingKind, ColumnFilter, DocumentSource, FilterChain, FilterOperator,
    Fuzziness, LookupConfig, ReferenceList, classify,
};
pub use crate::definition::{
    BoardConfig, BoardPatch, DataType, Field, FieldPatch, Stage, StageKind, StagePatch,
    StatusColumn, Value, ValuePatch, WorkflowDefinition, WorkflowMetadata,
};
pub use crate::reference::{Mention, ReferenceAddress, ReferenceCandidate, ResolveOptions};
pub use crate::store::{FileWorkflowStore, MemoryWorkflowStore, WorkflowStore};
pub use crate::tool::{ParamDescriptor, ToolCatalog, ToolDescriptor, ToolKind};
pub use crate::view::{EntityKey, ViewState};
pub use crate::{Error, ErrorKind, Result};
