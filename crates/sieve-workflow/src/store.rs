//! Workflow persistence.
//!
//! Saving is always explicit; no model operation writes on its own. Stored
//! trees are plain serde JSON, and loading runs
//! [`WorkflowDefinition::normalize`] before handing the tree back.

use std::collections::HashMap;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sieve_core::{Error, Result, WorkflowId};
use tokio::sync::RwLock;

use crate::TRACING_TARGET_STORE;
use crate::definition::WorkflowDefinition;

/// Persistence collaborator for workflow definitions.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Stores a workflow, replacing any previous version.
    async fn save(&self, workflow_id: WorkflowId, workflow: &WorkflowDefinition) -> Result<()>;

    /// Loads a workflow, or `None` if nothing was saved under this id.
    async fn load(&self, workflow_id: WorkflowId) -> Result<Option<WorkflowDefinition>>;

    /// Returns true if a workflow was saved under this id.
    async fn exists(&self, workflow_id: WorkflowId) -> Result<bool> {
        Ok(self.load(workflow_id).await?.is_some())
    }
}

/// Store keeping serialized workflows in memory.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkflowStore {
    entries: Arc<RwLock<HashMap<WorkflowId, String>>>,
}

impl MemoryWorkflowStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored workflows.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn save(&self, workflow_id: WorkflowId, workflow: &WorkflowDefinition) -> Result<()> {
        let json = serde_json::to_string(workflow)?;
        self.entries.write().await.insert(workflow_id, json);

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            workflow_id = %workflow_id,
            stages = workflow.stages().len(),
            "workflow saved"
        );
        Ok(())
    }

    async fn load(&self, workflow_id: WorkflowId) -> Result<Option<WorkflowDefinition>> {
        let entries = self.entries.read().await;
        let Some(json) = entries.get(&workflow_id) else {
            return Ok(None);
        };
        decode(workflow_id, json).map(Some)
    }
}

/// Store writing one `<workflow_id>.json` file per workflow.
#[derive(Debug, Clone)]
pub struct FileWorkflowStore {
    root: PathBuf,
}

impl FileWorkflowStore {
    /// Creates a store rooted at `root`. The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the directory workflows are written to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file a workflow is stored in.
    pub fn path_of(&self, workflow_id: WorkflowId) -> PathBuf {
        self.root.join(format!("{workflow_id}.json"))
    }
}

#[async_trait]
impl WorkflowStore for FileWorkflowStore {
    async fn save(&self, workflow_id: WorkflowId, workflow: &WorkflowDefinition) -> Result<()> {
        let json = serde_json::to_vec_pretty(workflow)?;
        let path = self.path_of(workflow_id);
        let partial = path.with_extension("json.partial");

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|error| io_error("create store directory", &self.root, error))?;
        tokio::fs::write(&partial, &json)
            .await
            .map_err(|error| io_error("write", &partial, error))?;
        tokio::fs::rename(&partial, &path)
            .await
            .map_err(|error| io_error("replace", &path, error))?;

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            workflow_id = %workflow_id,
            path = %path.display(),
            bytes = json.len(),
            "workflow saved"
        );
        Ok(())
    }

    async fn load(&self, workflow_id: WorkflowId) -> Result<Option<WorkflowDefinition>> {
        let path = self.path_of(workflow_id);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(error) if error.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(io_error("read", &path, error)),
        };
        decode(workflow_id, &json).map(Some)
    }
}

fn decode(workflow_id: WorkflowId, json: &str) -> Result<WorkflowDefinition> {
    let mut workflow: WorkflowDefinition = serde_json::from_str(json)?;
    workflow.normalize();

    tracing::debug!(
        target: TRACING_TARGET_STORE,
        workflow_id = %workflow_id,
        stages = workflow.stages().len(),
        "workflow loaded"
    );
    Ok(workflow)
}

fn io_error(action: &str, path: &Path, error: std::io::Error) -> Error {
    Error::storage()
        .with_message(format!("failed to {action} {}", path.display()))
        .with_source(error)
}
