// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace document manager.
//!
//! Owns the local view of the shared document; the remote store is the
//! source of truth. Every update is read-merge-prune-write against the
//! remote, with bounded backoff-and-jitter retries absorbing optimistic
//! concurrency conflicts. Size overruns warn and never block.

use lw_core::document::EVENT_PROGRESS;
use lw_core::{
    iso_ms, BrokerConfig, Clock, DocArtifact, DocEvent, TaskId, WorkspaceDoc, WorkspacePatch,
};
use lw_adapters::docstore::{DocumentStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Base delay for conflict retries; doubled per attempt, plus jitter.
const RETRY_BASE: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("workspace create failed: {0}")]
    Create(StoreError),
    #[error("workspace update failed after {attempts} attempts: {source}")]
    Update {
        attempts: u32,
        source: StoreError,
    },
    #[error("workspace not found: {0}")]
    NotFound(String),
    #[error("workspace document is malformed: {0}")]
    Malformed(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct WorkspaceManager<C: Clock> {
    store: Arc<dyn DocumentStore>,
    max_events: usize,
    block_limit: usize,
    retries: u32,
    clock: C,
}

impl<C: Clock> WorkspaceManager<C> {
    pub fn new(store: Arc<dyn DocumentStore>, config: &BrokerConfig, clock: C) -> Self {
        Self {
            store,
            max_events: config.workspace_max_events,
            block_limit: config.workspace_block_limit,
            retries: config.update_retries,
            clock,
        }
    }

    fn now_iso(&self) -> String {
        iso_ms(self.clock.epoch_ms())
    }

    /// Block label that encodes the task id, for `find_by_task` scans.
    fn label_for(task_id: &TaskId) -> String {
        format!("task_{task_id}")
    }

    /// Build the initial document, persist it, and attach it to the caller.
    ///
    /// Failures propagate — the task cannot proceed without a document.
    pub async fn create(
        &self,
        task_id: TaskId,
        caller_id: &str,
        metadata: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<(String, WorkspaceDoc), WorkspaceError> {
        let doc = WorkspaceDoc::new(task_id, caller_id, self.now_iso(), metadata);
        let value = serde_json::to_string(&doc)
            .map_err(|e| WorkspaceError::Malformed(e.to_string()))?;
        let workspace_id = self
            .store
            .create_block(
                &Self::label_for(&task_id),
                &value,
                &WorkspaceDoc::block_description(self.block_limit),
                self.block_limit,
            )
            .await
            .map_err(WorkspaceError::Create)?;
        self.store
            .attach_block(caller_id, &workspace_id)
            .await
            .map_err(WorkspaceError::Create)?;
        tracing::info!(%task_id, %workspace_id, "workspace created");
        Ok((workspace_id, doc))
    }

    /// Read-merge-prune-write with conflict retries.
    pub async fn update(
        &self,
        caller_id: &str,
        workspace_id: &str,
        patch: WorkspacePatch,
    ) -> Result<WorkspaceDoc, WorkspaceError> {
        let mut attempt: u32 = 0;
        loop {
            let mut doc = self.get(caller_id, workspace_id).await?;
            doc.apply(patch.clone(), self.now_iso());
            let pruned = doc.prune_events(self.max_events);
            if pruned > 0 {
                tracing::debug!(%workspace_id, pruned, "workspace events pruned");
            }
            let value = serde_json::to_string(&doc)
                .map_err(|e| WorkspaceError::Malformed(e.to_string()))?;
            if value.len() > self.block_limit {
                tracing::warn!(
                    %workspace_id,
                    size = value.len(),
                    limit = self.block_limit,
                    "workspace document exceeds the soft size limit"
                );
            }
            match self.store.write_block(caller_id, workspace_id, &value).await {
                Ok(()) => return Ok(doc),
                Err(StoreError::Conflict) if attempt < self.retries => {
                    attempt += 1;
                    let delay = RETRY_BASE * 2u32.saturating_pow(attempt - 1) + jitter();
                    tracing::debug!(%workspace_id, attempt, ?delay, "workspace write conflict, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(source) => {
                    return Err(WorkspaceError::Update { attempts: attempt + 1, source })
                }
            }
        }
    }

    /// Append one event to the document's log.
    pub async fn append_event(
        &self,
        caller_id: &str,
        workspace_id: &str,
        event: DocEvent,
    ) -> Result<WorkspaceDoc, WorkspaceError> {
        self.update(caller_id, workspace_id, WorkspacePatch::event(event)).await
    }

    /// Record an artifact (typically the final output).
    pub async fn record_artifact(
        &self,
        caller_id: &str,
        workspace_id: &str,
        artifact: DocArtifact,
    ) -> Result<WorkspaceDoc, WorkspaceError> {
        self.update(caller_id, workspace_id, WorkspacePatch::artifact(artifact)).await
    }

    /// Fetch and deserialize the document.
    pub async fn get(
        &self,
        caller_id: &str,
        workspace_id: &str,
    ) -> Result<WorkspaceDoc, WorkspaceError> {
        let value = match self.store.read_block(caller_id, workspace_id).await {
            Ok(value) => value,
            Err(StoreError::NotFound(_)) => {
                return Err(WorkspaceError::NotFound(workspace_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&value).map_err(|e| WorkspaceError::Malformed(e.to_string()))
    }

    /// Scan the caller's documents for one embedding `task_id` (recovery path).
    pub async fn find_by_task(
        &self,
        caller_id: &str,
        task_id: &TaskId,
    ) -> Result<Option<(String, WorkspaceDoc)>, WorkspaceError> {
        let blocks = self.store.list_blocks(caller_id).await?;
        for block in blocks {
            if !block.label.starts_with("task_") {
                continue;
            }
            let Ok(doc) = self.get(caller_id, &block.id).await else {
                continue;
            };
            if doc.task_id == *task_id {
                return Ok(Some((block.id, doc)));
            }
        }
        Ok(None)
    }

    /// Dissociate the document from the caller; content remains at the store.
    /// Failures are logged only.
    pub async fn detach(&self, caller_id: &str, workspace_id: &str) {
        if let Err(e) = self.store.detach_block(caller_id, workspace_id).await {
            tracing::warn!(%workspace_id, error = %e, "workspace detach failed");
        }
    }

    /// Convenience: a progress event stamped with the manager's clock.
    pub fn progress_event(&self, message: impl Into<String>) -> DocEvent {
        DocEvent::new(EVENT_PROGRESS, message, self.now_iso())
    }

    /// Convenience: an event of the given kind stamped with the manager's clock.
    pub fn event(&self, kind: impl Into<String>, message: impl Into<String>) -> DocEvent {
        DocEvent::new(kind, message, self.now_iso())
    }

    /// Convenience: an artifact stamped with the manager's clock.
    pub fn artifact(
        &self,
        kind: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> DocArtifact {
        DocArtifact {
            timestamp: self.now_iso(),
            kind: kind.into(),
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Small random delay so colliding retries spread out. Derived from a
/// nanoid so the crate set stays closed.
fn jitter() -> Duration {
    let seed: u64 = nanoid::nanoid!(4).bytes().map(u64::from).sum();
    Duration::from_millis(seed % 50)
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
