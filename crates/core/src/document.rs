// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace document schema and merge/prune rules.
//!
//! The document is a single JSON value stored as a labeled block at the
//! remote document store and attached to the commissioning caller. The
//! manager in lw-engine owns the read-merge-write cycle; this module holds
//! the pure data rules so they can be tested without a store.

use crate::task::{TaskId, TaskStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema version embedded in every document.
pub const DOC_VERSION: &str = "1.0.0";

/// Workspace event-log entry type used for progress and prune notices.
pub const EVENT_PROGRESS: &str = "task_progress";

/// One entry in the document's event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocEvent {
    /// ISO-8601 UTC timestamp
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl DocEvent {
    pub fn new(kind: impl Into<String>, message: impl Into<String>, timestamp: String) -> Self {
        Self { timestamp, kind: kind.into(), message: message.into(), data: None }
    }

    crate::setters! {
        option {
            data: Value,
        }
    }
}

/// One entry in the document's artifact list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocArtifact {
    /// ISO-8601 UTC timestamp
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub content: String,
}

/// The shared workspace document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDoc {
    pub version: String,
    pub task_id: TaskId,
    pub caller_id: String,
    pub status: TaskStatus,
    pub created_at: String,
    pub updated_at: String,
    pub events: Vec<DocEvent>,
    pub artifacts: Vec<DocArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, Value>>,
}

/// A pending change to a workspace document.
///
/// Applied remote-side-in: the manager reads the current document, merges
/// the patch, prunes, and writes back.
#[derive(Debug, Clone, Default)]
pub struct WorkspacePatch {
    pub status: Option<TaskStatus>,
    pub events: Vec<DocEvent>,
    pub artifacts: Vec<DocArtifact>,
    pub metadata: Option<serde_json::Map<String, Value>>,
}

impl WorkspacePatch {
    pub fn status(status: TaskStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    pub fn event(event: DocEvent) -> Self {
        Self { events: vec![event], ..Self::default() }
    }

    pub fn artifact(artifact: DocArtifact) -> Self {
        Self { artifacts: vec![artifact], ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.events.is_empty()
            && self.artifacts.is_empty()
            && self.metadata.is_none()
    }
}

impl WorkspaceDoc {
    /// Build the initial document for a freshly admitted task.
    pub fn new(
        task_id: TaskId,
        caller_id: impl Into<String>,
        now_iso: String,
        metadata: Option<serde_json::Map<String, Value>>,
    ) -> Self {
        Self {
            version: DOC_VERSION.to_string(),
            task_id,
            caller_id: caller_id.into(),
            status: TaskStatus::Queued,
            created_at: now_iso.clone(),
            updated_at: now_iso,
            events: Vec::new(),
            artifacts: Vec::new(),
            metadata,
        }
    }

    /// Merge a patch into the document. `updated_at` is set on every write.
    ///
    /// Events and artifacts append in patch order; metadata keys merge
    /// shallowly with patch values winning.
    pub fn apply(&mut self, patch: WorkspacePatch, now_iso: String) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.events.extend(patch.events);
        self.artifacts.extend(patch.artifacts);
        if let Some(incoming) = patch.metadata {
            let metadata = self.metadata.get_or_insert_with(serde_json::Map::new);
            for (key, value) in incoming {
                metadata.insert(key, value);
            }
        }
        self.updated_at = now_iso;
    }

    /// Prune the event log down to `max_events`, keeping the newest entries.
    ///
    /// When entries are removed, one synthetic progress notice is prepended
    /// to the retained window so the caller can see the log was trimmed.
    /// Returns the number of entries removed.
    pub fn prune_events(&mut self, max_events: usize) -> usize {
        if self.events.len() <= max_events {
            return 0;
        }
        let removed = self.events.len() - max_events;
        self.events.drain(..removed);
        let notice_ts = self
            .events
            .first()
            .map(|e| e.timestamp.clone())
            .unwrap_or_else(|| self.updated_at.clone());
        self.events.insert(
            0,
            DocEvent::new(
                EVENT_PROGRESS,
                format!("[system: pruned {removed} older events to stay within the size limit]"),
                notice_ts,
            ),
        );
        removed
    }

    /// Serialized size in characters, for the soft block limit check.
    pub fn serialized_len(&self) -> usize {
        serde_json::to_string(self).map(|s| s.len()).unwrap_or(0)
    }

    /// Human-readable description persisted alongside the block so callers
    /// know how to read it.
    pub fn block_description(block_limit: usize) -> String {
        format!(
            "Live workspace for a delegated task. Read `status` for the current state \
             (queued, running, paused, completed, failed, timeout, cancelled — the last \
             four are final), `events` for the progress log (oldest entries are pruned \
             past the size limit), and `artifacts` for the final output. Contents are \
             kept under {block_limit} characters."
        )
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
