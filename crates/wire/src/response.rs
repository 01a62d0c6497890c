// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result shapes for the inbound tool surface.

use lw_core::{DocArtifact, DocEvent, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};

pub const CODE_QUEUE_FULL: &str = "QUEUE_FULL";
pub const CODE_TASK_NOT_FOUND: &str = "TASK_NOT_FOUND";

/// Domain failure carried inside a tool result (not a transport error).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainError {
    pub error: String,
    pub code: String,
    /// HTTP-flavored status hint for the caller (e.g. 429 for a full queue)
    pub status: u16,
}

impl DomainError {
    pub fn queue_full() -> Self {
        Self { error: "Task queue full".to_string(), code: CODE_QUEUE_FULL.to_string(), status: 429 }
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self {
            error: format!("Task not found: {task_id}"),
            code: CODE_TASK_NOT_FOUND.to_string(),
            status: 404,
        }
    }
}

/// `execute_task` result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskAccepted {
    pub task_id: TaskId,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Present when the response deadline fired before completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_hint: Option<String>,
}

/// `get_task_status` result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatusView {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    /// The newest events from the workspace log (at most five)
    pub recent_events: Vec<DocEvent>,
}

/// `get_task_history` result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskHistoryView {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub events: Vec<DocEvent>,
    pub events_total: usize,
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<DocArtifact>>,
    pub artifacts_total: usize,
}

/// `send_task_message` result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageAccepted {
    pub timestamp_ms: u64,
    /// False when the backend has no live input channel (local workers)
    pub accepted: bool,
}

/// `send_task_control` result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlResult {
    pub success: bool,
    pub previous_status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `get_task_files` result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileList {
    pub task_id: TaskId,
    pub files: Vec<String>,
}

/// `read_task_file` result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileContent {
    pub task_id: TaskId,
    pub file_path: String,
    pub content: String,
    pub size: usize,
}

/// `health` result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthView {
    pub status: String,
    pub uptime_ms: u64,
    pub active_tasks: usize,
    pub total_tasks: usize,
    pub backend: String,
}

/// One row of a `list_tasks` result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSummary {
    pub task_id: TaskId,
    pub caller_id: String,
    pub status: TaskStatus,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
}
