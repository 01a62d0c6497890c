// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution request and result types shared by both backends.

use crate::task::TaskId;
use serde::{Deserialize, Serialize};

/// What to run. Immutable once handed to the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub task_id: TaskId,
    pub caller_id: String,
    pub prompt: String,
    /// Per-task override of the configured execution deadline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    pub workspace_id: String,
}

impl ExecutionRequest {
    pub fn new(task_id: TaskId, caller_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            task_id,
            caller_id: caller_id.into(),
            prompt: prompt.into(),
            timeout_ms: None,
            workspace_id: String::new(),
        }
    }

    crate::setters! {
        into {
            workspace_id: String,
        }
        option {
            timeout_ms: u64,
        }
    }
}

/// Terminal status of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecStatus {
    Success,
    Error,
    Timeout,
}

crate::simple_display! {
    ExecStatus {
        Success => "success",
        Error => "error",
        Timeout => "timeout",
    }
}

/// Outcome of one execution, produced exactly once per task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Aggregated runner output (trailing window, never the full stream)
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at_ms: u64,
    pub completed_at_ms: u64,
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Build a result spanning `started_at_ms..completed_at_ms`.
    pub fn new(status: ExecStatus, started_at_ms: u64, completed_at_ms: u64) -> Self {
        Self {
            status,
            exit_code: None,
            output: String::new(),
            error: None,
            started_at_ms,
            completed_at_ms,
            duration_ms: completed_at_ms.saturating_sub(started_at_ms),
        }
    }

    crate::setters! {
        into {
            output: String,
        }
        option {
            exit_code: i32,
            error: String,
        }
    }
}
