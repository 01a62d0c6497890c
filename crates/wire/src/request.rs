// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parameter shapes for the inbound tool surface.

use lw_core::ControlSignal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters for `execute_task`: commission a runner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteTaskParams {
    pub caller_id: String,
    /// The prompt handed to the runner
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Wait for completion up to the response deadline
    #[serde(default)]
    pub sync: bool,
    /// Operator handles invited into the chat room, when rooms are enabled
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observers: Vec<String>,
}

/// Parameters for `get_task_status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetTaskStatusParams {
    pub task_id: String,
}

/// Parameters for `get_task_history`: paginated event log, optionally with artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetTaskHistoryParams {
    pub task_id: String,
    #[serde(default)]
    pub include_artifacts: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_offset: Option<usize>,
}

/// Parameters for `send_task_message`: steer a running task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendTaskMessageParams {
    pub task_id: String,
    pub message: String,
    #[serde(default = "default_message_type")]
    pub message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

fn default_message_type() -> String {
    "guidance".to_string()
}

/// Parameters for `send_task_control`: cancel, pause, or resume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendTaskControlParams {
    pub task_id: String,
    pub control: ControlSignal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Parameters for `get_task_files` (remote backend only).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetTaskFilesParams {
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Parameters for `read_task_file` (remote backend only; files over 1 MB are rejected).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadTaskFileParams {
    pub task_id: String,
    pub file_path: String,
}

/// Parameters for `list_tasks`: enumerate known tasks, optionally for one caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListTasksParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_id: Option<String>,
}
