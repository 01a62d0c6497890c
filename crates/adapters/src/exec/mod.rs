// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution backends.
//!
//! Two interchangeable engines run a prompt to completion: a sandboxed
//! worker process spawned per task ([`local::LocalProcessAdapter`]) and a
//! session at a remote worker server ([`remote::RemoteSessionAdapter`]).
//! Both emit normalized [`TaskEvent`]s on a per-task channel and guarantee
//! that `execute` does not return before a terminal event has been sent or
//! the execution deadline elapsed.

pub mod local;
pub mod normalize;
pub mod remote;

pub use local::LocalProcessAdapter;
pub use remote::RemoteSessionAdapter;

use async_trait::async_trait;
use lw_core::{ExecutionRequest, ExecutionResult, TaskEvent, TaskId};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from execution adapter operations
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("session error: {0}")]
    SessionError(String),
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),
}

/// Adapter for running tasks on one of the execution backends.
///
/// `events` receives normalized events in arrival order; the sender is
/// dropped when `execute` returns, closing the consumer side.
#[async_trait]
pub trait ExecutionAdapter: Send + Sync + 'static {
    /// Run a prompt to completion. Blocks until a terminal event has been
    /// emitted or the per-task deadline elapsed.
    async fn execute(
        &self,
        request: ExecutionRequest,
        events: mpsc::Sender<TaskEvent>,
    ) -> Result<ExecutionResult, ExecError>;

    /// Abort a running task. Returns `false` when the task is not tracked.
    async fn abort(&self, task_id: &TaskId) -> bool;

    /// Suspend a running worker. Local backend only; others return `false`.
    async fn pause(&self, _task_id: &TaskId) -> bool {
        false
    }

    /// Continue a suspended worker. Local backend only; others return `false`.
    async fn resume(&self, _task_id: &TaskId) -> bool {
        false
    }

    /// Check if the backend still tracks a live session/worker for the task.
    async fn is_active(&self, task_id: &TaskId) -> bool;

    /// Deliver steering input to the running session. Remote backend only.
    async fn send_input(&self, _task_id: &TaskId, _message: &str) -> Result<(), ExecError> {
        Err(ExecError::Unsupported("send_input"))
    }

    /// List files in the task's session. Remote backend only, while alive.
    async fn list_files(&self, _task_id: &TaskId, _path: Option<&str>) -> Result<Vec<String>, ExecError> {
        Err(ExecError::Unsupported("list_files"))
    }

    /// Read one file from the task's session. Remote backend only, while alive.
    async fn read_file(&self, _task_id: &TaskId, _path: &str) -> Result<String, ExecError> {
        Err(ExecError::Unsupported("read_file"))
    }
}
