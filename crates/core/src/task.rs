// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identity and state machine.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a delegated task.
    ///
    /// Minted by the broker at submission time; callers treat it as opaque
    /// and use it to poll status, fetch history, and send control signals.
    pub struct TaskId("tsk-");
}

/// Lifecycle status of a task.
///
/// ```text
///     admit          execute start         execute end
/// queued ─────► running ───────► { completed | failed | timeout }
///    │            │   ▲
///    │            ▼   │ resume
///    │          paused
///    │            │
///    └──cancel───┴─── cancel ──► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Admitted, execution not yet started
    Queued,
    /// Runner is executing
    Running,
    /// Runner suspended by a control signal
    Paused,
    /// Runner finished successfully
    Completed,
    /// Runner finished with an error
    Failed,
    /// Execution deadline elapsed
    Timeout,
    /// Cancelled by a control signal
    Cancelled,
}

impl TaskStatus {
    /// Check if this status is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Timeout | TaskStatus::Cancelled
        )
    }

    /// Check if this status counts against the concurrency cap.
    ///
    /// Paused tasks release their slot; only queued and running hold one.
    pub fn holds_slot(&self) -> bool {
        matches!(self, TaskStatus::Queued | TaskStatus::Running)
    }

    /// Check whether `self → to` is a legal state machine transition.
    pub fn can_transition(self, to: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, to) {
            (Queued, Running) | (Queued, Cancelled) | (Queued, Failed) => true,
            (Running, Paused)
            | (Running, Completed)
            | (Running, Failed)
            | (Running, Timeout)
            | (Running, Cancelled) => true,
            (Paused, Running) | (Paused, Cancelled) => true,
            _ => false,
        }
    }
}

crate::simple_display! {
    TaskStatus {
        Queued => "queued",
        Running => "running",
        Paused => "paused",
        Completed => "completed",
        Failed => "failed",
        Timeout => "timeout",
        Cancelled => "cancelled",
    }
}

/// A delegated task as tracked by the registry.
///
/// Fields are mutated only through registry operations; no other component
/// holds a long-lived reference. `started_at_ms` is written on the first
/// transition to running, `completed_at_ms` on the first terminal
/// transition, and neither is ever rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Opaque id of the commissioning caller
    pub caller_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub status: TaskStatus,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    /// Workspace block id at the document store (set once on create)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    /// Chat-room handle, when rooms are enabled (set once)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

impl Task {
    /// Create a freshly admitted task.
    pub fn new(
        id: TaskId,
        caller_id: impl Into<String>,
        idempotency_key: Option<String>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            caller_id: caller_id.into(),
            idempotency_key,
            status: TaskStatus::Queued,
            created_at_ms,
            started_at_ms: None,
            completed_at_ms: None,
            workspace_id: None,
            room: None,
        }
    }

    /// Check if the task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            caller_id: String = "caller-1",
        }
        set {
            id: TaskId = TaskId::new(),
            status: TaskStatus = TaskStatus::Queued,
            created_at_ms: u64 = 1_000_000,
        }
        option {
            idempotency_key: String = None,
            started_at_ms: u64 = None,
            completed_at_ms: u64 = None,
            workspace_id: String = None,
            room: String = None,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
