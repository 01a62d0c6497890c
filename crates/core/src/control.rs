// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control signals: cancel, pause, resume.

use crate::task::{TaskId, TaskStatus};
use serde::{Deserialize, Serialize};

/// Mid-flight steering signal for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlSignal {
    Cancel,
    Pause,
    Resume,
}

impl ControlSignal {
    /// Target status when the signal is applied.
    pub fn target_status(&self) -> TaskStatus {
        match self {
            ControlSignal::Cancel => TaskStatus::Cancelled,
            ControlSignal::Pause => TaskStatus::Paused,
            ControlSignal::Resume => TaskStatus::Running,
        }
    }

    /// Statuses from which this signal is a legal transition.
    pub fn valid_from(&self, status: TaskStatus) -> bool {
        match self {
            ControlSignal::Cancel => matches!(
                status,
                TaskStatus::Queued | TaskStatus::Running | TaskStatus::Paused
            ),
            ControlSignal::Pause => status == TaskStatus::Running,
            ControlSignal::Resume => status == TaskStatus::Paused,
        }
    }

    /// Workspace event-log entry type recorded when the signal lands.
    pub fn event_kind(&self) -> &'static str {
        match self {
            ControlSignal::Cancel => "task_cancelled",
            ControlSignal::Pause => "task_paused",
            ControlSignal::Resume => "task_resumed",
        }
    }
}

crate::simple_display! {
    ControlSignal {
        Cancel => "cancel",
        Pause => "pause",
        Resume => "resume",
    }
}

impl std::str::FromStr for ControlSignal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cancel" => Ok(ControlSignal::Cancel),
            "pause" => Ok(ControlSignal::Pause),
            "resume" => Ok(ControlSignal::Resume),
            other => Err(format!("unknown control signal: {other}")),
        }
    }
}

/// A control request as received from the tool surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRequest {
    pub task_id: TaskId,
    pub signal: ControlSignal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub requested_by: String,
}

/// What happened to a control request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlOutcome {
    pub success: bool,
    pub previous_status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlOutcome {
    pub fn applied(previous: TaskStatus, new: TaskStatus) -> Self {
        Self { success: true, previous_status: previous, new_status: Some(new), error: None }
    }

    pub fn rejected(previous: TaskStatus, error: impl Into<String>) -> Self {
        Self { success: false, previous_status: previous, new_status: None, error: Some(error.into()) }
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
