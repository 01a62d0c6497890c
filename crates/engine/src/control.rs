// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-signal handler.
//!
//! Validates the cancel/pause/resume transition table, drives the adapter,
//! and commits the new status. The workspace event and room mirror that
//! follow a successful transition are best-effort — their failures never
//! flip the outcome.

use crate::registry::{StatusMeta, TaskRegistry};
use crate::workspace::WorkspaceManager;
use lw_adapters::exec::ExecutionAdapter;
use lw_adapters::room::RoomBackend;
use lw_core::{Clock, ControlOutcome, ControlRequest, ControlSignal, Task};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("task not found: {0}")]
    UnknownTask(String),
}

pub struct ControlHandler<C: Clock> {
    registry: Arc<TaskRegistry<C>>,
    adapter: Arc<dyn ExecutionAdapter>,
    workspaces: Arc<WorkspaceManager<C>>,
    rooms: Option<Arc<dyn RoomBackend>>,
}

impl<C: Clock> ControlHandler<C> {
    pub fn new(
        registry: Arc<TaskRegistry<C>>,
        adapter: Arc<dyn ExecutionAdapter>,
        workspaces: Arc<WorkspaceManager<C>>,
        rooms: Option<Arc<dyn RoomBackend>>,
    ) -> Self {
        Self { registry, adapter, workspaces, rooms }
    }

    /// Apply a control signal to a task.
    pub async fn handle(&self, request: ControlRequest) -> Result<ControlOutcome, ControlError> {
        let task = self
            .registry
            .get(&request.task_id)
            .ok_or_else(|| ControlError::UnknownTask(request.task_id.to_string()))?;
        let signal = request.signal;
        let previous = task.status;

        if !signal.valid_from(previous) {
            return Ok(ControlOutcome::rejected(
                previous,
                format!("Cannot {signal} task with status: {previous}"),
            ));
        }

        let adapter_ok = match signal {
            ControlSignal::Cancel => self.adapter.abort(&request.task_id).await,
            ControlSignal::Pause => self.adapter.pause(&request.task_id).await,
            ControlSignal::Resume => self.adapter.resume(&request.task_id).await,
        };
        if !adapter_ok {
            // A task the backend no longer tracks (queued, or already wound
            // down) still gets its state change; a live refusal does not.
            if self.adapter.is_active(&request.task_id).await {
                return Ok(ControlOutcome::rejected(
                    previous,
                    format!("Backend rejected {signal} for task {}", request.task_id),
                ));
            }
            tracing::debug!(
                task_id = %request.task_id,
                %signal,
                "backend no longer tracks task, committing state change"
            );
        }

        let target = signal.target_status();
        if !self.registry.update_status(&request.task_id, target, StatusMeta::default()) {
            let now = self.registry.get(&request.task_id).map(|t| t.status).unwrap_or(previous);
            return Ok(ControlOutcome::rejected(
                now,
                format!("Cannot {signal} task with status: {now}"),
            ));
        }
        tracing::info!(task_id = %request.task_id, %signal, from = %previous, to = %target, "control applied");

        self.record_side_effects(&task, &request).await;
        Ok(ControlOutcome::applied(previous, target))
    }

    /// Workspace event and room mirror; failures are logged only.
    async fn record_side_effects(&self, task: &Task, request: &ControlRequest) {
        if let Some(workspace_id) = &task.workspace_id {
            let message = match &request.reason {
                Some(reason) => {
                    format!("{} requested by {} ({reason})", request.signal, request.requested_by)
                }
                None => format!("{} requested by {}", request.signal, request.requested_by),
            };
            let event = self
                .workspaces
                .event(request.signal.event_kind(), message)
                .data(json!({
                    "requested_by": request.requested_by.clone(),
                    "reason": request.reason.clone(),
                }));
            if let Err(e) = self.workspaces.append_event(&task.caller_id, workspace_id, event).await
            {
                tracing::warn!(task_id = %task.id, error = %e, "control event append failed");
            }
        }

        if let (Some(rooms), Some(room)) = (&self.rooms, &task.room) {
            if let Err(e) = rooms
                .send_control(room, &task.id, &request.signal.to_string(), request.reason.as_deref())
                .await
            {
                tracing::warn!(task_id = %task.id, error = %e, "control room mirror failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
