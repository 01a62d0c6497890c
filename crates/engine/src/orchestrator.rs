// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task orchestrator.
//!
//! Drives one task end to end: admit → workspace → (room) → execute →
//! mirror events → finalize → notify. The execution loop, the event
//! mirror, and the sync-mode response timer are separate cooperating
//! tasks connected by channels; the timer only shapes the tool response
//! and never cancels the background body.

use crate::registry::{Registration, RegistryError, StatusMeta, TaskRegistry};
use crate::workspace::WorkspaceManager;
use lw_adapters::docstore::DocumentStore;
use lw_adapters::exec::{ExecError, ExecutionAdapter};
use lw_adapters::room::RoomBackend;
use lw_core::document::EVENT_PROGRESS;
use lw_core::{
    iso_ms, short, BrokerConfig, Clock, DocEvent, ExecStatus, ExecutionRequest, ExecutionResult,
    TaskEvent, TaskId, TaskStatus, WorkspacePatch,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Output preview bound for the caller notification.
const NOTIFY_PREVIEW_CHARS: usize = 1024;

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Admission cap reached; surfaces as the structured QUEUE_FULL result
    #[error("task queue full")]
    QueueFull,
    /// The workspace document could not be created; the task cannot proceed
    #[error(transparent)]
    Workspace(#[from] crate::workspace::WorkspaceError),
}

/// A task submission from the tool surface.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub caller_id: String,
    pub description: String,
    pub idempotency_key: Option<String>,
    pub timeout_ms: Option<u64>,
    pub sync: bool,
    pub observers: Vec<String>,
}

impl SubmitRequest {
    pub fn new(caller_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            caller_id: caller_id.into(),
            description: description.into(),
            idempotency_key: None,
            timeout_ms: None,
            sync: false,
            observers: Vec::new(),
        }
    }

    lw_core::setters! {
        set {
            sync: bool,
            observers: Vec<String>,
        }
        option {
            idempotency_key: String,
            timeout_ms: u64,
        }
    }
}

/// What the tool call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResult {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub workspace_id: Option<String>,
    pub message: Option<String>,
    /// Present when the sync-mode response deadline fired first
    pub timeout_hint: Option<String>,
}

/// Cheap to clone: every collaborator is behind an `Arc`, and the spawned
/// background body owns its own clone.
#[derive(Clone)]
pub struct Orchestrator<C: Clock> {
    registry: Arc<TaskRegistry<C>>,
    workspaces: Arc<WorkspaceManager<C>>,
    adapter: Arc<dyn ExecutionAdapter>,
    store: Arc<dyn DocumentStore>,
    rooms: Option<Arc<dyn RoomBackend>>,
    config: BrokerConfig,
    clock: C,
}

impl<C: Clock> Orchestrator<C> {
    pub fn new(
        registry: Arc<TaskRegistry<C>>,
        workspaces: Arc<WorkspaceManager<C>>,
        adapter: Arc<dyn ExecutionAdapter>,
        store: Arc<dyn DocumentStore>,
        rooms: Option<Arc<dyn RoomBackend>>,
        config: BrokerConfig,
        clock: C,
    ) -> Self {
        Self { registry, workspaces, adapter, store, rooms, config, clock }
    }

    /// Submit a task. For `sync == false` this returns as soon as the task
    /// is admitted and its workspace exists; the body continues in the
    /// background. For `sync == true` the response races the body against
    /// the response deadline.
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitResult, SubmitError> {
        let task_id = TaskId::new();
        let registration = self
            .registry
            .register(task_id, &request.caller_id, request.idempotency_key.clone())
            .map_err(|RegistryError::QueueFull| SubmitError::QueueFull)?;

        if let Registration::Existing(task) = registration {
            // Same (caller, key) within the window: no second workspace,
            // no second execution.
            return Ok(SubmitResult {
                task_id: task.id,
                status: task.status,
                workspace_id: task.workspace_id,
                message: Some("duplicate submission; returning the original task".to_string()),
                timeout_hint: None,
            });
        }

        let (workspace_id, _doc) =
            match self.workspaces.create(task_id, &request.caller_id, None).await {
                Ok(created) => created,
                Err(e) => {
                    // The task cannot proceed without its document
                    self.registry.update_status(&task_id, TaskStatus::Failed, StatusMeta::default());
                    return Err(e.into());
                }
            };
        self.registry.set_workspace(&task_id, &workspace_id);

        let (done_tx, done_rx) = oneshot::channel();
        let body = RunParams {
            task_id,
            caller_id: request.caller_id.clone(),
            prompt: request.description.clone(),
            timeout_ms: request.timeout_ms,
            observers: request.observers.clone(),
            workspace_id: workspace_id.clone(),
        };
        tokio::spawn(self.clone().run_task(body, done_tx));

        if !request.sync {
            return Ok(SubmitResult {
                task_id,
                status: TaskStatus::Queued,
                workspace_id: Some(workspace_id),
                message: None,
                timeout_hint: None,
            });
        }

        // Response-deadline splitter: whichever resolves first shapes the
        // tool response. A timer win drops `done_rx`; the body never sees a
        // cancellation from this race.
        tokio::select! {
            done = done_rx => {
                let status = done.unwrap_or(TaskStatus::Failed);
                Ok(SubmitResult {
                    task_id,
                    status,
                    workspace_id: Some(workspace_id),
                    message: Some(format!("task finished with status: {status}")),
                    timeout_hint: None,
                })
            }
            _ = tokio::time::sleep(self.config.response_deadline) => {
                Ok(SubmitResult {
                    task_id,
                    status: TaskStatus::Running,
                    workspace_id: Some(workspace_id),
                    message: None,
                    timeout_hint: Some("task continues in background".to_string()),
                })
            }
        }
    }

    /// The background body: steps 6–14 of the lifecycle.
    async fn run_task(self, params: RunParams, done_tx: oneshot::Sender<TaskStatus>) {
        let task_id = params.task_id;
        let (final_status, result) = if self.registry.update_status(
            &task_id,
            TaskStatus::Running,
            StatusMeta::default(),
        ) {
            self.execute_task(&params).await
        } else {
            // Cancelled while still queued: skip execution entirely
            let status = self
                .registry
                .get(&task_id)
                .map(|t| t.status)
                .unwrap_or(TaskStatus::Cancelled);
            tracing::info!(%task_id, %status, "task left the queue before execution");
            (status, None)
        };

        self.finalize(&params, final_status, result).await;
        let _ = done_tx.send(final_status);
    }

    /// Room setup, execution, event mirroring, terminal registry write.
    async fn execute_task(
        &self,
        params: &RunParams,
    ) -> (TaskStatus, Option<ExecutionResult>) {
        let task_id = params.task_id;

        let room = self.create_room(params).await;
        if let Some(room) = &room {
            self.registry.attach_room(&task_id, room);
        }

        let started = self
            .workspaces
            .update(
                &params.caller_id,
                &params.workspace_id,
                WorkspacePatch {
                    status: Some(TaskStatus::Running),
                    events: vec![self.workspaces.event("task_started", "task execution started")],
                    ..WorkspacePatch::default()
                },
            )
            .await;
        if let Err(e) = started {
            tracing::warn!(%task_id, error = %e, "task_started workspace update failed");
        }

        let (events_tx, events_rx) = mpsc::channel(64);
        let mirror = tokio::spawn(mirror_events(
            Arc::clone(&self.workspaces),
            self.rooms.clone(),
            params.caller_id.clone(),
            params.workspace_id.clone(),
            room.clone(),
            events_rx,
        ));

        let exec_request = ExecutionRequest::new(task_id, &params.caller_id, &params.prompt)
            .workspace_id(&params.workspace_id)
            .timeout_ms(
                params
                    .timeout_ms
                    .unwrap_or(self.config.execution_timeout.as_millis() as u64),
            );
        let outcome = self.adapter.execute(exec_request, events_tx).await;
        // The sender went into execute and is gone; the mirror drains the
        // channel to closure before finalization touches the workspace.
        if let Err(e) = mirror.await {
            tracing::warn!(%task_id, error = %e, "event mirror task failed");
        }

        let (mapped, result) = match outcome {
            Ok(result) => {
                let status = match result.status {
                    ExecStatus::Success => TaskStatus::Completed,
                    ExecStatus::Timeout => TaskStatus::Timeout,
                    ExecStatus::Error => TaskStatus::Failed,
                };
                (status, Some(result))
            }
            Err(e) => {
                tracing::error!(%task_id, error = %e, "execution failed");
                (TaskStatus::Failed, Some(failure_result(&e, self.clock.epoch_ms())))
            }
        };

        let applied = self.registry.update_status(
            &task_id,
            mapped,
            StatusMeta {
                completed_at_ms: result.as_ref().map(|r| r.completed_at_ms),
                ..StatusMeta::default()
            },
        );
        // A concurrent cancel wins: keep whatever terminal status the
        // registry holds rather than flipping it back.
        let final_status = if applied {
            mapped
        } else {
            self.registry.get(&task_id).map(|t| t.status).unwrap_or(mapped)
        };
        (final_status, result)
    }

    /// Steps 12–14: room summary + archive, workspace terminal state,
    /// detach, caller notification. Runs exactly once per task; every leg
    /// is best-effort once the registry holds the terminal status.
    async fn finalize(
        &self,
        params: &RunParams,
        status: TaskStatus,
        result: Option<ExecutionResult>,
    ) {
        let task_id = params.task_id;
        let room = self.registry.get(&task_id).and_then(|t| t.room);

        if let (Some(rooms), Some(room)) = (&self.rooms, &room) {
            let (html, fallback) = summary_message(&task_id, status, result.as_ref());
            if let Err(e) = rooms.send_html(room, &html, &fallback).await {
                tracing::warn!(%task_id, error = %e, "room summary send failed");
            }
            if let Err(e) = rooms.archive(room).await {
                tracing::warn!(%task_id, error = %e, "room archive failed");
            }
            if let Err(e) = rooms.leave(room).await {
                tracing::debug!(%task_id, error = %e, "room leave failed");
            }
        }

        let mut patch = WorkspacePatch::status(status);
        patch.events.push(self.workspaces.event(
            terminal_event_kind(status),
            format!("task finished with status: {status}"),
        ));
        if let Some(result) = &result {
            patch.artifacts.push(self.workspaces.artifact(
                "task_output",
                "output",
                result.output.clone(),
            ));
            if let Some(error) = &result.error {
                patch.artifacts.push(self.workspaces.artifact(
                    "task_error",
                    "error",
                    error.clone(),
                ));
            }
        }
        if let Err(e) = self.workspaces.update(&params.caller_id, &params.workspace_id, patch).await
        {
            tracing::warn!(%task_id, error = %e, "terminal workspace update failed");
        }

        self.workspaces.detach(&params.caller_id, &params.workspace_id).await;

        let notification = notification_message(&task_id, status, result.as_ref());
        if let Err(e) = self.store.notify(&params.caller_id, &notification).await {
            tracing::warn!(%task_id, error = %e, "caller notification failed");
        }

        tracing::info!(%task_id, %status, "task finalized");
    }

    /// Create and populate the chat room, when enabled. Best-effort.
    async fn create_room(&self, params: &RunParams) -> Option<String> {
        if !self.config.rooms_enabled {
            return None;
        }
        let rooms = self.rooms.as_ref()?;
        let name = format!("Task {}", params.task_id.short(8));
        let topic = short(&params.prompt, 80);
        match rooms.create_room(&name, topic, &params.observers).await {
            Ok(room) => {
                let kickoff = format!(
                    "Task {} started for {}: {}",
                    params.task_id,
                    params.caller_id,
                    short(&params.prompt, 200),
                );
                if let Err(e) = rooms.send_text(&room, &kickoff).await {
                    tracing::debug!(task_id = %params.task_id, error = %e, "room kickoff send failed");
                }
                Some(room)
            }
            Err(e) => {
                tracing::warn!(task_id = %params.task_id, error = %e, "room create failed");
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
struct RunParams {
    task_id: TaskId,
    caller_id: String,
    prompt: String,
    timeout_ms: Option<u64>,
    observers: Vec<String>,
    workspace_id: String,
}

/// Consume the per-task event channel, mirroring each event into the
/// workspace log and the room. Fire and forget on both legs — errors are
/// logged and never propagate into the execution path.
async fn mirror_events<C: Clock>(
    workspaces: Arc<WorkspaceManager<C>>,
    rooms: Option<Arc<dyn RoomBackend>>,
    caller_id: String,
    workspace_id: String,
    room: Option<String>,
    mut events: mpsc::Receiver<TaskEvent>,
) {
    while let Some(event) = events.recv().await {
        let summary = event.summary();
        let doc_event = DocEvent::new(EVENT_PROGRESS, summary.clone(), iso_ms(event.timestamp_ms))
            .data(json!({"kind": event.kind, "data": event.data}));
        if let Err(e) = workspaces.append_event(&caller_id, &workspace_id, doc_event).await {
            tracing::warn!(%workspace_id, error = %e, "progress event append failed");
        }
        if let (Some(rooms), Some(room)) = (&rooms, &room) {
            if let Err(e) = rooms.send_text(room, &format!("[{}] {summary}", event.kind)).await {
                tracing::debug!(%room, error = %e, "progress room mirror failed");
            }
        }
    }
}

fn terminal_event_kind(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Completed => "task_completed",
        TaskStatus::Failed => "task_failed",
        TaskStatus::Timeout => "task_timeout",
        TaskStatus::Cancelled => "task_cancelled",
        // Non-terminal statuses never reach finalization
        _ => EVENT_PROGRESS,
    }
}

fn failure_result(error: &ExecError, now_ms: u64) -> ExecutionResult {
    ExecutionResult::new(ExecStatus::Error, now_ms, now_ms).error(error.to_string())
}

/// Room summary: HTML with a plaintext fallback.
fn summary_message(
    task_id: &TaskId,
    status: TaskStatus,
    result: Option<&ExecutionResult>,
) -> (String, String) {
    let duration = result.map(|r| r.duration_ms).unwrap_or(0);
    let detail = result
        .and_then(|r| r.error.as_deref())
        .map(|e| format!(": {e}"))
        .unwrap_or_default();
    let html = format!(
        "<b>Task {task_id}</b> finished with status <code>{status}</code> after {duration}ms{detail}"
    );
    let fallback =
        format!("Task {task_id} finished with status {status} after {duration}ms{detail}");
    (html, fallback)
}

/// Caller notification with a bounded output preview.
fn notification_message(
    task_id: &TaskId,
    status: TaskStatus,
    result: Option<&ExecutionResult>,
) -> String {
    let marker = match status {
        TaskStatus::Completed => "✅",
        TaskStatus::Cancelled => "🛑",
        _ => "❌",
    };
    let mut message = format!("{marker} Task {task_id} finished with status: {status}");
    if let Some(result) = result {
        if !result.output.is_empty() {
            message.push_str("\n\nOutput preview:\n");
            message.push_str(short(&result.output, NOTIFY_PREVIEW_CHARS));
        }
        if let Some(error) = &result.error {
            message.push_str("\n\nError: ");
            message.push_str(short(error, NOTIFY_PREVIEW_CHARS));
        }
    }
    message
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
