// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC tool dispatch.
//!
//! Maps the inbound tool surface onto the engine. Transport-level failures
//! (unknown method, malformed params) become JSON-RPC errors; domain
//! failures (queue full, task not found, illegal transition) are
//! structured objects inside tool results so callers can branch on them.

use crate::env::DAEMON_VERSION;
use lw_adapters::exec::{ExecError, ExecutionAdapter};
use lw_adapters::room::RoomBackend;
use lw_core::{BrokerConfig, Clock, ControlRequest, TaskId};
use lw_engine::{ControlError, ControlHandler, Orchestrator, SubmitError, SubmitRequest, TaskRegistry, WorkspaceManager};
use lw_wire::{
    ControlResult, DomainError, ExecuteTaskParams, FileContent, FileList, GetTaskFilesParams,
    GetTaskHistoryParams, GetTaskStatusParams, HealthView, ListTasksParams, MessageAccepted,
    ReadTaskFileParams, RpcError, RpcRequest, RpcResponse, SendTaskControlParams,
    SendTaskMessageParams, TaskAccepted, TaskHistoryView, TaskStatusView, TaskSummary,
    ERR_BAD_REQUEST, ERR_METHOD_NOT_FOUND,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// `read_task_file` rejects files above this many bytes.
const MAX_FILE_BYTES: usize = 1024 * 1024;

/// Events returned by `get_task_status`.
const RECENT_EVENTS: usize = 5;

/// Default page size for `get_task_history`.
const HISTORY_PAGE: usize = 50;

pub struct ToolRouter<C: Clock> {
    orchestrator: Arc<Orchestrator<C>>,
    registry: Arc<TaskRegistry<C>>,
    workspaces: Arc<WorkspaceManager<C>>,
    control: ControlHandler<C>,
    adapter: Arc<dyn ExecutionAdapter>,
    rooms: Option<Arc<dyn RoomBackend>>,
    config: BrokerConfig,
    clock: C,
    started_at: Instant,
}

impl<C: Clock> ToolRouter<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        orchestrator: Arc<Orchestrator<C>>,
        registry: Arc<TaskRegistry<C>>,
        workspaces: Arc<WorkspaceManager<C>>,
        control: ControlHandler<C>,
        adapter: Arc<dyn ExecutionAdapter>,
        rooms: Option<Arc<dyn RoomBackend>>,
        config: BrokerConfig,
        clock: C,
    ) -> Self {
        Self {
            orchestrator,
            registry,
            workspaces,
            control,
            adapter,
            rooms,
            config,
            clock,
            started_at: Instant::now(),
        }
    }

    /// Dispatch one tool call.
    pub async fn dispatch(&self, request: RpcRequest) -> RpcResponse {
        let id = request.id.clone();
        let method = request.method.clone();
        tracing::debug!(%method, "tool call");
        let outcome = match method.as_str() {
            "ping" => Ok(json!({"status": "ok", "version": DAEMON_VERSION})),
            "health" => Ok(to_value(self.health_view())),
            "execute_task" => self.execute_task(&request).await,
            "get_task_status" => self.get_task_status(&request).await,
            "get_task_history" => self.get_task_history(&request).await,
            "send_task_message" => self.send_task_message(&request).await,
            "send_task_control" => self.send_task_control(&request).await,
            "get_task_files" => self.get_task_files(&request).await,
            "read_task_file" => self.read_task_file(&request).await,
            "list_tasks" => self.list_tasks(&request),
            _ => Err(RpcError::new(ERR_METHOD_NOT_FOUND, format!("unknown tool: {method}"))),
        };
        match outcome {
            Ok(result) => RpcResponse::result(id, result),
            Err(error) => RpcResponse::error(id, error),
        }
    }

    pub fn health_view(&self) -> HealthView {
        let counts = self.registry.counts();
        HealthView {
            status: "ok".to_string(),
            uptime_ms: self.started_at.elapsed().as_millis() as u64,
            active_tasks: counts.active,
            total_tasks: counts.total,
            backend: self.config.execution_backend.to_string(),
        }
    }

    async fn execute_task(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        let params: ExecuteTaskParams = parse_params(request)?;
        if params.description.trim().is_empty() {
            return Err(RpcError::new(ERR_BAD_REQUEST, "description must not be empty"));
        }
        let submit = SubmitRequest {
            caller_id: params.caller_id,
            description: params.description,
            idempotency_key: params.idempotency_key,
            timeout_ms: params.timeout_ms,
            sync: params.sync,
            observers: params.observers,
        };
        match self.orchestrator.submit(submit).await {
            Ok(result) => Ok(to_value(TaskAccepted {
                task_id: result.task_id,
                status: result.status,
                workspace_id: result.workspace_id,
                message: result.message,
                timeout_hint: result.timeout_hint,
            })),
            Err(SubmitError::QueueFull) => Ok(to_value(DomainError::queue_full())),
            Err(SubmitError::Workspace(e)) => {
                tracing::error!(error = %e, "workspace create failed during submission");
                Err(RpcError::internal(e.to_string()))
            }
        }
    }

    async fn get_task_status(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        let params: GetTaskStatusParams = parse_params(request)?;
        let task_id = TaskId::from_string(&params.task_id);
        let Some(task) = self.registry.get(&task_id) else {
            return Ok(to_value(DomainError::task_not_found(&params.task_id)));
        };
        let recent_events = match &task.workspace_id {
            Some(workspace_id) => match self.workspaces.get(&task.caller_id, workspace_id).await {
                Ok(doc) => {
                    let skip = doc.events.len().saturating_sub(RECENT_EVENTS);
                    doc.events.into_iter().skip(skip).collect()
                }
                Err(e) => {
                    tracing::warn!(%task_id, error = %e, "workspace read failed for status");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        Ok(to_value(TaskStatusView {
            task_id: task.id,
            status: task.status,
            created_at_ms: task.created_at_ms,
            started_at_ms: task.started_at_ms,
            completed_at_ms: task.completed_at_ms,
            recent_events,
        }))
    }

    async fn get_task_history(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        let params: GetTaskHistoryParams = parse_params(request)?;
        let task_id = TaskId::from_string(&params.task_id);
        let Some(task) = self.registry.get(&task_id) else {
            return Ok(to_value(DomainError::task_not_found(&params.task_id)));
        };
        let Some(workspace_id) = &task.workspace_id else {
            return Ok(to_value(DomainError::task_not_found(&params.task_id)));
        };
        let doc = match self.workspaces.get(&task.caller_id, workspace_id).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(%task_id, error = %e, "workspace read failed for history");
                return Err(RpcError::internal(e.to_string()));
            }
        };
        let events_total = doc.events.len();
        let artifacts_total = doc.artifacts.len();
        let offset = params.events_offset.unwrap_or(0);
        let limit = params.events_limit.unwrap_or(HISTORY_PAGE);
        let events: Vec<_> = doc.events.into_iter().skip(offset).take(limit).collect();
        let has_more = offset + events.len() < events_total;
        Ok(to_value(TaskHistoryView {
            task_id: task.id,
            status: task.status,
            events,
            events_total,
            has_more,
            artifacts: params.include_artifacts.then_some(doc.artifacts),
            artifacts_total,
        }))
    }

    async fn send_task_message(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        let params: SendTaskMessageParams = parse_params(request)?;
        let task_id = TaskId::from_string(&params.task_id);
        let Some(task) = self.registry.get(&task_id) else {
            return Ok(to_value(DomainError::task_not_found(&params.task_id)));
        };
        if task.status.is_terminal() {
            return Ok(to_value(DomainError {
                error: format!("Cannot message task with status: {}", task.status),
                code: "TASK_TERMINAL".to_string(),
                status: 409,
            }));
        }

        // Forward into the live session where the backend supports it.
        let accepted = match self.adapter.send_input(&task_id, &params.message).await {
            Ok(()) => true,
            Err(ExecError::Unsupported(_)) => false,
            Err(e) => {
                tracing::warn!(%task_id, error = %e, "message forward failed");
                false
            }
        };

        // The message lands in the workspace log either way.
        if let Some(workspace_id) = &task.workspace_id {
            let event = self
                .workspaces
                .event("task_message", format!("[{}] {}", params.message_type, params.message))
                .data(json!({"metadata": params.metadata, "forwarded": accepted}));
            if let Err(e) =
                self.workspaces.append_event(&task.caller_id, workspace_id, event).await
            {
                tracing::warn!(%task_id, error = %e, "message event append failed");
            }
        }
        if let (Some(rooms), Some(room)) = (&self.rooms, &task.room) {
            if let Err(e) =
                rooms.send_text(room, &format!("[{}] {}", params.message_type, params.message)).await
            {
                tracing::debug!(%task_id, error = %e, "message room mirror failed");
            }
        }

        Ok(to_value(MessageAccepted { timestamp_ms: self.clock.epoch_ms(), accepted }))
    }

    async fn send_task_control(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        let params: SendTaskControlParams = parse_params(request)?;
        let task_id = TaskId::from_string(&params.task_id);
        let Some(task) = self.registry.get(&task_id) else {
            return Ok(to_value(DomainError::task_not_found(&params.task_id)));
        };
        let outcome = self
            .control
            .handle(ControlRequest {
                task_id,
                signal: params.control,
                reason: params.reason,
                requested_by: task.caller_id,
            })
            .await;
        match outcome {
            Ok(outcome) => Ok(to_value(ControlResult {
                success: outcome.success,
                previous_status: outcome.previous_status,
                new_status: outcome.new_status,
                error: outcome.error,
            })),
            Err(ControlError::UnknownTask(id)) => Ok(to_value(DomainError::task_not_found(&id))),
        }
    }

    async fn get_task_files(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        let params: GetTaskFilesParams = parse_params(request)?;
        let task_id = TaskId::from_string(&params.task_id);
        if self.registry.get(&task_id).is_none() {
            return Ok(to_value(DomainError::task_not_found(&params.task_id)));
        }
        match self.adapter.list_files(&task_id, params.path.as_deref()).await {
            Ok(files) => Ok(to_value(FileList { task_id, files })),
            Err(e) => Ok(to_value(exec_domain_error(&params.task_id, e))),
        }
    }

    async fn read_task_file(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        let params: ReadTaskFileParams = parse_params(request)?;
        let task_id = TaskId::from_string(&params.task_id);
        if self.registry.get(&task_id).is_none() {
            return Ok(to_value(DomainError::task_not_found(&params.task_id)));
        }
        match self.adapter.read_file(&task_id, &params.file_path).await {
            Ok(content) if content.len() > MAX_FILE_BYTES => Ok(to_value(DomainError {
                error: format!(
                    "File {} is {} bytes; the limit is {MAX_FILE_BYTES}",
                    params.file_path,
                    content.len()
                ),
                code: "FILE_TOO_LARGE".to_string(),
                status: 413,
            })),
            Ok(content) => {
                let size = content.len();
                Ok(to_value(FileContent {
                    task_id,
                    file_path: params.file_path,
                    content,
                    size,
                }))
            }
            Err(e) => Ok(to_value(exec_domain_error(&params.task_id, e))),
        }
    }

    fn list_tasks(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        let params: ListTasksParams = if request.params.is_null() {
            ListTasksParams::default()
        } else {
            parse_params(request)?
        };
        let tasks = match &params.caller_id {
            Some(caller_id) => self.registry.by_caller(caller_id),
            None => self.registry.all(),
        };
        let summaries: Vec<TaskSummary> = tasks
            .into_iter()
            .map(|t| TaskSummary {
                task_id: t.id,
                caller_id: t.caller_id,
                status: t.status,
                created_at_ms: t.created_at_ms,
                completed_at_ms: t.completed_at_ms,
                workspace_id: t.workspace_id,
            })
            .collect();
        Ok(json!({"tasks": summaries, "total": summaries.len()}))
    }
}

fn parse_params<T: DeserializeOwned>(request: &RpcRequest) -> Result<T, RpcError> {
    serde_json::from_value(request.params.clone())
        .map_err(|e| RpcError::new(ERR_BAD_REQUEST, format!("invalid params: {e}")))
}

fn to_value<T: serde::Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Map backend errors onto the structured domain error shape.
fn exec_domain_error(task_id: &str, error: ExecError) -> DomainError {
    match error {
        ExecError::Unsupported(op) => DomainError {
            error: format!("{op} is only available on the remote execution backend"),
            code: "UNSUPPORTED_BACKEND".to_string(),
            status: 400,
        },
        ExecError::NotFound(_) => DomainError {
            error: format!("No live session for task {task_id}"),
            code: "SESSION_GONE".to_string(),
            status: 404,
        },
        other => DomainError { error: other.to_string(), code: "BACKEND_ERROR".to_string(), status: 502 },
    }
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
