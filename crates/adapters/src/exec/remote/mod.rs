// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote session execution backend.
//!
//! Establishes a session at the remote worker server, subscribes to its
//! event stream over WebSocket, sends the prompt, and consumes events until
//! completion. Two completion paths run in parallel — the pump's completion
//! observation and a timeout timer — and exactly one fires: the timer
//! aborts the session and resolves the wait, or completion wins and the
//! timer is dropped with the `select!`.
//!
//! `pause`/`resume` are unsupported here and return `false`; `list_files`
//! and `read_file` work only while the session is alive.

mod ws;

use crate::exec::{ExecError, ExecutionAdapter};
use crate::http;
use async_trait::async_trait;
use lw_core::{EventKind, ExecStatus, ExecutionRequest, ExecutionResult, TaskEvent, TaskId};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Percent-encode a query value (minimal set: the characters that break
/// query parsing or the request line).
fn encode_query(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}

struct SessionHandle {
    session_id: String,
}

/// Execution backend that delegates to a session at a remote worker server.
pub struct RemoteSessionAdapter {
    server: String,
    token: Option<String>,
    timeout: Duration,
    sessions: Mutex<HashMap<TaskId, SessionHandle>>,
}

impl RemoteSessionAdapter {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            token: None,
            timeout: Duration::from_secs(5 * 60),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    lw_core::setters! {
        set {
            timeout: Duration,
        }
        option {
            token: String,
        }
    }

    fn session_id_for(&self, task_id: &TaskId) -> Result<String, ExecError> {
        self.sessions
            .lock()
            .get(task_id)
            .map(|handle| handle.session_id.clone())
            .ok_or_else(|| ExecError::NotFound(task_id.to_string()))
    }

    async fn abort_session(&self, session_id: &str) -> bool {
        let path = format!("/api/v1/sessions/{session_id}/abort");
        match http::post(&self.server, &path, self.token.as_deref(), "{}").await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "session abort request failed");
                false
            }
        }
    }
}

#[async_trait]
impl ExecutionAdapter for RemoteSessionAdapter {
    async fn execute(
        &self,
        request: ExecutionRequest,
        events: mpsc::Sender<TaskEvent>,
    ) -> Result<ExecutionResult, ExecError> {
        let started_at_ms = epoch_ms();

        // Create the session. The client reference lets server-side logs be
        // correlated with ours across retries.
        let client_ref = uuid::Uuid::new_v4().simple().to_string();
        let body = json!({
            "task_id": request.task_id,
            "workspace_id": request.workspace_id,
            "client_ref": client_ref,
        });
        let response = http::post(&self.server, "/api/v1/sessions", self.token.as_deref(), &body.to_string())
            .await
            .map_err(|e| ExecError::SpawnFailed(format!("session create failed: {e}")))?;
        let session_id = serde_json::from_str::<serde_json::Value>(&response)
            .ok()
            .and_then(|v| v.get("id").and_then(|id| id.as_str()).map(str::to_string))
            .ok_or_else(|| {
                ExecError::SpawnFailed(format!("malformed session create response: {response}"))
            })?;

        self.sessions
            .lock()
            .insert(request.task_id, SessionHandle { session_id: session_id.clone() });
        tracing::info!(task_id = %request.task_id, %session_id, "remote session created");

        // Subscribe before sending the prompt so no event is missed
        let stream = ws::connect(&self.server, &session_id, self.token.as_deref()).await;
        let Some(stream) = stream else {
            self.sessions.lock().remove(&request.task_id);
            return Err(ExecError::SessionError("event stream subscription failed".to_string()));
        };

        let _ = events
            .send(TaskEvent::new(
                EventKind::Start,
                epoch_ms(),
                json!({"raw_type": "session.created", "session_id": session_id}),
            ))
            .await;

        let cancel = CancellationToken::new();
        let mut pump = tokio::spawn(ws::event_pump(
            stream,
            session_id.clone(),
            events.clone(),
            cancel.clone(),
        ));

        // Send the prompt
        let prompt_path = format!("/api/v1/sessions/{session_id}/prompt");
        let prompt_body = json!({"prompt": request.prompt}).to_string();
        if let Err(e) =
            http::post(&self.server, &prompt_path, self.token.as_deref(), &prompt_body).await
        {
            cancel.cancel();
            let _ = pump.await;
            self.sessions.lock().remove(&request.task_id);
            return Err(ExecError::SessionError(format!("prompt send failed: {e}")));
        }

        // Completion observer vs timeout timer — exactly one resolves the wait.
        let deadline = request.timeout_ms.map(Duration::from_millis).unwrap_or(self.timeout);
        let (end, timed_out) = tokio::select! {
            end = &mut pump => (end.unwrap_or_default(), false),
            _ = tokio::time::sleep(deadline) => {
                tracing::warn!(task_id = %request.task_id, %session_id, ?deadline, "session deadline elapsed, aborting");
                self.abort_session(&session_id).await;
                cancel.cancel();
                (pump.await.unwrap_or_default(), true)
            }
        };

        self.sessions.lock().remove(&request.task_id);
        let completed_at_ms = epoch_ms();

        let result = if timed_out {
            let _ = events
                .send(TaskEvent::new(
                    EventKind::Error,
                    completed_at_ms,
                    json!({"raw_type": "session.timeout"}),
                ))
                .await;
            ExecutionResult::new(ExecStatus::Timeout, started_at_ms, completed_at_ms)
                .output(end.output)
                .error(format!("execution timed out after {}ms", deadline.as_millis()))
        } else if end.completed {
            ExecutionResult::new(ExecStatus::Success, started_at_ms, completed_at_ms)
                .output(end.output)
        } else {
            let error =
                end.error.unwrap_or_else(|| "event stream closed before completion".to_string());
            let _ = events
                .send(TaskEvent::new(
                    EventKind::Error,
                    completed_at_ms,
                    json!({"raw_type": "session.error", "message": error.clone()}),
                ))
                .await;
            ExecutionResult::new(ExecStatus::Error, started_at_ms, completed_at_ms)
                .output(end.output)
                .error(error)
        };

        tracing::info!(
            task_id = %request.task_id,
            status = %result.status,
            duration_ms = result.duration_ms,
            "remote session finished"
        );
        Ok(result)
    }

    async fn abort(&self, task_id: &TaskId) -> bool {
        let Ok(session_id) = self.session_id_for(task_id) else {
            return false;
        };
        self.abort_session(&session_id).await
    }

    // pause/resume unsupported: trait defaults return false

    async fn is_active(&self, task_id: &TaskId) -> bool {
        self.sessions.lock().contains_key(task_id)
    }

    async fn send_input(&self, task_id: &TaskId, message: &str) -> Result<(), ExecError> {
        let session_id = self.session_id_for(task_id)?;
        let path = format!("/api/v1/sessions/{session_id}/message");
        let body = json!({"message": message}).to_string();
        http::post(&self.server, &path, self.token.as_deref(), &body)
            .await
            .map(|_| ())
            .map_err(|e| ExecError::SessionError(format!("message send failed: {e}")))
    }

    async fn list_files(
        &self,
        task_id: &TaskId,
        path: Option<&str>,
    ) -> Result<Vec<String>, ExecError> {
        let session_id = self.session_id_for(task_id)?;
        let query = path.map(|p| format!("?path={}", encode_query(p))).unwrap_or_default();
        let url = format!("/api/v1/sessions/{session_id}/files{query}");
        let response = http::get(&self.server, &url, self.token.as_deref())
            .await
            .map_err(|e| ExecError::SessionError(format!("file list failed: {e}")))?;
        let files = serde_json::from_str::<serde_json::Value>(&response)
            .ok()
            .and_then(|v| v.get("files").cloned())
            .and_then(|v| serde_json::from_value::<Vec<String>>(v).ok())
            .ok_or_else(|| {
                ExecError::SessionError(format!("malformed file list response: {response}"))
            })?;
        Ok(files)
    }

    async fn read_file(&self, task_id: &TaskId, path: &str) -> Result<String, ExecError> {
        let session_id = self.session_id_for(task_id)?;
        let url =
            format!("/api/v1/sessions/{session_id}/file?path={}", encode_query(path));
        http::get(&self.server, &url, self.token.as_deref())
            .await
            .map_err(|e| ExecError::SessionError(format!("file read failed: {e}")))
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
