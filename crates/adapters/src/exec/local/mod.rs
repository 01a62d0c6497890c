// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local process execution backend.
//!
//! Spawns one short-lived worker process per task: a `bash -c` wrapper
//! around the configured runner command, with the prompt as its argument,
//! a per-task workspace directory as its cwd, and optional `ulimit` cpu and
//! memory caps. Output chunks are not events — stdout and stderr aggregate
//! into trailing-window buffers and only lifecycle events reach the
//! orchestrator. Timeout delivers SIGTERM, waits out the grace period, then
//! SIGKILLs. Pause and resume map to SIGSTOP/SIGCONT.

pub mod tail;

use crate::exec::{ExecError, ExecutionAdapter};
use async_trait::async_trait;
use lw_core::{EventKind, ExecStatus, ExecutionRequest, ExecutionResult, TaskEvent, TaskId};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use self::tail::TailBuffer;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Tracked state for one live worker process.
struct WorkerHandle {
    pid: Pid,
    aborted: Arc<AtomicBool>,
}

/// Execution backend that runs each task as a sandboxed local process.
pub struct LocalProcessAdapter {
    workdir_root: PathBuf,
    runner_cmd: String,
    cpu_secs: Option<u64>,
    mem_kb: Option<u64>,
    timeout: Duration,
    grace: Duration,
    workers: Mutex<HashMap<TaskId, WorkerHandle>>,
}

impl LocalProcessAdapter {
    pub fn new(workdir_root: PathBuf, runner_cmd: impl Into<String>) -> Self {
        Self {
            workdir_root,
            runner_cmd: runner_cmd.into(),
            cpu_secs: None,
            mem_kb: None,
            timeout: Duration::from_secs(5 * 60),
            grace: Duration::from_secs(5),
            workers: Mutex::new(HashMap::new()),
        }
    }

    lw_core::setters! {
        set {
            timeout: Duration,
            grace: Duration,
        }
        option {
            cpu_secs: u64,
            mem_kb: u64,
        }
    }

    /// Shell line handed to `bash -c`: optional ulimit caps, then the runner
    /// with the prompt forwarded via `"$@"`.
    fn worker_script(&self) -> String {
        let mut script = String::new();
        if let Some(cpu) = self.cpu_secs {
            script.push_str(&format!("ulimit -t {cpu}; "));
        }
        if let Some(mem) = self.mem_kb {
            script.push_str(&format!("ulimit -v {mem}; "));
        }
        script.push_str(&format!("exec {} \"$@\"", self.runner_cmd));
        script
    }

    fn signal_worker(&self, task_id: &TaskId, signal: Signal) -> bool {
        let workers = self.workers.lock();
        match workers.get(task_id) {
            Some(handle) => match kill(handle.pid, signal) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(%task_id, %signal, error = %e, "worker signal failed");
                    false
                }
            },
            None => false,
        }
    }
}

#[async_trait]
impl ExecutionAdapter for LocalProcessAdapter {
    async fn execute(
        &self,
        request: ExecutionRequest,
        events: mpsc::Sender<TaskEvent>,
    ) -> Result<ExecutionResult, ExecError> {
        let started_at_ms = epoch_ms();
        let workdir = self.workdir_root.join(request.task_id.as_str());
        tokio::fs::create_dir_all(&workdir)
            .await
            .map_err(|e| ExecError::SpawnFailed(format!("failed to create workspace dir: {e}")))?;

        // The `_` becomes $0; the prompt arrives as $1 which `"$@"` expands.
        let mut child = tokio::process::Command::new("bash")
            .arg("-c")
            .arg(self.worker_script())
            .arg("_")
            .arg(&request.prompt)
            .current_dir(&workdir)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::SpawnFailed(format!("failed to spawn worker: {e}")))?;

        let pid = child
            .id()
            .ok_or_else(|| ExecError::SpawnFailed("worker exited before tracking".to_string()))?;
        let pid = Pid::from_raw(pid as i32);
        let aborted = Arc::new(AtomicBool::new(false));
        self.workers
            .lock()
            .insert(request.task_id, WorkerHandle { pid, aborted: Arc::clone(&aborted) });

        tracing::info!(task_id = %request.task_id, %pid, "worker spawned");
        let _ = events
            .send(TaskEvent::new(
                EventKind::Start,
                epoch_ms(),
                json!({"raw_type": "worker.start", "pid": pid.as_raw()}),
            ))
            .await;

        // Drain both pipes concurrently so a chatty worker can't fill them.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_task = tokio::spawn(read_tail(stdout));
        let err_task = tokio::spawn(read_tail(stderr));

        let deadline = request.timeout_ms.map(Duration::from_millis).unwrap_or(self.timeout);
        let (exit_code, timed_out) = match tokio::time::timeout(deadline, child.wait()).await {
            Ok(status) => {
                let code = match status {
                    Ok(st) => st.code(),
                    Err(e) => {
                        self.workers.lock().remove(&request.task_id);
                        return Err(ExecError::SessionError(format!("wait failed: {e}")));
                    }
                };
                (code, false)
            }
            Err(_) => {
                tracing::warn!(task_id = %request.task_id, ?deadline, "worker deadline elapsed, terminating");
                let _ = kill(pid, Signal::SIGTERM);
                let code = match tokio::time::timeout(self.grace, child.wait()).await {
                    Ok(status) => status.ok().and_then(|s| s.code()),
                    Err(_) => {
                        let _ = child.start_kill();
                        child.wait().await.ok().and_then(|s| s.code())
                    }
                };
                (code, true)
            }
        };

        let stdout_tail = out_task.await.unwrap_or_default();
        let stderr_tail = err_task.await.unwrap_or_default();
        self.workers.lock().remove(&request.task_id);

        let completed_at_ms = epoch_ms();
        let was_aborted = aborted.load(Ordering::SeqCst);

        let (kind, data, result) = if timed_out {
            let result = ExecutionResult::new(ExecStatus::Timeout, started_at_ms, completed_at_ms)
                .output(stdout_tail.into_string())
                .error(format!("execution timed out after {}ms", deadline.as_millis()));
            (EventKind::Error, json!({"raw_type": "worker.timeout"}), result)
        } else if was_aborted {
            let result = ExecutionResult::new(ExecStatus::Error, started_at_ms, completed_at_ms)
                .output(stdout_tail.into_string())
                .error("aborted by control signal".to_string());
            (EventKind::Abort, json!({"raw_type": "worker.abort"}), result)
        } else if exit_code == Some(0) {
            let mut result =
                ExecutionResult::new(ExecStatus::Success, started_at_ms, completed_at_ms)
                    .output(stdout_tail.into_string());
            result.exit_code = Some(0);
            (EventKind::Complete, json!({"raw_type": "worker.complete", "exit_code": 0}), result)
        } else {
            let stderr_text = stderr_tail.into_string();
            let error = match exit_code {
                Some(code) if !stderr_text.is_empty() => {
                    format!("worker exited with code {code}: {}", stderr_text.trim_end())
                }
                Some(code) => format!("worker exited with code {code}"),
                None => "worker killed by signal".to_string(),
            };
            let mut result = ExecutionResult::new(ExecStatus::Error, started_at_ms, completed_at_ms)
                .output(stdout_tail.into_string())
                .error(error);
            result.exit_code = exit_code;
            (
                EventKind::Error,
                json!({"raw_type": "worker.error", "exit_code": exit_code}),
                result,
            )
        };

        // Terminal event must land before execute returns.
        let _ = events.send(TaskEvent::new(kind, completed_at_ms, data)).await;
        tracing::info!(
            task_id = %request.task_id,
            status = %result.status,
            exit_code = ?result.exit_code,
            duration_ms = result.duration_ms,
            "worker finished"
        );
        Ok(result)
    }

    async fn abort(&self, task_id: &TaskId) -> bool {
        let (pid, aborted) = {
            let workers = self.workers.lock();
            match workers.get(task_id) {
                Some(handle) => (handle.pid, Arc::clone(&handle.aborted)),
                None => return false,
            }
        };
        aborted.store(true, Ordering::SeqCst);
        let _ = kill(pid, Signal::SIGTERM);
        // Escalate to SIGKILL if the worker ignores the soft terminate.
        let grace = self.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = kill(pid, Signal::SIGKILL);
        });
        true
    }

    async fn pause(&self, task_id: &TaskId) -> bool {
        self.signal_worker(task_id, Signal::SIGSTOP)
    }

    async fn resume(&self, task_id: &TaskId) -> bool {
        self.signal_worker(task_id, Signal::SIGCONT)
    }

    async fn is_active(&self, task_id: &TaskId) -> bool {
        self.workers.lock().contains_key(task_id)
    }
}

/// Read a pipe to EOF into a trailing-window buffer.
async fn read_tail<R: tokio::io::AsyncRead + Unpin + Send>(pipe: Option<R>) -> TailBuffer {
    let mut tail = TailBuffer::default();
    let Some(mut pipe) = pipe else {
        return tail;
    };
    let mut buf = [0u8; 8192];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => tail.push(&buf[..n]),
        }
    }
    tail
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
