// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lw_core::ExecutionRequest;
use tokio::sync::mpsc;

fn adapter(dir: &std::path::Path, runner: &str) -> LocalProcessAdapter {
    LocalProcessAdapter::new(dir.to_path_buf(), runner)
        .timeout(Duration::from_secs(5))
        .grace(Duration::from_millis(200))
}

fn request(prompt: &str) -> ExecutionRequest {
    ExecutionRequest::new(TaskId::new(), "caller-1", prompt).workspace_id("blk-1")
}

async fn drain(mut rx: mpsc::Receiver<TaskEvent>) -> Vec<TaskEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn echo_worker_completes_with_output() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = adapter(dir.path(), "echo");
    let (tx, rx) = mpsc::channel(16);

    let result = adapter.execute(request("hello runner"), tx).await.unwrap();
    let events = drain(rx).await;

    assert_eq!(result.status, ExecStatus::Success);
    assert_eq!(result.exit_code, Some(0));
    assert!(result.output.contains("hello runner"));
    assert_eq!(events.first().map(|e| e.kind), Some(EventKind::Start));
    assert_eq!(events.last().map(|e| e.kind), Some(EventKind::Complete));
}

#[tokio::test]
async fn worker_runs_in_per_task_directory() {
    let dir = tempfile::tempdir().unwrap();
    // The prompt is ignored; the runner just reports its cwd
    let adapter = adapter(dir.path(), "sh -c pwd sh");
    let (tx, rx) = mpsc::channel(16);

    let req = request("unused");
    let task_id = req.task_id;
    let result = adapter.execute(req, tx).await.unwrap();
    drain(rx).await;

    assert!(result.output.trim_end().ends_with(task_id.as_str()));
}

#[tokio::test]
async fn nonzero_exit_is_an_error_with_stderr() {
    let dir = tempfile::tempdir().unwrap();
    // Runner ignores the prompt, writes stderr, exits 3
    let adapter = adapter(dir.path(), "sh -c 'echo boom >&2; exit 3' sh");
    let (tx, rx) = mpsc::channel(16);

    let result = adapter.execute(request("x"), tx).await.unwrap();
    let events = drain(rx).await;

    assert_eq!(result.status, ExecStatus::Error);
    assert_eq!(result.exit_code, Some(3));
    let error = result.error.unwrap();
    assert!(error.contains("code 3"), "{error}");
    assert!(error.contains("boom"), "{error}");
    assert_eq!(events.last().map(|e| e.kind), Some(EventKind::Error));
}

#[tokio::test]
async fn deadline_elapsing_reports_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = adapter(dir.path(), "sleep");
    let (tx, rx) = mpsc::channel(16);

    let mut req = request("30");
    req.timeout_ms = Some(150);
    let result = adapter.execute(req, tx).await.unwrap();
    let events = drain(rx).await;

    assert_eq!(result.status, ExecStatus::Timeout);
    assert!(result.error.unwrap().contains("timed out"));
    assert_eq!(events.last().map(|e| e.kind), Some(EventKind::Error));
}

#[tokio::test]
async fn abort_kills_the_worker() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = std::sync::Arc::new(adapter(dir.path(), "sleep"));
    let (tx, rx) = mpsc::channel(16);

    let req = request("30");
    let task_id = req.task_id;
    let run = tokio::spawn({
        let adapter = std::sync::Arc::clone(&adapter);
        async move { adapter.execute(req, tx).await }
    });

    // Wait until the worker is tracked, then abort
    for _ in 0..100 {
        if adapter.is_active(&task_id).await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(adapter.abort(&task_id).await);

    let result = run.await.unwrap().unwrap();
    let events = drain(rx).await;

    assert_eq!(result.status, ExecStatus::Error);
    assert!(result.error.unwrap().contains("aborted"));
    assert_eq!(events.last().map(|e| e.kind), Some(EventKind::Abort));
    assert!(!adapter.is_active(&task_id).await);
}

#[tokio::test]
async fn pause_and_resume_signal_the_worker() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = std::sync::Arc::new(adapter(dir.path(), "sleep"));
    let (tx, rx) = mpsc::channel(16);

    let req = request("30");
    let task_id = req.task_id;
    let run = tokio::spawn({
        let adapter = std::sync::Arc::clone(&adapter);
        async move { adapter.execute(req, tx).await }
    });

    for _ in 0..100 {
        if adapter.is_active(&task_id).await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(adapter.pause(&task_id).await);
    assert!(adapter.resume(&task_id).await);
    assert!(adapter.abort(&task_id).await);

    run.await.unwrap().unwrap();
    drain(rx).await;
}

#[tokio::test]
async fn control_signals_for_unknown_tasks_return_false() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = adapter(dir.path(), "echo");
    let unknown = TaskId::new();
    assert!(!adapter.abort(&unknown).await);
    assert!(!adapter.pause(&unknown).await);
    assert!(!adapter.resume(&unknown).await);
    assert!(!adapter.is_active(&unknown).await);
}

#[test]
fn worker_script_includes_caps() {
    let adapter = LocalProcessAdapter::new("/tmp".into(), "runner")
        .cpu_secs(60u64)
        .mem_kb(512_000u64);
    let script = adapter.worker_script();
    assert!(script.contains("ulimit -t 60"));
    assert!(script.contains("ulimit -v 512000"));
    assert!(script.ends_with("exec runner \"$@\""));
}

#[test]
fn worker_script_without_caps_is_bare() {
    let adapter = LocalProcessAdapter::new("/tmp".into(), "runner");
    assert_eq!(adapter.worker_script(), "exec runner \"$@\"");
}
