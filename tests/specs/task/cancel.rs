// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S4 — cancel while running.

use crate::prelude::*;

#[tokio::test]
async fn cancel_aborts_once_and_the_status_never_flips_back() {
    let broker = broker();
    broker.adapter.set_script(RunScript { hold_for_abort: true, ..RunScript::default() });

    let result = broker.orchestrator.submit(SubmitRequest::new("a1", "long job")).await.unwrap();
    broker.adapter.wait_active(&result.task_id).await;

    let outcome = broker
        .control
        .handle(ControlRequest {
            task_id: result.task_id,
            signal: ControlSignal::Cancel,
            reason: Some("stop".into()),
            requested_by: "a1".into(),
        })
        .await
        .unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.previous_status, TaskStatus::Running);
    assert_eq!(outcome.new_status, Some(TaskStatus::Cancelled));
    assert_eq!(broker.adapter.abort_count(), 1);

    // The adapter's aborted result arrives afterwards; the terminal status
    // stays cancelled through finalization
    assert_eq!(wait_terminal(&broker, &result.task_id).await, TaskStatus::Cancelled);
    wait_notified(&broker).await;
    assert_eq!(broker.registry.get(&result.task_id).unwrap().status, TaskStatus::Cancelled);

    // Workspace carries the cancellation with its reason
    let workspace_id = result.workspace_id.unwrap();
    let doc = broker.workspaces.get("a1", &workspace_id).await.unwrap();
    let cancel_event = doc.events.iter().find(|e| e.kind == "task_cancelled").unwrap();
    assert!(cancel_event.message.contains("stop"));
}

#[tokio::test]
async fn cancel_of_a_queued_task_commits_without_a_live_worker() {
    let broker = broker();
    // Registered but never started: the backend has nothing to abort
    let task_id = TaskId::new();
    broker.registry.register(task_id, "a1", None).unwrap();

    let outcome = broker
        .control
        .handle(ControlRequest {
            task_id,
            signal: ControlSignal::Cancel,
            reason: None,
            requested_by: "a1".into(),
        })
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.previous_status, TaskStatus::Queued);
    assert_eq!(broker.registry.get(&task_id).unwrap().status, TaskStatus::Cancelled);
}

#[tokio::test]
async fn control_signal_against_a_terminal_task_is_rejected_without_mutation() {
    let broker = broker();
    let result = broker.orchestrator.submit(SubmitRequest::new("a1", "quick")).await.unwrap();
    wait_terminal(&broker, &result.task_id).await;
    wait_notified(&broker).await;
    let before = broker.registry.get(&result.task_id).unwrap();

    let outcome = broker
        .control
        .handle(ControlRequest {
            task_id: result.task_id,
            signal: ControlSignal::Cancel,
            reason: None,
            requested_by: "a1".into(),
        })
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().starts_with("Cannot cancel"));
    assert_eq!(broker.registry.get(&result.task_id).unwrap(), before);
}
