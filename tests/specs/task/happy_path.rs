// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S1 — happy path, async submission.

use crate::prelude::*;

#[tokio::test]
async fn async_submission_runs_to_completed_with_artifact_and_notification() {
    let broker = broker();
    // The runner signals completion the way a session server would
    broker.adapter.set_script(RunScript {
        events: vec![TaskEvent::new(
            EventKind::Output,
            1,
            serde_json::json!({"text": "hello.txt written"}),
        )],
        output: "hello.txt written".to_string(),
        ..RunScript::default()
    });

    let result = broker
        .orchestrator
        .submit(SubmitRequest::new("a1", "write hello.txt"))
        .await
        .unwrap();

    // Immediate result: queued, with a workspace attached to the caller
    assert_eq!(result.status, TaskStatus::Queued);
    let workspace_id = result.workspace_id.clone().unwrap();
    assert!(broker.store.is_attached(&workspace_id));

    assert_eq!(wait_terminal(&broker, &result.task_id).await, TaskStatus::Completed);
    let notifications = wait_notified(&broker).await;

    // Workspace: completed status, full output artifact
    let doc = broker.workspaces.get("a1", &workspace_id).await.unwrap();
    assert_eq!(doc.status, TaskStatus::Completed);
    let artifact = doc.artifacts.iter().find(|a| a.kind == "task_output").unwrap();
    assert_eq!(artifact.content, "hello.txt written");

    // One notification, success marker first
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].0, "a1");
    assert!(notifications[0].1.starts_with("✅"));
    assert!(notifications[0].1.contains(result.task_id.as_str()));

    // Workspace detached after finalization; content still readable
    assert!(!broker.store.is_attached(&workspace_id));
    assert!(broker.store.value_of(&workspace_id).is_some());
}

#[tokio::test]
async fn started_and_completed_timestamps_are_set_once() {
    let broker = broker();
    let result = broker.orchestrator.submit(SubmitRequest::new("a1", "x")).await.unwrap();
    wait_terminal(&broker, &result.task_id).await;
    wait_notified(&broker).await;

    let task = broker.registry.get(&result.task_id).unwrap();
    assert!(task.started_at_ms.is_some());
    assert!(task.completed_at_ms.is_some());
    assert!(task.started_at_ms <= task.completed_at_ms);
}
