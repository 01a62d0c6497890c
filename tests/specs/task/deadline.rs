// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S5 — completion after the response deadline.

use crate::prelude::*;

#[tokio::test]
async fn sync_response_splits_and_background_work_still_completes() {
    let config = BrokerConfig {
        response_deadline: Duration::from_millis(50),
        ..BrokerConfig::default()
    };
    let broker = broker_with(config);
    broker.adapter.set_script(RunScript {
        delay: Duration::from_millis(500),
        output: "slow but done".to_string(),
        ..RunScript::default()
    });

    let request = SubmitRequest::new("a1", "a 60s task").sync(true);
    let result = broker.orchestrator.submit(request).await.unwrap();

    // The timer won: interim response, work continues
    assert_eq!(result.status, TaskStatus::Running);
    assert_eq!(result.timeout_hint.as_deref(), Some("task continues in background"));

    // The async body is not cancelled by the race and reaches terminal
    assert_eq!(wait_terminal(&broker, &result.task_id).await, TaskStatus::Completed);
    wait_notified(&broker).await;

    let doc = broker.workspaces.get("a1", &result.workspace_id.unwrap()).await.unwrap();
    assert_eq!(doc.status, TaskStatus::Completed);
    assert!(doc.events.iter().any(|e| e.kind == "task_completed"));
}

#[tokio::test]
async fn sync_response_returns_the_final_status_when_the_body_wins() {
    let broker = broker();
    let request = SubmitRequest::new("a1", "quick").sync(true);
    let result = broker.orchestrator.submit(request).await.unwrap();

    assert_eq!(result.status, TaskStatus::Completed);
    assert!(result.timeout_hint.is_none());
    assert!(result.message.unwrap().contains("completed"));
}
