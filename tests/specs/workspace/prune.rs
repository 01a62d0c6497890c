// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S6 — event prune.

use crate::prelude::*;

#[tokio::test]
async fn one_hundred_progress_events_prune_to_the_bound_plus_notice() {
    let config = BrokerConfig { workspace_max_events: 50, ..BrokerConfig::default() };
    let broker = broker_with(config.clone());
    let events: Vec<TaskEvent> = (0..100)
        .map(|n| {
            TaskEvent::new(
                EventKind::Output,
                n as u64,
                serde_json::json!({"text": format!("progress {n}")}),
            )
        })
        .collect();
    broker.adapter.set_script(RunScript { events, ..RunScript::default() });

    let result = broker.orchestrator.submit(SubmitRequest::new("a1", "chatty job")).await.unwrap();
    wait_terminal(&broker, &result.task_id).await;
    wait_notified(&broker).await;

    let doc = broker.workspaces.get("a1", &result.workspace_id.unwrap()).await.unwrap();

    // One synthetic notice at the front, then the newest fifty
    assert_eq!(doc.events.len(), 51);
    assert!(doc.events[0].message.contains("pruned"));
    assert_eq!(doc.events[0].kind, "task_progress");
    for event in &doc.events[1..] {
        assert!(!event.message.contains("pruned"), "only one notice survives");
    }
    // The retained window ends with the terminal event
    assert_eq!(doc.events.last().unwrap().kind, "task_completed");

    // Size stays within the configured soft bound for short events
    assert!(doc.serialized_len() <= config.workspace_block_limit);
}

#[tokio::test]
async fn few_events_are_never_pruned() {
    let broker = broker();
    let result = broker.orchestrator.submit(SubmitRequest::new("a1", "quiet job")).await.unwrap();
    wait_terminal(&broker, &result.task_id).await;
    wait_notified(&broker).await;

    let doc = broker.workspaces.get("a1", &result.workspace_id.unwrap()).await.unwrap();
    assert!(doc.events.len() < 10);
    assert!(doc.events.iter().all(|e| !e.message.contains("pruned")));
}
