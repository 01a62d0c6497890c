// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S2 — idempotency replay.

use crate::prelude::*;

#[tokio::test]
async fn same_caller_and_key_return_the_original_task() {
    let broker = broker();
    let request = SubmitRequest::new("a1", "x").idempotency_key("k1");

    let first = broker.orchestrator.submit(request.clone()).await.unwrap();
    wait_terminal(&broker, &first.task_id).await;

    let second = broker.orchestrator.submit(request).await.unwrap();

    assert_eq!(second.task_id, first.task_id);
    // One workspace, one execution
    assert_eq!(broker.store.block_count(), 1);
    assert_eq!(broker.adapter.execute_count(), 1);
}

#[tokio::test]
async fn replay_while_still_running_does_not_start_a_second_execution() {
    let broker = broker();
    broker.adapter.set_script(RunScript { hold_for_abort: true, ..RunScript::default() });
    let request = SubmitRequest::new("a1", "long").idempotency_key("k1");

    let first = broker.orchestrator.submit(request.clone()).await.unwrap();
    broker.adapter.wait_active(&first.task_id).await;

    let second = broker.orchestrator.submit(request).await.unwrap();
    assert_eq!(second.task_id, first.task_id);
    assert_eq!(broker.adapter.execute_count(), 1);

    broker.adapter.abort(&first.task_id).await;
    wait_terminal(&broker, &first.task_id).await;
}

#[tokio::test]
async fn different_keys_make_independent_tasks() {
    let broker = broker();
    let first = broker
        .orchestrator
        .submit(SubmitRequest::new("a1", "x").idempotency_key("k1"))
        .await
        .unwrap();
    wait_terminal(&broker, &first.task_id).await;

    let second = broker
        .orchestrator
        .submit(SubmitRequest::new("a1", "x").idempotency_key("k2"))
        .await
        .unwrap();
    wait_terminal(&broker, &second.task_id).await;

    assert_ne!(second.task_id, first.task_id);
    assert_eq!(broker.store.block_count(), 2);
    assert_eq!(broker.adapter.execute_count(), 2);
}
