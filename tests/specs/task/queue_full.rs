// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S3 — queue full.

use crate::prelude::*;

#[tokio::test]
async fn fourth_submission_is_rejected_without_side_effects() {
    let broker = broker();
    broker.adapter.set_script(RunScript { hold_for_abort: true, ..RunScript::default() });

    let mut ids = Vec::new();
    for n in 0..3 {
        let result = broker
            .orchestrator
            .submit(SubmitRequest::new("a1", format!("job {n}")))
            .await
            .unwrap();
        ids.push(result.task_id);
    }
    for id in &ids {
        broker.adapter.wait_active(id).await;
    }
    assert_eq!(broker.registry.counts().active, 3);
    let blocks_before = broker.store.block_count();

    let rejected = broker.orchestrator.submit(SubmitRequest::new("a1", "one too many")).await;
    assert!(matches!(rejected, Err(SubmitError::QueueFull)));

    // No workspace created, registry count unchanged
    assert_eq!(broker.store.block_count(), blocks_before);
    assert_eq!(broker.registry.counts().total, 3);
    assert_eq!(broker.adapter.execute_count(), 3);

    for id in &ids {
        broker.adapter.abort(id).await;
    }
    for id in &ids {
        wait_terminal(&broker, id).await;
    }
}

#[tokio::test]
async fn slots_free_up_as_tasks_finish() {
    let broker = broker();
    for n in 0..3 {
        let result = broker
            .orchestrator
            .submit(SubmitRequest::new("a1", format!("job {n}")))
            .await
            .unwrap();
        wait_terminal(&broker, &result.task_id).await;
    }
    // All three finished; a fourth is admitted
    let fourth = broker.orchestrator.submit(SubmitRequest::new("a1", "job 3")).await;
    assert!(fourth.is_ok());
}
