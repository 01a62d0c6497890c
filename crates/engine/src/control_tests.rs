// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lw_adapters::{ExecCall, FakeDocumentStore, FakeExecutionAdapter, FakeRoomBackend, RunScript};
use lw_core::{BrokerConfig, FakeClock, TaskId, TaskStatus};

struct Fixture {
    registry: Arc<TaskRegistry<FakeClock>>,
    adapter: Arc<FakeExecutionAdapter>,
    store: Arc<FakeDocumentStore>,
    rooms: Arc<FakeRoomBackend>,
    handler: ControlHandler<FakeClock>,
    workspaces: Arc<WorkspaceManager<FakeClock>>,
}

fn fixture() -> Fixture {
    let clock = FakeClock::new();
    let config = BrokerConfig::default();
    let registry = Arc::new(TaskRegistry::new(&config, clock.clone()));
    let adapter = Arc::new(FakeExecutionAdapter::new());
    let store = Arc::new(FakeDocumentStore::new());
    let rooms = Arc::new(FakeRoomBackend::new());
    let workspaces = Arc::new(WorkspaceManager::new(
        Arc::clone(&store) as Arc<dyn lw_adapters::DocumentStore>,
        &config,
        clock.clone(),
    ));
    let handler = ControlHandler::new(
        Arc::clone(&registry),
        Arc::clone(&adapter) as Arc<dyn ExecutionAdapter>,
        Arc::clone(&workspaces),
        Some(Arc::clone(&rooms) as Arc<dyn RoomBackend>),
    );
    Fixture { registry, adapter, store, rooms, handler, workspaces }
}

async fn running_task(fx: &Fixture) -> TaskId {
    let id = TaskId::new();
    fx.registry.register(id, "a1", None).unwrap();
    let (workspace_id, _) = fx.workspaces.create(id, "a1", None).await.unwrap();
    fx.registry.set_workspace(&id, &workspace_id);
    fx.registry.update_status(&id, TaskStatus::Running, crate::registry::StatusMeta::default());
    id
}

fn request(id: TaskId, signal: ControlSignal) -> ControlRequest {
    ControlRequest { task_id: id, signal, reason: Some("because".into()), requested_by: "a1".into() }
}

// ── Rejections ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_task_is_an_error() {
    let fx = fixture();
    let result = fx.handler.handle(request(TaskId::new(), ControlSignal::Cancel)).await;
    assert!(matches!(result, Err(ControlError::UnknownTask(_))));
}

#[tokio::test]
async fn terminal_task_rejects_all_signals_without_mutation() {
    let fx = fixture();
    let id = running_task(&fx).await;
    fx.registry.update_status(&id, TaskStatus::Completed, crate::registry::StatusMeta::default());

    for signal in [ControlSignal::Cancel, ControlSignal::Pause, ControlSignal::Resume] {
        let outcome = fx.handler.handle(request(id, signal)).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.previous_status, TaskStatus::Completed);
        assert_eq!(
            outcome.error.as_deref(),
            Some(format!("Cannot {signal} task with status: completed").as_str())
        );
        assert_eq!(fx.registry.get(&id).unwrap().status, TaskStatus::Completed);
    }
}

#[tokio::test]
async fn pause_from_queued_is_rejected() {
    let fx = fixture();
    let id = TaskId::new();
    fx.registry.register(id, "a1", None).unwrap();
    let outcome = fx.handler.handle(request(id, ControlSignal::Pause)).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Cannot pause task with status: queued"));
}

#[tokio::test]
async fn live_backend_refusal_keeps_the_old_status() {
    let fx = fixture();
    // Remote-style backend: pause unsupported while the session stays live
    fx.adapter.set_script(RunScript {
        hold_for_abort: true,
        pause_ok: false,
        ..RunScript::default()
    });
    let id = running_task(&fx).await;
    let (tx, _rx) = tokio::sync::mpsc::channel(16);
    let run = tokio::spawn({
        let adapter = Arc::clone(&fx.adapter);
        let req = lw_core::ExecutionRequest::new(id, "a1", "x");
        async move { adapter.execute(req, tx).await }
    });
    fx.adapter.wait_active(&id).await;

    let outcome = fx.handler.handle(request(id, ControlSignal::Pause)).await.unwrap();
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("Backend rejected pause"));
    assert_eq!(fx.registry.get(&id).unwrap().status, TaskStatus::Running);

    assert!(fx.adapter.abort(&id).await);
    run.await.unwrap().unwrap();
}

// ── Applications ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn cancel_of_inactive_task_still_commits() {
    let fx = fixture();
    let id = running_task(&fx).await;
    // Adapter does not track the task (e.g. queued or already wound down)
    let outcome = fx.handler.handle(request(id, ControlSignal::Cancel)).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.previous_status, TaskStatus::Running);
    assert_eq!(outcome.new_status, Some(TaskStatus::Cancelled));
    assert_eq!(fx.registry.get(&id).unwrap().status, TaskStatus::Cancelled);
    assert_eq!(fx.adapter.abort_count(), 1);
}

#[tokio::test]
async fn cancel_while_running_aborts_once_and_records_the_event() {
    let fx = fixture();
    fx.adapter.set_script(RunScript { hold_for_abort: true, ..RunScript::default() });
    let id = running_task(&fx).await;
    let (tx, _rx) = tokio::sync::mpsc::channel(16);
    let run = tokio::spawn({
        let adapter = Arc::clone(&fx.adapter);
        let req = lw_core::ExecutionRequest::new(id, "a1", "x");
        async move { adapter.execute(req, tx).await }
    });
    fx.adapter.wait_active(&id).await;

    let outcome = fx.handler.handle(request(id, ControlSignal::Cancel)).await.unwrap();
    assert!(outcome.success);
    assert_eq!(fx.adapter.abort_count(), 1);
    assert_eq!(fx.registry.get(&id).unwrap().status, TaskStatus::Cancelled);

    // Workspace gained the control event with the reason
    let workspace_id = fx.registry.get(&id).unwrap().workspace_id.unwrap();
    let doc = fx.workspaces.get("a1", &workspace_id).await.unwrap();
    let cancel_event = doc.events.iter().find(|e| e.kind == "task_cancelled").unwrap();
    assert!(cancel_event.message.contains("because"));

    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn pause_then_resume_round_trip() {
    let fx = fixture();
    fx.adapter.set_script(RunScript { hold_for_abort: true, ..RunScript::default() });
    let id = running_task(&fx).await;
    let (tx, _rx) = tokio::sync::mpsc::channel(16);
    let run = tokio::spawn({
        let adapter = Arc::clone(&fx.adapter);
        let req = lw_core::ExecutionRequest::new(id, "a1", "x");
        async move { adapter.execute(req, tx).await }
    });
    fx.adapter.wait_active(&id).await;

    let paused = fx.handler.handle(request(id, ControlSignal::Pause)).await.unwrap();
    assert!(paused.success);
    assert_eq!(fx.registry.get(&id).unwrap().status, TaskStatus::Paused);

    let resumed = fx.handler.handle(request(id, ControlSignal::Resume)).await.unwrap();
    assert!(resumed.success);
    assert_eq!(fx.registry.get(&id).unwrap().status, TaskStatus::Running);

    let calls = fx.adapter.calls();
    assert!(calls.contains(&ExecCall::Pause(id)));
    assert!(calls.contains(&ExecCall::Resume(id)));

    assert!(fx.adapter.abort(&id).await);
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn room_mirror_receives_the_control_message() {
    let fx = fixture();
    let id = running_task(&fx).await;
    let room = fx.rooms.create_room("task", "t", &[]).await.unwrap();
    fx.registry.attach_room(&id, &room);

    fx.handler.handle(request(id, ControlSignal::Cancel)).await.unwrap();

    let messages = fx.rooms.room(&room).unwrap().messages;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["msgtype"], "control");
    assert_eq!(messages[0]["control"], "cancel");
    assert_eq!(messages[0]["reason"], "because");
}

#[tokio::test]
async fn workspace_failure_does_not_flip_success() {
    let fx = fixture();
    let id = running_task(&fx).await;
    // Make every workspace write conflict past the retry bound
    fx.store.inject_conflicts(100);

    let outcome = fx.handler.handle(request(id, ControlSignal::Cancel)).await.unwrap();
    assert!(outcome.success);
    assert_eq!(fx.registry.get(&id).unwrap().status, TaskStatus::Cancelled);
}
