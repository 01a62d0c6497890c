// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixture for the integration specs.

pub use lw_adapters::docstore::DocumentStore;
pub use lw_adapters::exec::ExecutionAdapter;
pub use lw_adapters::room::RoomBackend;
pub use lw_adapters::{ExecCall, FakeDocumentStore, FakeExecutionAdapter, FakeRoomBackend, RunScript};
pub use lw_core::{
    BrokerConfig, ControlRequest, ControlSignal, EventKind, ExecStatus, FakeClock, TaskEvent,
    TaskId, TaskStatus,
};
pub use lw_engine::{
    ControlHandler, Orchestrator, SubmitError, SubmitRequest, TaskRegistry, WorkspaceManager,
};
pub use std::sync::Arc;
pub use std::time::Duration;

/// A fully wired broker over fake collaborators.
pub struct Broker {
    pub registry: Arc<TaskRegistry<FakeClock>>,
    pub workspaces: Arc<WorkspaceManager<FakeClock>>,
    pub adapter: Arc<FakeExecutionAdapter>,
    pub store: Arc<FakeDocumentStore>,
    pub rooms: Arc<FakeRoomBackend>,
    pub orchestrator: Arc<Orchestrator<FakeClock>>,
    pub control: ControlHandler<FakeClock>,
}

pub fn broker() -> Broker {
    broker_with(BrokerConfig::default())
}

pub fn broker_with(config: BrokerConfig) -> Broker {
    let clock = FakeClock::new();
    let registry = Arc::new(TaskRegistry::new(&config, clock.clone()));
    let adapter = Arc::new(FakeExecutionAdapter::new());
    let store = Arc::new(FakeDocumentStore::new());
    let rooms = Arc::new(FakeRoomBackend::new());
    let workspaces = Arc::new(WorkspaceManager::new(
        Arc::clone(&store) as Arc<dyn DocumentStore>,
        &config,
        clock.clone(),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&registry),
        Arc::clone(&workspaces),
        Arc::clone(&adapter) as Arc<dyn ExecutionAdapter>,
        Arc::clone(&store) as Arc<dyn DocumentStore>,
        Some(Arc::clone(&rooms) as Arc<dyn RoomBackend>),
        config.clone(),
        clock.clone(),
    ));
    let control = ControlHandler::new(
        Arc::clone(&registry),
        Arc::clone(&adapter) as Arc<dyn ExecutionAdapter>,
        Arc::clone(&workspaces),
        Some(Arc::clone(&rooms) as Arc<dyn RoomBackend>),
    );
    Broker { registry, workspaces, adapter, store, rooms, orchestrator, control }
}

/// Poll until the registry shows a terminal status for the task.
pub async fn wait_terminal(broker: &Broker, task_id: &TaskId) -> TaskStatus {
    for _ in 0..1000 {
        if let Some(task) = broker.registry.get(task_id) {
            if task.status.is_terminal() {
                return task.status;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task {task_id} never reached a terminal status");
}

/// Poll until the caller has received at least one notification.
pub async fn wait_notified(broker: &Broker) -> Vec<(String, String)> {
    for _ in 0..1000 {
        let notifications = broker.store.notifications();
        if !notifications.is_empty() {
            return notifications;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("caller never received a notification");
}
