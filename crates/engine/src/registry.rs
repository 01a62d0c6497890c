// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task registry.
//!
//! Thread-safe in-memory tables with three indexes: task id (primary),
//! `(caller_id, idempotency_key)` for replay detection, and room handle
//! for chat-room lookups. All mutation goes through this API; the inner
//! maps never leave the mutex. Nothing here is persisted — a restart loses
//! in-flight tasks, which is a documented limitation.

use indexmap::IndexMap;
use lw_core::{BrokerConfig, Clock, Task, TaskId, TaskStatus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The concurrency cap is reached; the caller must reject with a
    /// distinct "queue full" error.
    #[error("task queue full")]
    QueueFull,
}

/// Timestamp/field updates that ride along with a status change.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusMeta {
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
}

/// Outcome of `register`: a fresh task or an idempotent replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    New(Task),
    /// The idempotency key resolved to this existing task
    Existing(Task),
}

#[derive(Default)]
struct Tables {
    /// Insertion-ordered so listings read FIFO
    tasks: IndexMap<TaskId, Task>,
    idempotency: HashMap<(String, String), TaskId>,
    rooms: HashMap<String, TaskId>,
}

/// Registry counts for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryCounts {
    /// Tasks holding a concurrency slot (queued or running)
    pub active: usize,
    pub total: usize,
}

pub struct TaskRegistry<C: Clock> {
    max_concurrent: usize,
    idempotency_window: Duration,
    clock: C,
    tables: Mutex<Tables>,
}

impl<C: Clock> TaskRegistry<C> {
    pub fn new(config: &BrokerConfig, clock: C) -> Self {
        Self {
            max_concurrent: config.max_concurrent_tasks,
            idempotency_window: config.idempotency_window,
            clock,
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Check whether a new task fits under the concurrency cap.
    pub fn admit(&self) -> bool {
        let tables = self.tables.lock();
        let active = tables.tasks.values().filter(|t| t.status.holds_slot()).count();
        active < self.max_concurrent
    }

    /// Record a new task, unless the idempotency key resolves to a task the
    /// registry still holds — then that original comes back unchanged.
    ///
    /// Admission is checked under the same lock so concurrent submissions
    /// cannot slip past the cap together. Replays don't consume a slot and
    /// are honored even at capacity.
    pub fn register(
        &self,
        task_id: TaskId,
        caller_id: &str,
        idempotency_key: Option<String>,
    ) -> Result<Registration, RegistryError> {
        let mut tables = self.tables.lock();
        if let Some(key) = &idempotency_key {
            let index_key = (caller_id.to_string(), key.clone());
            if let Some(existing_id) = tables.idempotency.get(&index_key) {
                if let Some(existing) = tables.tasks.get(existing_id) {
                    tracing::debug!(task_id = %existing.id, key = %key, "idempotent replay");
                    return Ok(Registration::Existing(existing.clone()));
                }
                // Task was swept but the record lingered; fall through
                tables.idempotency.remove(&index_key);
            }
        }
        let active = tables.tasks.values().filter(|t| t.status.holds_slot()).count();
        if active >= self.max_concurrent {
            return Err(RegistryError::QueueFull);
        }
        if let Some(key) = &idempotency_key {
            tables.idempotency.insert((caller_id.to_string(), key.clone()), task_id);
        }
        let task = Task::new(task_id, caller_id, idempotency_key, self.clock.epoch_ms());
        tables.tasks.insert(task_id, task.clone());
        Ok(Registration::New(task))
    }

    /// Apply a status transition. Returns `false` without mutating when the
    /// task is unknown or the transition is illegal — a late terminal write
    /// after a cancel lands here and is dropped.
    pub fn update_status(&self, task_id: &TaskId, status: TaskStatus, meta: StatusMeta) -> bool {
        let mut tables = self.tables.lock();
        let Some(task) = tables.tasks.get_mut(task_id) else {
            tracing::debug!(%task_id, %status, "status update for unknown task ignored");
            return false;
        };
        if !task.status.can_transition(status) {
            tracing::debug!(
                %task_id,
                from = %task.status,
                to = %status,
                "illegal status transition ignored"
            );
            return false;
        }
        task.status = status;
        if status == TaskStatus::Running && task.started_at_ms.is_none() {
            task.started_at_ms = Some(meta.started_at_ms.unwrap_or_else(|| self.clock.epoch_ms()));
        }
        if status.is_terminal() && task.completed_at_ms.is_none() {
            task.completed_at_ms =
                Some(meta.completed_at_ms.unwrap_or_else(|| self.clock.epoch_ms()));
        }
        true
    }

    /// Record the workspace id, once.
    pub fn set_workspace(&self, task_id: &TaskId, workspace_id: &str) {
        let mut tables = self.tables.lock();
        if let Some(task) = tables.tasks.get_mut(task_id) {
            if task.workspace_id.is_none() {
                task.workspace_id = Some(workspace_id.to_string());
            }
        }
    }

    pub fn attach_room(&self, task_id: &TaskId, room: &str) {
        let mut guard = self.tables.lock();
        let tables = &mut *guard;
        if let Some(task) = tables.tasks.get_mut(task_id) {
            if task.room.is_none() {
                task.room = Some(room.to_string());
                tables.rooms.insert(room.to_string(), *task_id);
            }
        }
    }

    pub fn detach_room(&self, task_id: &TaskId) {
        let mut guard = self.tables.lock();
        let tables = &mut *guard;
        if let Some(task) = tables.tasks.get_mut(task_id) {
            if let Some(room) = task.room.take() {
                tables.rooms.remove(&room);
            }
        }
    }

    pub fn get(&self, task_id: &TaskId) -> Option<Task> {
        self.tables.lock().tasks.get(task_id).cloned()
    }

    pub fn all(&self) -> Vec<Task> {
        self.tables.lock().tasks.values().cloned().collect()
    }

    pub fn by_caller(&self, caller_id: &str) -> Vec<Task> {
        self.tables
            .lock()
            .tasks
            .values()
            .filter(|t| t.caller_id == caller_id)
            .cloned()
            .collect()
    }

    pub fn by_room(&self, room: &str) -> Option<Task> {
        let tables = self.tables.lock();
        let task_id = tables.rooms.get(room)?;
        tables.tasks.get(task_id).cloned()
    }

    pub fn counts(&self) -> RegistryCounts {
        let tables = self.tables.lock();
        RegistryCounts {
            active: tables.tasks.values().filter(|t| t.status.holds_slot()).count(),
            total: tables.tasks.len(),
        }
    }

    /// Drop terminal tasks whose completion fell outside the idempotency
    /// window, along with their idempotency and room records. Returns how
    /// many tasks were removed.
    pub fn sweep(&self) -> usize {
        let now_ms = self.clock.epoch_ms();
        let window_ms = self.idempotency_window.as_millis() as u64;
        let mut tables = self.tables.lock();
        let expired: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| {
                t.status.is_terminal()
                    && t.completed_at_ms
                        .map(|done| now_ms.saturating_sub(done) > window_ms)
                        .unwrap_or(false)
            })
            .cloned()
            .collect();
        for task in &expired {
            tables.tasks.shift_remove(&task.id);
            if let Some(key) = &task.idempotency_key {
                tables.idempotency.remove(&(task.caller_id.clone(), key.clone()));
            }
            if let Some(room) = &task.room {
                tables.rooms.remove(room);
            }
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "swept expired tasks");
        }
        expired.len()
    }

    /// Run the expiry sweep on a ticker until cancelled.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let registry = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // interval fires immediately; skip that first tick
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        registry.sweep();
                    }
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
