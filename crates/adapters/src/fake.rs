// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake collaborators for engine and integration tests.
//!
//! `FakeExecutionAdapter` replays a scripted run and records every call;
//! `FakeDocumentStore` keeps blocks in memory and can inject write
//! conflicts; `FakeRoomBackend` records messages. All three implement the
//! production capability traits.

use crate::docstore::{BlockRef, DocumentStore, StoreError};
use crate::exec::{ExecError, ExecutionAdapter};
use crate::room::{RoomBackend, RoomError};
use async_trait::async_trait;
use lw_core::{EventKind, ExecStatus, ExecutionRequest, ExecutionResult, TaskEvent, TaskId};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, Notify};

fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

// ── Execution adapter ────────────────────────────────────────────────────────

/// A recorded adapter invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecCall {
    Execute(TaskId),
    Abort(TaskId),
    Pause(TaskId),
    Resume(TaskId),
    SendInput(TaskId, String),
}

/// Scripted behavior for `execute`.
#[derive(Debug, Clone)]
pub struct RunScript {
    /// Progress events emitted between start and the terminal event
    pub events: Vec<TaskEvent>,
    pub status: ExecStatus,
    pub output: String,
    pub error: Option<String>,
    /// Sleep before finishing (simulates a slow runner)
    pub delay: Duration,
    /// Block until `abort` is called, then finish as aborted
    pub hold_for_abort: bool,
    pub pause_ok: bool,
    pub resume_ok: bool,
    /// `send_input` accepted (remote backends) or unsupported (local)
    pub input_ok: bool,
}

impl Default for RunScript {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            status: ExecStatus::Success,
            output: "done".to_string(),
            error: None,
            delay: Duration::ZERO,
            hold_for_abort: false,
            pause_ok: true,
            resume_ok: true,
            input_ok: true,
        }
    }
}

#[derive(Default)]
struct FakeExecInner {
    calls: Vec<ExecCall>,
    active: HashSet<TaskId>,
    abort_notify: HashMap<TaskId, Arc<Notify>>,
    files: Vec<String>,
    file_contents: HashMap<String, String>,
}

/// Execution adapter that replays a [`RunScript`].
#[derive(Default)]
pub struct FakeExecutionAdapter {
    script: Mutex<RunScript>,
    inner: Mutex<FakeExecInner>,
}

impl FakeExecutionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(script: RunScript) -> Self {
        Self { script: Mutex::new(script), inner: Mutex::new(FakeExecInner::default()) }
    }

    pub fn set_script(&self, script: RunScript) {
        *self.script.lock() = script;
    }

    pub fn set_files(&self, files: Vec<String>, contents: HashMap<String, String>) {
        let mut inner = self.inner.lock();
        inner.files = files;
        inner.file_contents = contents;
    }

    pub fn calls(&self) -> Vec<ExecCall> {
        self.inner.lock().calls.clone()
    }

    pub fn execute_count(&self) -> usize {
        self.inner.lock().calls.iter().filter(|c| matches!(c, ExecCall::Execute(_))).count()
    }

    pub fn abort_count(&self) -> usize {
        self.inner.lock().calls.iter().filter(|c| matches!(c, ExecCall::Abort(_))).count()
    }

    /// Wait until a task's execute is underway (registered as active).
    pub async fn wait_active(&self, task_id: &TaskId) {
        for _ in 0..500 {
            if self.inner.lock().active.contains(task_id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl ExecutionAdapter for FakeExecutionAdapter {
    async fn execute(
        &self,
        request: ExecutionRequest,
        events: mpsc::Sender<TaskEvent>,
    ) -> Result<ExecutionResult, ExecError> {
        let script = self.script.lock().clone();
        let started_at_ms = epoch_ms();
        let hold = {
            let mut inner = self.inner.lock();
            inner.calls.push(ExecCall::Execute(request.task_id));
            inner.active.insert(request.task_id);
            if script.hold_for_abort {
                let notify = Arc::new(Notify::new());
                inner.abort_notify.insert(request.task_id, Arc::clone(&notify));
                Some(notify)
            } else {
                None
            }
        };

        let _ = events
            .send(TaskEvent::new(EventKind::Start, epoch_ms(), json!({"raw_type": "fake.start"})))
            .await;
        for event in script.events {
            let _ = events.send(event).await;
        }

        let aborted = match hold {
            Some(notify) => {
                notify.notified().await;
                true
            }
            None => {
                if !script.delay.is_zero() {
                    tokio::time::sleep(script.delay).await;
                }
                false
            }
        };

        {
            let mut inner = self.inner.lock();
            inner.active.remove(&request.task_id);
            inner.abort_notify.remove(&request.task_id);
        }

        let completed_at_ms = epoch_ms();
        let result = if aborted {
            let _ = events
                .send(TaskEvent::new(
                    EventKind::Abort,
                    completed_at_ms,
                    json!({"raw_type": "fake.abort"}),
                ))
                .await;
            ExecutionResult::new(ExecStatus::Error, started_at_ms, completed_at_ms)
                .output(script.output)
                .error("aborted by control signal".to_string())
        } else {
            let (kind, raw_type) = match script.status {
                ExecStatus::Success => (EventKind::Complete, "fake.complete"),
                ExecStatus::Error => (EventKind::Error, "fake.error"),
                ExecStatus::Timeout => (EventKind::Error, "fake.timeout"),
            };
            let _ = events
                .send(TaskEvent::new(kind, completed_at_ms, json!({"raw_type": raw_type})))
                .await;
            let mut result = ExecutionResult::new(script.status, started_at_ms, completed_at_ms)
                .output(script.output);
            result.error = script.error;
            result
        };
        Ok(result)
    }

    async fn abort(&self, task_id: &TaskId) -> bool {
        let notify = {
            let mut inner = self.inner.lock();
            inner.calls.push(ExecCall::Abort(*task_id));
            if !inner.active.contains(task_id) {
                return false;
            }
            inner.abort_notify.get(task_id).cloned()
        };
        if let Some(notify) = notify {
            notify.notify_one();
        }
        true
    }

    async fn pause(&self, task_id: &TaskId) -> bool {
        let ok = self.script.lock().pause_ok;
        let mut inner = self.inner.lock();
        inner.calls.push(ExecCall::Pause(*task_id));
        inner.active.contains(task_id) && ok
    }

    async fn resume(&self, task_id: &TaskId) -> bool {
        let ok = self.script.lock().resume_ok;
        let mut inner = self.inner.lock();
        inner.calls.push(ExecCall::Resume(*task_id));
        inner.active.contains(task_id) && ok
    }

    async fn is_active(&self, task_id: &TaskId) -> bool {
        self.inner.lock().active.contains(task_id)
    }

    async fn send_input(&self, task_id: &TaskId, message: &str) -> Result<(), ExecError> {
        let input_ok = self.script.lock().input_ok;
        let mut inner = self.inner.lock();
        inner.calls.push(ExecCall::SendInput(*task_id, message.to_string()));
        if !input_ok {
            return Err(ExecError::Unsupported("send_input"));
        }
        if inner.active.contains(task_id) {
            Ok(())
        } else {
            Err(ExecError::NotFound(task_id.to_string()))
        }
    }

    async fn list_files(
        &self,
        _task_id: &TaskId,
        _path: Option<&str>,
    ) -> Result<Vec<String>, ExecError> {
        Ok(self.inner.lock().files.clone())
    }

    async fn read_file(&self, task_id: &TaskId, path: &str) -> Result<String, ExecError> {
        self.inner
            .lock()
            .file_contents
            .get(path)
            .cloned()
            .ok_or_else(|| ExecError::NotFound(format!("{task_id}:{path}")))
    }
}

// ── Document store ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Block {
    caller_id: String,
    label: String,
    value: String,
    attached: bool,
}

#[derive(Default)]
struct FakeStoreInner {
    blocks: HashMap<String, Block>,
    next_id: u64,
    notifications: Vec<(String, String)>,
    /// Upcoming writes that fail with Conflict
    conflicts: u32,
    fail_creates: bool,
    fail_notify: bool,
}

/// In-memory document store.
#[derive(Default)]
pub struct FakeDocumentStore {
    inner: Mutex<FakeStoreInner>,
}

impl FakeDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` writes fail with a conflict.
    pub fn inject_conflicts(&self, n: u32) {
        self.inner.lock().conflicts = n;
    }

    pub fn fail_creates(&self, fail: bool) {
        self.inner.lock().fail_creates = fail;
    }

    pub fn fail_notify(&self, fail: bool) {
        self.inner.lock().fail_notify = fail;
    }

    pub fn block_count(&self) -> usize {
        self.inner.lock().blocks.len()
    }

    pub fn value_of(&self, block_id: &str) -> Option<String> {
        self.inner.lock().blocks.get(block_id).map(|b| b.value.clone())
    }

    pub fn is_attached(&self, block_id: &str) -> bool {
        self.inner.lock().blocks.get(block_id).map(|b| b.attached).unwrap_or(false)
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.inner.lock().notifications.clone()
    }
}

#[async_trait]
impl DocumentStore for FakeDocumentStore {
    async fn create_block(
        &self,
        label: &str,
        value: &str,
        _description: &str,
        _limit: usize,
    ) -> Result<String, StoreError> {
        let mut inner = self.inner.lock();
        if inner.fail_creates {
            return Err(StoreError::Request("store unavailable".to_string()));
        }
        inner.next_id += 1;
        let id = format!("blk-{}", inner.next_id);
        inner.blocks.insert(
            id.clone(),
            Block {
                caller_id: String::new(),
                label: label.to_string(),
                value: value.to_string(),
                attached: false,
            },
        );
        Ok(id)
    }

    async fn attach_block(&self, caller_id: &str, block_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        match inner.blocks.get_mut(block_id) {
            Some(block) => {
                block.caller_id = caller_id.to_string();
                block.attached = true;
                Ok(())
            }
            None => Err(StoreError::NotFound(block_id.to_string())),
        }
    }

    async fn read_block(&self, _caller_id: &str, block_id: &str) -> Result<String, StoreError> {
        self.inner
            .lock()
            .blocks
            .get(block_id)
            .map(|b| b.value.clone())
            .ok_or_else(|| StoreError::NotFound(block_id.to_string()))
    }

    async fn write_block(
        &self,
        _caller_id: &str,
        block_id: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.conflicts > 0 {
            inner.conflicts -= 1;
            return Err(StoreError::Conflict);
        }
        match inner.blocks.get_mut(block_id) {
            Some(block) => {
                block.value = value.to_string();
                Ok(())
            }
            None => Err(StoreError::NotFound(block_id.to_string())),
        }
    }

    async fn detach_block(&self, _caller_id: &str, block_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        match inner.blocks.get_mut(block_id) {
            Some(block) => {
                block.attached = false;
                Ok(())
            }
            None => Err(StoreError::NotFound(block_id.to_string())),
        }
    }

    async fn list_blocks(&self, caller_id: &str) -> Result<Vec<BlockRef>, StoreError> {
        Ok(self
            .inner
            .lock()
            .blocks
            .iter()
            .filter(|(_, b)| b.caller_id == caller_id && b.attached)
            .map(|(id, b)| BlockRef { id: id.clone(), label: b.label.clone() })
            .collect())
    }

    async fn notify(&self, caller_id: &str, message: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.fail_notify {
            return Err(StoreError::Request("notify unavailable".to_string()));
        }
        inner.notifications.push((caller_id.to_string(), message.to_string()));
        Ok(())
    }
}

// ── Room backend ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct FakeRoom {
    pub name: String,
    pub topic: String,
    pub members: Vec<String>,
    pub messages: Vec<serde_json::Value>,
    pub archived: bool,
    pub left: bool,
}

#[derive(Default)]
struct FakeRoomInner {
    rooms: HashMap<String, FakeRoom>,
    next_id: u64,
    reject_html: bool,
}

/// In-memory room backend.
#[derive(Default)]
pub struct FakeRoomBackend {
    inner: Mutex<FakeRoomInner>,
}

impl FakeRoomBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_html(&self, reject: bool) {
        self.inner.lock().reject_html = reject;
    }

    pub fn room(&self, room: &str) -> Option<FakeRoom> {
        self.inner.lock().rooms.get(room).cloned()
    }

    pub fn room_count(&self) -> usize {
        self.inner.lock().rooms.len()
    }

    fn with_room<T>(
        &self,
        room: &str,
        f: impl FnOnce(&mut FakeRoom) -> T,
    ) -> Result<T, RoomError> {
        let mut inner = self.inner.lock();
        match inner.rooms.get_mut(room) {
            Some(state) => Ok(f(state)),
            None => Err(RoomError::Request(format!("unknown room: {room}"))),
        }
    }
}

#[async_trait]
impl RoomBackend for FakeRoomBackend {
    async fn create_room(
        &self,
        name: &str,
        topic: &str,
        invitees: &[String],
    ) -> Result<String, RoomError> {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = format!("room-{}", inner.next_id);
        inner.rooms.insert(
            id.clone(),
            FakeRoom {
                name: name.to_string(),
                topic: topic.to_string(),
                members: invitees.to_vec(),
                ..FakeRoom::default()
            },
        );
        Ok(id)
    }

    async fn send_text(&self, room: &str, body: &str) -> Result<(), RoomError> {
        self.with_room(room, |r| {
            r.messages.push(json!({"msgtype": "text", "body": body}));
        })
    }

    async fn send_html(&self, room: &str, html: &str, fallback: &str) -> Result<(), RoomError> {
        let reject = self.inner.lock().reject_html;
        self.with_room(room, |r| {
            if reject {
                r.messages.push(json!({"msgtype": "text", "body": fallback}));
            } else {
                r.messages
                    .push(json!({"msgtype": "html", "formatted_body": html, "body": fallback}));
            }
        })
    }

    async fn send_control(
        &self,
        room: &str,
        task_id: &TaskId,
        control: &str,
        reason: Option<&str>,
    ) -> Result<(), RoomError> {
        self.with_room(room, |r| {
            r.messages.push(json!({
                "msgtype": "control",
                "task_id": task_id,
                "control": control,
                "reason": reason,
            }));
        })
    }

    async fn invite(&self, room: &str, user: &str) -> Result<(), RoomError> {
        self.with_room(room, |r| r.members.push(user.to_string()))
    }

    async fn kick(&self, room: &str, user: &str, _reason: Option<&str>) -> Result<(), RoomError> {
        self.with_room(room, |r| r.members.retain(|m| m != user))
    }

    async fn set_topic(&self, room: &str, topic: &str) -> Result<(), RoomError> {
        self.with_room(room, |r| r.topic = topic.to_string())
    }

    async fn leave(&self, room: &str) -> Result<(), RoomError> {
        self.with_room(room, |r| r.left = true)
    }

    async fn archive(&self, room: &str) -> Result<(), RoomError> {
        self.with_room(room, |r| r.archived = true)
    }
}
