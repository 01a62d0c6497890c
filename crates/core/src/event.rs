// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized execution events.
//!
//! Backends emit raw events of heterogeneous shape; the normalizer in
//! lw-adapters maps them onto this closed taxonomy before they reach the
//! orchestrator. `Unknown` is an explicit arm — unrecognized raw tags are
//! carried through rather than dropped, so the workspace log stays faithful.

use serde::{Deserialize, Serialize};

/// Internal event taxonomy after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Session or worker started
    Start,
    /// Runner produced output
    Output,
    /// Runner reported an error
    Error,
    /// Runner invoked a tool
    ToolCall,
    /// Runner touched a file
    FileChange,
    /// Terminal: work finished
    Complete,
    /// Terminal: execution aborted
    Abort,
    /// Unrecognized raw event, carried through verbatim
    Unknown,
}

impl EventKind {
    /// Check if this event ends the execution session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::Complete | EventKind::Abort)
    }
}

crate::simple_display! {
    EventKind {
        Start => "start",
        Output => "output",
        Error => "error",
        ToolCall => "tool_call",
        FileChange => "file_change",
        Complete => "complete",
        Abort => "abort",
        Unknown => "unknown",
    }
}

/// A single normalized event observed during execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub timestamp_ms: u64,
    pub kind: EventKind,
    /// Backend-specific payload (raw type tag, output text, tool name, ...)
    #[serde(default)]
    pub data: serde_json::Value,
}

impl TaskEvent {
    pub fn new(kind: EventKind, timestamp_ms: u64, data: serde_json::Value) -> Self {
        Self { timestamp_ms, kind, data }
    }

    /// Short human-readable rendering for the workspace event log.
    pub fn summary(&self) -> String {
        match self.kind {
            EventKind::Output => match self.data.get("text").and_then(|v| v.as_str()) {
                Some(text) => crate::id::short(text, 200).to_string(),
                None => "output".to_string(),
            },
            EventKind::ToolCall => match self.data.get("tool").and_then(|v| v.as_str()) {
                Some(tool) => format!("tool call: {tool}"),
                None => "tool call".to_string(),
            },
            EventKind::FileChange => match self.data.get("path").and_then(|v| v.as_str()) {
                Some(path) => format!("file change: {path}"),
                None => "file change".to_string(),
            },
            EventKind::Error => match self.data.get("message").and_then(|v| v.as_str()) {
                Some(msg) => format!("error: {}", crate::id::short(msg, 200)),
                None => "error".to_string(),
            },
            EventKind::Unknown => match self.data.get("raw_type").and_then(|v| v.as_str()) {
                Some(t) => format!("event: {t}"),
                None => "event".to_string(),
            },
            kind => kind.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
