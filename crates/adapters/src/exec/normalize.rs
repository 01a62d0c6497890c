// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event normalizer.
//!
//! Backends emit raw events over an open set of type tags. This module maps
//! them onto the closed [`EventKind`] taxonomy. The critical policy is
//! completion detection: remote servers spell "done" many ways
//! (`session.idle`, `finish-step`, `step_complete`, a `status: "succeeded"`
//! property, ...) and every spelling must fold into `Complete`, or the
//! completion waiter never resolves and the task runs to its deadline.
//!
//! Session correlation is also centralized here: servers put the session id
//! in several places, and events for other sessions must be discarded
//! before normalization.

use lw_core::{EventKind, TaskEvent};
use serde_json::Value;
use smol_str::SmolStr;

/// A backend event before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// Open-set type tag, e.g. `message.part.updated` or `finish-step`
    pub event_type: SmolStr,
    pub properties: Value,
}

impl RawEvent {
    pub fn new(event_type: impl AsRef<str>, properties: Value) -> Self {
        Self { event_type: SmolStr::new(event_type.as_ref()), properties }
    }

    /// Parse a raw event from a server payload shaped `{type, properties?}`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let event_type = value.get("type")?.as_str()?;
        let properties = value.get("properties").cloned().unwrap_or(Value::Null);
        Some(Self::new(event_type, properties))
    }
}

/// Field names a session id may hide behind.
const SESSION_ID_KEYS: &[&str] = &["sessionID", "session_id", "sessionId"];

/// Extract the session id a raw event belongs to, probing the event root,
/// `properties.info`, and `properties.part`.
///
/// Inside `info`/`part` a bare `id` also counts (those sub-objects describe
/// the session itself); at the root it does not — there it names the event.
pub fn session_id_of(raw: &RawEvent) -> Option<String> {
    let props = &raw.properties;
    for (scope, allow_bare_id) in
        [(Some(props), false), (props.get("info"), true), (props.get("part"), true)]
    {
        let Some(scope) = scope else { continue };
        for key in SESSION_ID_KEYS {
            if let Some(id) = scope.get(key).and_then(|v| v.as_str()) {
                return Some(id.to_string());
            }
        }
        if allow_bare_id {
            if let Some(id) = scope.get("id").and_then(|v| v.as_str()) {
                return Some(id.to_string());
            }
        }
    }
    None
}

/// Check whether a raw event belongs to `session_id`.
///
/// Events that carry no session id at all pass — lifecycle broadcasts from
/// single-session servers omit it.
pub fn matches_session(raw: &RawEvent, session_id: &str) -> bool {
    match session_id_of(raw) {
        Some(id) => id == session_id,
        None => true,
    }
}

/// Verdict from the status-bearing property probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusVerdict {
    /// No status-bearing field present
    None,
    /// A field says the work completed
    Complete,
    /// A field says timeout/cancelled/failed — keep the raw type's class
    Failure,
}

const STATUS_KEYS: &[&str] = &["status", "state", "phase", "result"];
const COMPLETE_WORDS: &[&str] = &["complete", "completed", "finished", "success", "succeeded", "done"];
const FAILURE_WORDS: &[&str] = &["timeout", "cancelled", "failed"];

/// Probe `status`/`state`/`phase`/`result` fields, recursing into nested
/// objects (a `result` is often an object with its own `status`).
fn probe_status(props: &Value) -> StatusVerdict {
    let Value::Object(map) = props else {
        return StatusVerdict::None;
    };
    for key in STATUS_KEYS {
        match map.get(*key) {
            Some(Value::String(s)) => {
                let s = s.to_ascii_lowercase();
                if COMPLETE_WORDS.contains(&s.as_str()) {
                    return StatusVerdict::Complete;
                }
                if FAILURE_WORDS.contains(&s.as_str()) {
                    return StatusVerdict::Failure;
                }
            }
            Some(nested @ Value::Object(_)) => match probe_status(nested) {
                StatusVerdict::None => {}
                verdict => return verdict,
            },
            _ => {}
        }
    }
    StatusVerdict::None
}

/// Completion synonyms over the raw type string, case-insensitive.
fn is_completion_type(raw_type: &str) -> bool {
    let t = raw_type.to_ascii_lowercase();
    if matches!(t.as_str(), "session.idle" | "finish" | "finish-step" | "done" | "complete") {
        return true;
    }
    if t.starts_with("finish:") || t.starts_with("finish_") {
        return true;
    }
    if [":finish", ".finish", "_finish", ":complete", ".complete", "_complete"]
        .iter()
        .any(|suffix| t.ends_with(suffix))
    {
        return true;
    }
    if t.contains("session.complete") || t.contains("session.finished") {
        return true;
    }
    if t.contains("complete") && !t.contains("incomplete") {
        return true;
    }
    if t.contains("finished") && !t.contains("unfinished") {
        return true;
    }
    if t.contains("success") && !t.contains("unsuccess") {
        return true;
    }
    false
}

/// Classify a raw event into the internal taxonomy.
pub fn classify(raw: &RawEvent) -> EventKind {
    let t = raw.event_type.to_ascii_lowercase();
    let status = probe_status(&raw.properties);

    // A failure-bearing status field vetoes completion detection so the
    // outer layer observes the failure instead of a false complete.
    if status != StatusVerdict::Failure
        && (is_completion_type(&t) || status == StatusVerdict::Complete)
    {
        return EventKind::Complete;
    }

    if t.contains("abort") || t.contains("cancel") {
        return EventKind::Abort;
    }
    if t.contains("error") || t.contains("fail") {
        return EventKind::Error;
    }
    if t.contains("tool") {
        return EventKind::ToolCall;
    }
    if t.contains("file") {
        return EventKind::FileChange;
    }
    if t.contains("message") || t.contains("output") || t.contains("text") {
        return EventKind::Output;
    }
    if t.contains("start") || t.contains("created") {
        return EventKind::Start;
    }
    EventKind::Unknown
}

/// Normalize a raw event, stamping it with the given timestamp.
///
/// The raw type tag rides along in `data.raw_type` so the workspace log
/// stays faithful to what the backend actually said.
pub fn normalize(raw: &RawEvent, timestamp_ms: u64) -> TaskEvent {
    let kind = classify(raw);
    let mut data = serde_json::Map::new();
    data.insert("raw_type".to_string(), Value::from(raw.event_type.as_str()));
    match &raw.properties {
        Value::Null => {}
        props => {
            if let Some(text) = output_text(props) {
                data.insert("text".to_string(), Value::from(text));
            }
            data.insert("properties".to_string(), props.clone());
        }
    }
    TaskEvent::new(kind, timestamp_ms, Value::Object(data))
}

/// Pull displayable text out of the property bag, wherever the server put it.
fn output_text(props: &Value) -> Option<String> {
    for path in [&["text"][..], &["part", "text"][..], &["message", "text"][..]] {
        let mut cursor = props;
        let mut found = true;
        for key in path {
            match cursor.get(key) {
                Some(next) => cursor = next,
                None => {
                    found = false;
                    break;
                }
            }
        }
        if found {
            if let Some(s) = cursor.as_str() {
                return Some(s.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
