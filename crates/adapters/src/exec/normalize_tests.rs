// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

fn raw(t: &str) -> RawEvent {
    RawEvent::new(t, Value::Null)
}

fn raw_with(t: &str, props: Value) -> RawEvent {
    RawEvent::new(t, props)
}

// ── Completion synonyms ──────────────────────────────────────────────────────

#[parameterized(
    session_idle = { "session.idle" },
    finish = { "finish" },
    finish_step = { "finish-step" },
    done = { "done" },
    complete = { "complete" },
    finish_prefix_colon = { "finish:all" },
    finish_prefix_underscore = { "finish_run" },
    finish_suffix_colon = { "run:finish" },
    finish_suffix_dot = { "step.finish" },
    finish_suffix_underscore = { "step_finish" },
    complete_suffix_colon = { "task:complete" },
    complete_suffix_dot = { "task.complete" },
    complete_suffix_underscore = { "task_complete" },
    session_complete_infix = { "server.session.completed.v2" },
    session_finished_infix = { "x.session.finished.y" },
    contains_complete = { "stepCompleted" },
    contains_finished = { "runFinished" },
    contains_success = { "run.successful" },
    uppercase = { "SESSION.IDLE" },
    mixed_case = { "Finish-Step" },
)]
fn completion_types(t: &str) {
    assert_eq!(classify(&raw(t)), EventKind::Complete, "{t} should be complete");
}

#[parameterized(
    incomplete = { "task.incomplete" },
    unfinished = { "run.unfinished" },
    unsuccess = { "run.unsuccessful" },
)]
fn negated_words_are_not_completion(t: &str) {
    assert_ne!(classify(&raw(t)), EventKind::Complete, "{t} must not be complete");
}

// ── Status-bearing properties ────────────────────────────────────────────────

#[parameterized(
    status_complete = { json!({"status": "complete"}) },
    status_completed = { json!({"status": "completed"}) },
    status_finished = { json!({"status": "finished"}) },
    status_success = { json!({"status": "success"}) },
    status_succeeded = { json!({"status": "succeeded"}) },
    status_done = { json!({"status": "done"}) },
    state_done = { json!({"state": "done"}) },
    phase_complete = { json!({"phase": "complete"}) },
    result_success = { json!({"result": "success"}) },
    nested_result = { json!({"result": {"status": "succeeded"}}) },
    uppercase_value = { json!({"status": "DONE"}) },
)]
fn status_fields_mean_completion(props: Value) {
    assert_eq!(classify(&raw_with("session.updated", props)), EventKind::Complete);
}

#[parameterized(
    timeout = { "timeout" },
    cancelled = { "cancelled" },
    failed = { "failed" },
)]
fn failure_status_keeps_raw_class(status: &str) {
    // The raw type would otherwise read as completion; the failure status
    // vetoes it so the outer layer sees the failure.
    let event = raw_with("step.complete", json!({"status": status}));
    assert_ne!(classify(&event), EventKind::Complete);
}

#[test]
fn failure_status_on_neutral_type_is_not_complete() {
    let event = raw_with("session.updated", json!({"status": "failed"}));
    assert_ne!(classify(&event), EventKind::Complete);
}

// ── Other classes ────────────────────────────────────────────────────────────

#[parameterized(
    error = { "session.error", EventKind::Error },
    tool = { "tool.invoked", EventKind::ToolCall },
    file = { "file.edited", EventKind::FileChange },
    message = { "message.part.updated", EventKind::Output },
    output = { "worker.output", EventKind::Output },
    start = { "session.start", EventKind::Start },
    created = { "session.created", EventKind::Start },
    abort = { "session.abort", EventKind::Abort },
    cancel = { "run.cancelled.v2", EventKind::Abort },
    unknown = { "server.heartbeat", EventKind::Unknown },
)]
fn classifies_other_kinds(t: &str, expected: EventKind) {
    assert_eq!(classify(&raw(t)), expected, "{t}");
}

// ── Session correlation ──────────────────────────────────────────────────────

#[parameterized(
    root_camel = { json!({"sessionID": "ses-1"}) },
    root_snake = { json!({"session_id": "ses-1"}) },
    root_lower_camel = { json!({"sessionId": "ses-1"}) },
    info = { json!({"info": {"sessionID": "ses-1"}}) },
    info_id = { json!({"info": {"id": "ses-1"}}) },
    part = { json!({"part": {"sessionID": "ses-1"}}) },
)]
fn session_id_probe(props: Value) {
    let event = raw_with("message.part.updated", props);
    assert_eq!(session_id_of(&event).as_deref(), Some("ses-1"));
    assert!(matches_session(&event, "ses-1"));
    assert!(!matches_session(&event, "ses-2"));
}

#[test]
fn events_without_session_id_pass_correlation() {
    let event = raw("server.heartbeat");
    assert!(session_id_of(&event).is_none());
    assert!(matches_session(&event, "ses-1"));
}

// ── Normalize ────────────────────────────────────────────────────────────────

#[test]
fn normalize_carries_raw_type_and_timestamp() {
    let event = normalize(&raw("session.idle"), 42);
    assert_eq!(event.kind, EventKind::Complete);
    assert_eq!(event.timestamp_ms, 42);
    assert_eq!(event.data["raw_type"], "session.idle");
}

#[test]
fn normalize_extracts_part_text() {
    let event = normalize(
        &raw_with("message.part.updated", json!({"part": {"text": "compiling..."}})),
        1,
    );
    assert_eq!(event.kind, EventKind::Output);
    assert_eq!(event.data["text"], "compiling...");
}

#[test]
fn from_json_requires_type_tag() {
    assert!(RawEvent::from_json(&json!({"properties": {}})).is_none());
    let event = RawEvent::from_json(&json!({"type": "finish", "properties": {"k": 1}})).unwrap();
    assert_eq!(event.event_type, "finish");
    assert_eq!(event.properties["k"], 1);
}
