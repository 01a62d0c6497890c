// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    cancel_from_queued = { ControlSignal::Cancel, TaskStatus::Queued, true },
    cancel_from_running = { ControlSignal::Cancel, TaskStatus::Running, true },
    cancel_from_paused = { ControlSignal::Cancel, TaskStatus::Paused, true },
    cancel_from_completed = { ControlSignal::Cancel, TaskStatus::Completed, false },
    cancel_from_cancelled = { ControlSignal::Cancel, TaskStatus::Cancelled, false },
    pause_from_running = { ControlSignal::Pause, TaskStatus::Running, true },
    pause_from_queued = { ControlSignal::Pause, TaskStatus::Queued, false },
    pause_from_paused = { ControlSignal::Pause, TaskStatus::Paused, false },
    resume_from_paused = { ControlSignal::Resume, TaskStatus::Paused, true },
    resume_from_running = { ControlSignal::Resume, TaskStatus::Running, false },
    resume_from_failed = { ControlSignal::Resume, TaskStatus::Failed, false },
)]
fn signal_validity(signal: ControlSignal, from: TaskStatus, expected: bool) {
    assert_eq!(signal.valid_from(from), expected);
}

#[test]
fn target_statuses() {
    assert_eq!(ControlSignal::Cancel.target_status(), TaskStatus::Cancelled);
    assert_eq!(ControlSignal::Pause.target_status(), TaskStatus::Paused);
    assert_eq!(ControlSignal::Resume.target_status(), TaskStatus::Running);
}

#[test]
fn every_valid_signal_is_a_legal_transition() {
    use TaskStatus::*;
    let all = [Queued, Running, Paused, Completed, Failed, Timeout, Cancelled];
    for signal in [ControlSignal::Cancel, ControlSignal::Pause, ControlSignal::Resume] {
        for from in all {
            if signal.valid_from(from) {
                assert!(
                    from.can_transition(signal.target_status()),
                    "{signal} from {from} must be a legal transition"
                );
            }
        }
    }
}

#[test]
fn parses_from_str() {
    assert_eq!("cancel".parse::<ControlSignal>().unwrap(), ControlSignal::Cancel);
    assert_eq!("pause".parse::<ControlSignal>().unwrap(), ControlSignal::Pause);
    assert_eq!("resume".parse::<ControlSignal>().unwrap(), ControlSignal::Resume);
    assert!("stop".parse::<ControlSignal>().is_err());
}

#[test]
fn outcome_constructors() {
    let ok = ControlOutcome::applied(TaskStatus::Running, TaskStatus::Paused);
    assert!(ok.success);
    assert_eq!(ok.new_status, Some(TaskStatus::Paused));

    let bad = ControlOutcome::rejected(TaskStatus::Completed, "Cannot cancel task");
    assert!(!bad.success);
    assert!(bad.new_status.is_none());
    assert_eq!(bad.error.as_deref(), Some("Cannot cancel task"));
}

#[test]
fn serializes_snake_case() {
    assert_eq!(serde_json::to_string(&ControlSignal::Cancel).unwrap(), "\"cancel\"");
}
