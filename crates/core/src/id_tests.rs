// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::task::TaskId;

#[test]
fn generated_ids_carry_prefix_and_fixed_length() {
    let id = TaskId::new();
    assert!(id.as_str().starts_with("tsk-"));
    assert_eq!(id.as_str().len(), ID_MAX_LEN);
}

#[test]
fn generated_ids_are_unique() {
    let a = TaskId::new();
    let b = TaskId::new();
    assert_ne!(a, b);
}

#[test]
fn from_string_round_trips() {
    let id = TaskId::from_string("tsk-0123456789abcdefghi");
    assert_eq!(id.as_str(), "tsk-0123456789abcdefghi");
    assert_eq!(id.suffix(), "0123456789abcdefghi");
}

#[test]
fn short_truncates_suffix() {
    let id = TaskId::from_string("tsk-0123456789abcdefghi");
    assert_eq!(id.short(6), "012345");
    assert_eq!(id.short(100), "0123456789abcdefghi");
}

#[test]
fn idbuf_borrow_matches_str_lookup() {
    use std::collections::HashMap;
    let id = TaskId::new();
    let mut map: HashMap<TaskId, u32> = HashMap::new();
    map.insert(id, 7);
    assert_eq!(map.get(id.as_str()).copied(), Some(7));
}

#[test]
fn idbuf_empty_is_empty() {
    assert!(IdBuf::empty().is_empty());
    assert_eq!(IdBuf::empty().as_str(), "");
}

#[test]
fn serde_is_transparent() {
    let id = TaskId::from_string("tsk-abc");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"tsk-abc\"");
    let back: TaskId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn deserialize_rejects_oversized_ids() {
    let long = format!("\"{}\"", "x".repeat(ID_MAX_LEN + 1));
    assert!(serde_json::from_str::<TaskId>(&long).is_err());
}

#[test]
fn short_helper_truncates() {
    assert_eq!(short("hello", 3), "hel");
    assert_eq!(short("hi", 10), "hi");
}
