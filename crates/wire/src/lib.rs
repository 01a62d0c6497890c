// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool protocol for caller communication.
//!
//! Wire format: JSON-RPC 2.0 over HTTP. Tool names are methods; params and
//! results are the typed DTOs in this crate. Domain failures (queue full,
//! task not found, illegal transition) travel as structured objects inside
//! tool results — transport errors alone use the JSON-RPC error member.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod request;
mod response;
mod rpc;

pub use request::{
    ExecuteTaskParams, GetTaskFilesParams, GetTaskHistoryParams, GetTaskStatusParams,
    ListTasksParams, ReadTaskFileParams, SendTaskControlParams, SendTaskMessageParams,
};
pub use response::{
    ControlResult, DomainError, FileContent, FileList, HealthView, MessageAccepted,
    TaskAccepted, TaskHistoryView, TaskStatusView, TaskSummary, CODE_QUEUE_FULL,
    CODE_TASK_NOT_FOUND,
};
pub use rpc::{
    RpcError, RpcRequest, RpcResponse, ERR_BAD_REQUEST, ERR_INTERNAL, ERR_METHOD_NOT_FOUND,
    ERR_PARSE, ERR_UNAUTHORIZED, JSONRPC_VERSION,
};

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
