// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lw-adapters: Outbound collaborators of the Legwork broker.
//!
//! Three families of adapters live here:
//! - execution backends behind the [`exec::ExecutionAdapter`] trait
//!   (a locally spawned worker process, or a session at a remote worker
//!   server), plus the event normalizer both feed through;
//! - the document store client ([`docstore`]) where workspace documents
//!   live as labeled blocks attached to the caller;
//! - the chat-room client ([`room`]) for optional operator observation.
//!
//! Each collaborator is a capability trait so the engine can be constructed
//! with fakes in tests.

pub mod docstore;
pub mod exec;
pub mod http;
pub mod room;

// Test support — only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use docstore::{BlockRef, DocumentStore, HttpDocumentStore, StoreError};
pub use exec::{ExecError, ExecutionAdapter, LocalProcessAdapter, RemoteSessionAdapter};
pub use room::{HttpRoomBackend, RoomBackend, RoomError};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{ExecCall, FakeDocumentStore, FakeExecutionAdapter, FakeRoom, FakeRoomBackend, RunScript};
