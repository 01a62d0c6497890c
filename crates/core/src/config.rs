// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker configuration shared across engine and adapters.
//!
//! Values are loaded from the environment by the daemon (see lw-daemon's
//! `env` module); everything here carries the documented default.

use std::time::Duration;

/// Which execution backend runs tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Sandboxed worker process spawned per task
    #[default]
    Local,
    /// Session at a remote worker server
    Remote,
}

crate::simple_display! {
    BackendKind {
        Local => "local",
        Remote => "remote",
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(BackendKind::Local),
            "remote" => Ok(BackendKind::Remote),
            other => Err(format!("unknown execution backend: {other}")),
        }
    }
}

/// Tunables for the task lifecycle.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Admission cap: max tasks in queued/running at once
    pub max_concurrent_tasks: usize,
    /// Retention of idempotency records after a task turns terminal
    pub idempotency_window: Duration,
    pub execution_backend: BackendKind,
    /// Per-task execution deadline
    pub execution_timeout: Duration,
    /// Soft-terminate to hard-kill delay (local backend)
    pub execution_grace: Duration,
    /// Soft bound on the serialized workspace document, in characters
    pub workspace_block_limit: usize,
    /// Event-log length that triggers a prune
    pub workspace_max_events: usize,
    pub rooms_enabled: bool,
    /// Sync-mode tool-response window
    pub response_deadline: Duration,
    /// Registry expiry sweep cadence
    pub sweep_interval: Duration,
    /// Retry count for workspace write conflicts
    pub update_retries: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 3,
            idempotency_window: Duration::from_secs(24 * 60 * 60),
            execution_backend: BackendKind::Local,
            execution_timeout: Duration::from_secs(5 * 60),
            execution_grace: Duration::from_secs(5),
            workspace_block_limit: 50_000,
            workspace_max_events: 50,
            rooms_enabled: false,
            response_deadline: Duration::from_secs(25),
            sweep_interval: Duration::from_secs(60 * 60),
            update_retries: 3,
        }
    }
}
