// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use crate::lifecycle::LifecycleError;
use lw_core::{BackendKind, BrokerConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Daemon version (from Cargo.toml)
pub const DAEMON_VERSION: &str = env!("CARGO_PKG_VERSION");

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.parse::<u64>().ok())
}

fn env_ms(key: &str) -> Option<Duration> {
    env_u64(key).map(Duration::from_millis)
}

/// Resolve state directory: LW_STATE_DIR > XDG_STATE_HOME/legwork > ~/.local/state/legwork
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("LW_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("legwork"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/legwork"))
}

/// HTTP port for the tool surface.
pub fn http_port() -> u16 {
    env_u64("LW_HTTP_PORT").map(|p| p as u16).unwrap_or(8788)
}

/// Bearer token required on /rpc when set.
pub fn auth_token() -> Option<String> {
    std::env::var("LW_AUTH_TOKEN").ok().filter(|s| !s.is_empty())
}

/// Local backend: worker command wrapped per task.
pub fn runner_cmd() -> String {
    std::env::var("LW_RUNNER_CMD").unwrap_or_else(|_| "legwork-runner".to_string())
}

/// Local backend: cpu-seconds cap for the worker, when set.
pub fn runner_cpu_secs() -> Option<u64> {
    env_u64("LW_RUNNER_CPU_SECS")
}

/// Local backend: virtual memory cap in KB for the worker, when set.
pub fn runner_mem_kb() -> Option<u64> {
    env_u64("LW_RUNNER_MEM_KB")
}

/// Remote backend: worker server address.
pub fn session_server() -> String {
    std::env::var("LW_SESSION_SERVER").unwrap_or_else(|_| "127.0.0.1:4096".to_string())
}

/// Remote backend: auth token for the worker server.
pub fn session_token() -> Option<String> {
    std::env::var("LW_SESSION_TOKEN").ok().filter(|s| !s.is_empty())
}

/// Document store address.
pub fn docstore_addr() -> String {
    std::env::var("LW_DOCSTORE_ADDR").unwrap_or_else(|_| "127.0.0.1:8283".to_string())
}

pub fn docstore_token() -> Option<String> {
    std::env::var("LW_DOCSTORE_TOKEN").ok().filter(|s| !s.is_empty())
}

/// Room backend address, when rooms are enabled.
pub fn room_addr() -> String {
    std::env::var("LW_ROOM_ADDR").unwrap_or_else(|_| "127.0.0.1:8008".to_string())
}

pub fn room_token() -> Option<String> {
    std::env::var("LW_ROOM_TOKEN").ok().filter(|s| !s.is_empty())
}

/// Assemble the broker configuration from the environment, with the
/// documented defaults.
pub fn broker_config() -> BrokerConfig {
    let defaults = BrokerConfig::default();
    BrokerConfig {
        max_concurrent_tasks: env_u64("LW_MAX_CONCURRENT_TASKS")
            .map(|n| n as usize)
            .unwrap_or(defaults.max_concurrent_tasks),
        idempotency_window: env_ms("LW_IDEMPOTENCY_WINDOW_MS")
            .unwrap_or(defaults.idempotency_window),
        execution_backend: std::env::var("LW_EXECUTION_BACKEND")
            .ok()
            .and_then(|s| s.parse::<BackendKind>().ok())
            .unwrap_or(defaults.execution_backend),
        execution_timeout: env_ms("LW_EXECUTION_TIMEOUT_MS").unwrap_or(defaults.execution_timeout),
        execution_grace: env_ms("LW_EXECUTION_GRACE_MS").unwrap_or(defaults.execution_grace),
        workspace_block_limit: env_u64("LW_WORKSPACE_BLOCK_LIMIT")
            .map(|n| n as usize)
            .unwrap_or(defaults.workspace_block_limit),
        workspace_max_events: env_u64("LW_WORKSPACE_MAX_EVENTS")
            .map(|n| n as usize)
            .unwrap_or(defaults.workspace_max_events),
        rooms_enabled: std::env::var("LW_ROOMS_ENABLED")
            .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.rooms_enabled),
        response_deadline: env_ms("LW_RESPONSE_DEADLINE_MS").unwrap_or(defaults.response_deadline),
        sweep_interval: env_ms("LW_SWEEP_INTERVAL_MS").unwrap_or(defaults.sweep_interval),
        update_retries: env_u64("LW_UPDATE_RETRIES")
            .map(|n| n as u32)
            .unwrap_or(defaults.update_retries),
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
