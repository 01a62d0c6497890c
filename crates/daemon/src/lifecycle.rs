// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: state dir, single-instance lock, tracing, shutdown.

use crate::env;
use crate::rpc::ToolRouter;
use fs2::FileExt;
use lw_adapters::docstore::{DocumentStore, HttpDocumentStore};
use lw_adapters::exec::{ExecutionAdapter, LocalProcessAdapter, RemoteSessionAdapter};
use lw_adapters::room::{HttpRoomBackend, RoomBackend};
use lw_core::{BackendKind, SystemClock};
use lw_engine::{ControlHandler, Orchestrator, TaskRegistry, WorkspaceManager};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot resolve a state directory (set LW_STATE_DIR or HOME)")]
    NoStateDir,
    #[error("another daemon instance holds the lock at {0}")]
    AlreadyRunning(String),
    #[error("state dir setup failed: {0}")]
    StateDir(String),
    #[error("listener bind failed: {0}")]
    Bind(String),
}

/// Acquire the single-instance lock and record our pid. The lock file is
/// held for the daemon's lifetime; dropping the handle releases it.
pub fn acquire_lock(state_dir: &Path) -> Result<File, LifecycleError> {
    let lock_path = state_dir.join("lwd.lock");
    let mut file = File::options()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| LifecycleError::StateDir(e.to_string()))?;
    file.try_lock_exclusive()
        .map_err(|_| LifecycleError::AlreadyRunning(lock_path.display().to_string()))?;
    let _ = writeln!(file, "{}", std::process::id());
    Ok(file)
}

/// Initialize tracing: env-filtered stderr plus a daily-rolled file in the
/// state dir. Returns the appender guard that must outlive the daemon.
pub fn init_tracing(state_dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let file_appender = tracing_appender::rolling::daily(state_dir.join("logs"), "lwd.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("info")
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();
    guard
}

/// Wire the engine from the environment and run until SIGINT.
pub async fn run() -> Result<(), LifecycleError> {
    let state_dir = env::state_dir()?;
    std::fs::create_dir_all(&state_dir).map_err(|e| LifecycleError::StateDir(e.to_string()))?;
    let _lock = acquire_lock(&state_dir)?;
    let _guard = init_tracing(&state_dir);

    let config = env::broker_config();
    let clock = SystemClock;
    info!(version = env::DAEMON_VERSION, backend = %config.execution_backend, "legwork daemon starting");

    let adapter: Arc<dyn ExecutionAdapter> = match config.execution_backend {
        BackendKind::Local => {
            let mut local =
                LocalProcessAdapter::new(state_dir.join("tasks"), env::runner_cmd())
                    .timeout(config.execution_timeout)
                    .grace(config.execution_grace);
            if let Some(cpu) = env::runner_cpu_secs() {
                local = local.cpu_secs(cpu);
            }
            if let Some(mem) = env::runner_mem_kb() {
                local = local.mem_kb(mem);
            }
            Arc::new(local)
        }
        BackendKind::Remote => {
            let mut remote = RemoteSessionAdapter::new(env::session_server())
                .timeout(config.execution_timeout);
            if let Some(token) = env::session_token() {
                remote = remote.token(token);
            }
            Arc::new(remote)
        }
    };

    let store: Arc<dyn DocumentStore> =
        Arc::new(HttpDocumentStore::new(env::docstore_addr(), env::docstore_token()));
    let rooms: Option<Arc<dyn RoomBackend>> = config
        .rooms_enabled
        .then(|| Arc::new(HttpRoomBackend::new(env::room_addr(), env::room_token())) as Arc<dyn RoomBackend>);

    let registry = Arc::new(TaskRegistry::new(&config, clock.clone()));
    let workspaces = Arc::new(WorkspaceManager::new(Arc::clone(&store), &config, clock.clone()));
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&registry),
        Arc::clone(&workspaces),
        Arc::clone(&adapter),
        Arc::clone(&store),
        rooms.clone(),
        config.clone(),
        clock.clone(),
    ));
    let control = ControlHandler::new(
        Arc::clone(&registry),
        Arc::clone(&adapter),
        Arc::clone(&workspaces),
        rooms.clone(),
    );
    let adapter_ref = Arc::clone(&adapter);
    let router = Arc::new(ToolRouter::new(
        orchestrator,
        Arc::clone(&registry),
        workspaces,
        control,
        adapter,
        rooms,
        config.clone(),
        clock,
    ));

    let shutdown = CancellationToken::new();
    let sweeper = Arc::clone(&registry).spawn_sweeper(config.sweep_interval, shutdown.clone());

    let bind = format!("127.0.0.1:{}", env::http_port());
    let listener =
        TcpListener::bind(&bind).await.map_err(|e| LifecycleError::Bind(e.to_string()))?;
    info!(%bind, "tool surface listening");
    let server = tokio::spawn(crate::listener::serve(
        listener,
        router,
        env::auth_token(),
        shutdown.clone(),
    ));

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "signal handler failed, shutting down");
    }
    info!("shutdown requested");
    shutdown.cancel();

    // Live executions don't survive a restart (the registry is in-memory),
    // so abort them now rather than leaving orphaned workers behind.
    for task in registry.all() {
        if task.status == lw_core::TaskStatus::Running && adapter_ref.abort(&task.id).await {
            info!(task_id = %task.id, "aborted live execution for shutdown");
        }
    }

    let _ = server.await;
    let _ = sweeper.await;
    info!("daemon stopped");
    Ok(())
}
