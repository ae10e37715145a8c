// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `missiond`: loads the store, registers agent providers, resumes any
//! runs left active by a previous process, starts the team watcher,
//! and serves the HTTP/WebSocket API.

use std::io::Write as _;
use std::sync::Arc;

use anyhow::Context;
use fs2::FileExt;
use mission_daemon::config::Config;
use mission_daemon::http;
use mission_daemon::AppState;
use mission_engine::{Engine, EventBus};
use mission_provider::{LocalClaudeProvider, ProviderRegistry};
use mission_store::{MissionStore, RunStore};
use mission_watcher::TeamWatcher;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    std::fs::create_dir_all(config.store_root.root()).context("creating store root")?;
    std::fs::create_dir_all(&config.log_dir).context("creating log directory")?;

    let _log_guard = init_logging(&config);

    let lock_file = acquire_single_instance_lock(&config)?;

    info!(port = config.port, root = %config.store_root.root().display(), "starting missiond");

    let claude_provider = Arc::new(LocalClaudeProvider::new(config.store_root.clone()));
    let mut providers = ProviderRegistry::new();
    providers.register("claude-code", claude_provider.clone());

    let bus = EventBus::new();
    let engine = Engine::new(config.store_root.clone(), providers, bus.clone());
    engine.resume_active_runs();

    let watcher = Arc::new(TeamWatcher::new(config.store_root.clone(), bus));
    watcher.clone().spawn();

    let state = AppState {
        engine,
        watcher,
        missions: Arc::new(MissionStore::new(config.store_root.clone())),
        runs: Arc::new(RunStore::new(config.store_root.clone())),
    };

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await.context("binding http listener")?;
    info!(%addr, "listening");

    let serve_task = tokio::spawn(async move { axum::serve(listener, http::router(state)).with_graceful_shutdown(shutdown_signal()).await });

    // A second, independent listener for the same signals: tokio's
    // ctrl_c()/unix signal() both support multiple concurrent waiters.
    shutdown_signal().await;
    info!("shutting down: draining http server, terminating managed children");

    claude_provider.terminate_all_children(std::time::Duration::from_secs(1)).await;

    if tokio::time::timeout(std::time::Duration::from_secs(1), serve_task).await.is_err() {
        tracing::warn!("http server did not drain within 1s, exiting anyway");
    }

    drop(lock_file);
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM, whichever comes first. `axum::serve`
/// waits for in-flight requests to drain once this future completes,
/// then returns control to `main` to sweep managed child processes.
///
/// If a signal handler fails to install, that branch just never fires
/// rather than panicking — the other one still works.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::warn!(error = %e, "failed to install Ctrl-C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

fn init_logging(config: &Config) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "missiond.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking).with_ansi(false)).init();
    guard
}

/// Held for the lifetime of the process; release-on-drop prevents a
/// second `missiond` from managing the same store root concurrently.
fn acquire_single_instance_lock(config: &Config) -> anyhow::Result<std::fs::File> {
    let mut lock_file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&config.lock_path)?;
    lock_file.try_lock_exclusive().context("another missiond instance already holds this store root")?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}
