//! Scorebook engine entrypoint wiring the offline store, remote API client,
//! and background sync tasks.

use std::fs;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scorebook_engine::config::AppConfig;
use scorebook_engine::dao::offline_store::redb::RedbOfflineStore;
use scorebook_engine::remote::http::HttpScoreApi;
use scorebook_engine::services::{network_monitor, sync_service};
use scorebook_engine::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();

    if let Some(parent) = config.offline_db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).context("creating offline store directory")?;
    }

    let store = RedbOfflineStore::open(&config.offline_db_path).context("opening offline store")?;
    let api = HttpScoreApi::new(
        &config.api_base_url,
        config.api_token.as_deref(),
        config.request_timeout,
    )
    .context("building scoring API client")?;

    let state = AppState::new(config, Arc::new(store), Arc::new(api));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let probe = tokio::spawn(network_monitor::run_probe_loop(
        state.clone(),
        shutdown_rx.clone(),
    ));
    let supervisor = tokio::spawn(sync_service::run_sync_supervisor(
        state.clone(),
        shutdown_rx,
    ));

    info!("engine started");
    shutdown_signal().await;
    info!("shutting down");

    // In-flight work finishes; the tasks exit at their next select point.
    let _ = shutdown_tx.send(true);
    let _ = probe.await;
    let _ = supervisor.await;

    Ok(())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the engine down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
