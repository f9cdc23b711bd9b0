// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pontis serve` and the one-shot maintenance commands.
//!
//! Serve wires the storage, runtime, and graph clients into the worker and
//! gateway, then runs three background loops (queue drainer, credential
//! refresher, session cleaner) alongside the HTTP server, all bound to one
//! cancellation token for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use pontis_config::{validate_config, validation::validate_secrets, PontisConfig};
use pontis_core::PontisError;
use pontis_gateway::{start_server, AppState};
use pontis_graph::GraphClient;
use pontis_runtime::RuntimeClient;
use pontis_storage::queries::queue;
use pontis_storage::Database;
use pontis_worker::{
    drain, refresh_expiring, sweep_expired_sessions, ExchangeCredentials, Worker,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Runs the `pontis serve` command.
pub async fn run_serve(config: PontisConfig) -> Result<(), PontisError> {
    init_tracing(&config.bridge.log_level);
    info!(name = %config.bridge.name, "starting pontis serve");

    check_config(&config)?;
    if let Err(errors) = validate_secrets(&config) {
        for e in &errors {
            error!(error = %e, "missing required secret");
            eprintln!("error: {e}");
        }
        return Err(PontisError::Config(
            "required secrets missing; see log for details".to_string(),
        ));
    }

    let (db, worker) = build_worker(&config).await?;

    // Crash recovery: claims abandoned by a previous process go straight
    // back to pending.
    let reaped = queue::reap_stale(&db, 0).await?;
    if reaped > 0 {
        warn!(reaped, "recovered abandoned processing claims from previous run");
    }

    let cancel = install_signal_handler();

    spawn_drain_loop(worker.clone(), &config, cancel.clone());
    spawn_refresh_loop(db.clone(), &config, cancel.clone());
    spawn_cleanup_loop(db.clone(), &config, cancel.clone());

    let state = AppState::new(db, worker, Arc::new(config.clone()));
    tokio::select! {
        result = start_server(&config.server.host, config.server.port, state) => result?,
        _ = cancel.cancelled() => {
            info!("gateway shutting down");
        }
    }

    info!("pontis serve shutdown complete");
    Ok(())
}

/// Validate configuration semantics, printing every collected error.
pub fn check_config(config: &PontisConfig) -> Result<(), PontisError> {
    if let Err(errors) = validate_config(config) {
        for e in &errors {
            eprintln!("error: {e}");
        }
        return Err(PontisError::Config(format!(
            "{} configuration error(s)",
            errors.len()
        )));
    }
    Ok(())
}

/// One queue drain pass, reported as JSON on stdout.
pub async fn run_drain_once(
    config: PontisConfig,
    batch_size: Option<u32>,
) -> Result<(), PontisError> {
    init_tracing(&config.bridge.log_level);
    check_config(&config)?;
    let (_db, worker) = build_worker(&config).await?;

    let report = drain(
        &worker,
        batch_size.unwrap_or(config.queue.batch_size),
        config.queue.max_retries,
        config.queue.stale_after_secs,
    )
    .await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report)
            .map_err(|e| PontisError::Internal(e.to_string()))?
    );
    Ok(())
}

/// One credential refresh pass, reported as JSON on stdout.
pub async fn run_refresh_once(config: PontisConfig) -> Result<(), PontisError> {
    init_tracing(&config.bridge.log_level);
    check_config(&config)?;
    let credentials = exchange_credentials(&config).ok_or_else(|| {
        PontisError::Config("graph.client_id and graph.client_secret are required".to_string())
    })?;
    let db = Database::open(&config.storage.database_path).await?;
    let graph = GraphClient::new(config.graph.base_url.clone(), config.graph.send_timeout_secs)?;

    let outcomes = refresh_expiring(
        &db,
        &graph,
        &credentials,
        config.refresh.threshold_days,
        config.refresh.fallback_ttl_days,
    )
    .await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&outcomes)
            .map_err(|e| PontisError::Internal(e.to_string()))?
    );
    Ok(())
}

/// One session sweep, reported on stdout.
pub async fn run_cleanup_once(config: PontisConfig) -> Result<(), PontisError> {
    init_tracing(&config.bridge.log_level);
    check_config(&config)?;
    let db = Database::open(&config.storage.database_path).await?;
    let cleaned = sweep_expired_sessions(&db).await?;
    println!("{}", serde_json::json!({ "cleaned": cleaned }));
    Ok(())
}

async fn build_worker(config: &PontisConfig) -> Result<(Database, Arc<Worker>), PontisError> {
    let db = Database::open(&config.storage.database_path).await?;
    let runtime = RuntimeClient::new(config.runtime.base_url.clone(), config.runtime.timeout_secs)?;
    let graph = GraphClient::new(config.graph.base_url.clone(), config.graph.send_timeout_secs)?;
    let worker = Arc::new(Worker::new(
        db.clone(),
        runtime,
        graph,
        config.runtime.api_key.clone().unwrap_or_default(),
        config.session.ttl_days,
        config.session.history_limit,
    ));
    Ok((db, worker))
}

fn exchange_credentials(config: &PontisConfig) -> Option<ExchangeCredentials> {
    Some(ExchangeCredentials {
        client_id: config.graph.client_id.clone()?,
        client_secret: config.graph.client_secret.clone()?,
    })
}

fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let handler_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
        }
        handler_token.cancel();
    });
    token
}

fn spawn_drain_loop(worker: Arc<Worker>, config: &PontisConfig, cancel: CancellationToken) {
    let batch_size = config.queue.batch_size;
    let max_retries = config.queue.max_retries;
    let stale_after_secs = config.queue.stale_after_secs;
    let interval_secs = config.queue.drain_interval_secs;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        // Skip the first immediate tick.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match drain(&worker, batch_size, max_retries, stale_after_secs).await {
                        Ok(report) if report.processed > 0 => {
                            info!(processed = report.processed, "background drain pass");
                        }
                        Ok(_) => {
                            debug!("background drain pass found nothing to do");
                        }
                        Err(e) => {
                            warn!(error = %e, "background drain pass failed (non-fatal)");
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("drain loop shutting down");
                    break;
                }
            }
        }
    });
    info!(interval_secs, "queue drainer started");
}

fn spawn_refresh_loop(db: Database, config: &PontisConfig, cancel: CancellationToken) {
    let Some(credentials) = exchange_credentials(config) else {
        warn!("credential refresher disabled: graph.client_id/client_secret not configured");
        return;
    };
    let graph = match GraphClient::new(
        config.graph.base_url.clone(),
        config.graph.send_timeout_secs,
    ) {
        Ok(graph) => graph,
        Err(e) => {
            warn!(error = %e, "credential refresher disabled: graph client failed to build");
            return;
        }
    };
    let threshold_days = config.refresh.threshold_days;
    let fallback_ttl_days = config.refresh.fallback_ttl_days;
    let interval_hours = config.refresh.interval_hours;

    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(interval_hours * 3600));
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match refresh_expiring(&db, &graph, &credentials, threshold_days, fallback_ttl_days).await {
                        Ok(outcomes) => {
                            let failed = outcomes.iter().filter(|o| o.status == "error").count();
                            info!(refreshed = outcomes.len() - failed, failed, "credential refresh pass");
                        }
                        Err(e) => {
                            warn!(error = %e, "credential refresh pass failed (non-fatal)");
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("refresh loop shutting down");
                    break;
                }
            }
        }
    });
    info!(interval_hours, "credential refresher started");
}

fn spawn_cleanup_loop(db: Database, config: &PontisConfig, cancel: CancellationToken) {
    let interval_hours = config.session.cleanup_interval_hours;

    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(interval_hours * 3600));
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match sweep_expired_sessions(&db).await {
                        Ok(cleaned) if cleaned > 0 => info!(cleaned, "session cleanup pass"),
                        Ok(_) => debug!("session cleanup pass found nothing to do"),
                        Err(e) => warn!(error = %e, "session cleanup pass failed (non-fatal)"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("cleanup loop shutting down");
                    break;
                }
            }
        }
    });
    info!(interval_hours, "session cleaner started");
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pontis={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
