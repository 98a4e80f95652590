//! JobHub worker daemon.
//!
//! Main entry point that wires the record store, dispatch queue, processor
//! registry, and worker loops together.

use std::sync::Arc;

use tokio::sync::watch;
use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use jobhub_core::config::AppConfig;
use jobhub_core::error::AppError;
use jobhub_database::RecordStoreManager;
use jobhub_queue::QueueManager;
use jobhub_worker::processors::WebhookProcessor;
use jobhub_worker::registry::ProcessorRegistry;
use jobhub_worker::runner::WorkerRunner;
use jobhub_worker::{PendingReconciler, ReconcileScheduler};

#[tokio::main]
async fn main() {
    let env = std::env::var("JOBHUB_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Daemon error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main daemon run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting JobHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Record store (connects + migrates for postgres) ──
    tracing::info!(
        "Initializing record store (provider: {})...",
        config.records.provider
    );
    let records = Arc::new(RecordStoreManager::new(&config.records).await?);
    tracing::info!("Record store initialized");

    // ── Step 2: Dispatch queue ───────────────────────────────────
    tracing::info!(
        "Initializing dispatch queue (provider: {})...",
        config.queue.provider
    );
    let queue = Arc::new(QueueManager::new(&config.queue).await?);
    tracing::info!("Dispatch queue initialized");

    // ── Step 3: Processor registry ───────────────────────────────
    let mut registry = ProcessorRegistry::new();

    let http_client = reqwest::Client::new();
    for target in &config.worker.webhooks {
        registry.register(Arc::new(WebhookProcessor::new(
            target.job_type.clone(),
            target.url.clone(),
            http_client.clone(),
        )));
    }

    // Fail fast when a declared job type has no processor.
    registry.ensure_registered(&config.worker.expected_job_types)?;
    let registry = Arc::new(registry);

    if !config.worker.enabled {
        tracing::info!("Worker disabled, nothing to run");
        return Ok(());
    }

    // ── Step 4: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 5: Reconciliation sweep ─────────────────────────────
    let mut scheduler = if config.worker.reconcile.enabled {
        let reconciler = Arc::new(PendingReconciler::new(
            Arc::clone(&records),
            Arc::clone(&queue),
            config.worker.reconcile.stale_after_seconds,
        ));
        let scheduler = ReconcileScheduler::new(reconciler).await?;
        scheduler.register(&config.worker.reconcile.schedule).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Stale pending reconciliation disabled");
        None
    };

    // ── Step 6: Worker loops ─────────────────────────────────────
    let mut worker_handles = Vec::with_capacity(config.worker.instances);
    for _ in 0..config.worker.instances {
        let worker_id = format!("worker-{}", &uuid::Uuid::new_v4().to_string()[..8]);
        let runner = WorkerRunner::new(
            Arc::clone(&queue),
            Arc::clone(&records),
            Arc::clone(&registry),
            config.worker.clone(),
            worker_id,
        );

        let cancel = shutdown_rx.clone();
        worker_handles.push(tokio::spawn(async move {
            runner.run(cancel).await;
        }));
    }

    tracing::info!(
        instances = config.worker.instances,
        "JobHub worker daemon running"
    );

    // ── Step 7: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            tracing::error!("Scheduler shutdown error: {}", e);
        }
    }

    for handle in worker_handles {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(30), handle).await;
    }

    tracing::info!("JobHub worker daemon shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
