//! Worker runner — the loop that consumes dispatch signals and executes jobs.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing;

use jobhub_core::config::worker::WorkerConfig;
use jobhub_database::RecordStoreManager;
use jobhub_entity::job::DispatchSignal;
use jobhub_queue::QueueManager;

use crate::registry::ProcessorRegistry;

/// A single worker loop instance.
///
/// Each instance is strictly sequential: the next pop does not happen until
/// the current job's processor has returned. Concurrency across jobs comes
/// only from running multiple instances against the same queue, which the
/// queue's atomic pop makes safe.
#[derive(Debug)]
pub struct WorkerRunner {
    /// Dispatch signal source.
    queue: Arc<QueueManager>,
    /// Durable job records.
    records: Arc<RecordStoreManager>,
    /// Processor dispatch table.
    registry: Arc<ProcessorRegistry>,
    /// Worker configuration.
    config: WorkerConfig,
    /// Worker identifier, for logs.
    worker_id: String,
}

impl WorkerRunner {
    /// Create a new worker runner.
    pub fn new(
        queue: Arc<QueueManager>,
        records: Arc<RecordStoreManager>,
        registry: Arc<ProcessorRegistry>,
        config: WorkerConfig,
        worker_id: String,
    ) -> Self {
        Self {
            queue,
            records,
            registry,
            config,
            worker_id,
        }
    }

    /// Run the loop until shutdown is requested on `cancel`.
    ///
    /// The cancellation flag is observed at each iteration boundary; the pop
    /// timeout bounds how long a requested shutdown waits. An in-flight job
    /// always runs to completion.
    pub async fn run(&self, cancel: watch::Receiver<bool>) {
        tracing::info!(
            worker_id = %self.worker_id,
            pop_timeout_seconds = self.config.pop_timeout_seconds,
            "Worker started"
        );

        let pop_timeout = Duration::from_secs(self.config.pop_timeout_seconds);

        loop {
            if *cancel.borrow() {
                break;
            }

            match self.queue.pop_blocking(pop_timeout).await {
                Ok(Some(signal)) => self.handle_signal(signal).await,
                // A pop timeout just means the queue was empty.
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(
                        worker_id = %self.worker_id,
                        error = %e,
                        "Failed to pop dispatch signal"
                    );
                    time::sleep(pop_timeout).await;
                }
            }
        }

        tracing::info!(worker_id = %self.worker_id, "Worker shut down");
    }

    /// Spawn the loop onto the runtime, returning a stop handle.
    pub fn spawn(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            self.run(shutdown_rx).await;
        });
        WorkerHandle {
            shutdown: shutdown_tx,
            handle,
        }
    }

    /// Execute one dispatch signal.
    async fn handle_signal(&self, signal: DispatchSignal) {
        let job_id = signal.id;

        // Untracked signals carry no id and skip all record-store writes.
        if let Some(id) = job_id {
            match self.records.mark_processing(id, Utc::now()).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(
                        worker_id = %self.worker_id,
                        job_id = %id,
                        job_type = %signal.job_type,
                        "Job record is not pending (duplicate or stale signal), skipping"
                    );
                    return;
                }
                Err(e) => {
                    // The record store being unreachable must not stall
                    // execution; the record can end up behind what actually
                    // ran and is left for reconciliation.
                    tracing::error!(
                        worker_id = %self.worker_id,
                        job_id = %id,
                        error = %e,
                        "Failed to mark job as processing"
                    );
                }
            }
        }

        match self.registry.dispatch(&signal.job_type, &signal.job_data).await {
            Ok(()) => {
                if let Some(id) = job_id {
                    if let Err(e) = self.records.mark_completed(id, Utc::now()).await {
                        tracing::error!(
                            worker_id = %self.worker_id,
                            job_id = %id,
                            error = %e,
                            "Failed to mark job as completed"
                        );
                    }
                }
                tracing::info!(
                    worker_id = %self.worker_id,
                    job_id = ?job_id,
                    job_type = %signal.job_type,
                    "Job completed"
                );
            }
            Err(err) => {
                let message = err.to_string();
                if let Some(id) = job_id {
                    if let Err(e) = self.records.mark_failed(id, &message, Utc::now()).await {
                        tracing::error!(
                            worker_id = %self.worker_id,
                            job_id = %id,
                            error = %e,
                            "Failed to mark job as failed"
                        );
                    }
                }
                // A single job failure never terminates the worker.
                tracing::error!(
                    worker_id = %self.worker_id,
                    job_id = ?job_id,
                    job_type = %signal.job_type,
                    error = %message,
                    "Job failed"
                );
            }
        }
    }
}

/// Handle to a spawned worker loop.
#[derive(Debug)]
pub struct WorkerHandle {
    /// Shutdown flag sender.
    shutdown: watch::Sender<bool>,
    /// The running loop task.
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Request cooperative shutdown without waiting for the loop to exit.
    pub fn request_stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Request cooperative shutdown and wait for the loop to exit.
    ///
    /// The in-flight job, if any, finishes first; latency is bounded by the
    /// configured pop timeout.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
