//! Stale-pending reconciliation.
//!
//! An enqueue writes the durable record first and pushes the dispatch signal
//! second; the two stores fail independently. A record whose signal was never
//! pushed (or was popped and then lost) stays `pending` forever. The sweep
//! resubmits signals for `pending` records past a deadline, trading the gap
//! for at-least-once delivery — a duplicate signal is neutralized by the
//! record store's pending-only claim.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_database::RecordStoreManager;
use jobhub_queue::QueueManager;

/// Resubmits dispatch signals for stale `pending` records.
#[derive(Debug)]
pub struct PendingReconciler {
    /// Durable job records.
    records: Arc<RecordStoreManager>,
    /// Dispatch signals.
    queue: Arc<QueueManager>,
    /// Age after which a `pending` record counts as stale.
    stale_after: Duration,
}

impl PendingReconciler {
    /// Create a new reconciler.
    pub fn new(
        records: Arc<RecordStoreManager>,
        queue: Arc<QueueManager>,
        stale_after_seconds: u64,
    ) -> Self {
        Self {
            records,
            queue,
            stale_after: Duration::seconds(stale_after_seconds as i64),
        }
    }

    /// Run one sweep. Returns the number of resubmitted signals.
    pub async fn sweep(&self) -> AppResult<u64> {
        let deadline = Utc::now() - self.stale_after;
        let stale = self.records.find_stale_pending(deadline).await?;

        let mut resubmitted = 0u64;
        for job in &stale {
            if let Err(e) = self.queue.push(&job.signal()).await {
                // Queue unreachable; abandon this cycle and retry next sweep.
                tracing::error!(
                    job_id = %job.id,
                    error = %e,
                    "Failed to resubmit stale pending job"
                );
                break;
            }
            tracing::debug!(job_id = %job.id, job_type = %job.job_type, "Resubmitted stale pending job");
            resubmitted += 1;
        }

        if resubmitted > 0 {
            tracing::info!(count = resubmitted, "Resubmitted stale pending jobs");
        }
        Ok(resubmitted)
    }
}

/// Cron-based scheduler for the reconciliation sweep.
pub struct ReconcileScheduler {
    /// The underlying job scheduler.
    scheduler: JobScheduler,
    /// The reconciler run by the schedule.
    reconciler: Arc<PendingReconciler>,
}

impl std::fmt::Debug for ReconcileScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileScheduler").finish()
    }
}

impl ReconcileScheduler {
    /// Create a new scheduler.
    pub async fn new(reconciler: Arc<PendingReconciler>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            reconciler,
        })
    }

    /// Register the sweep on a cron schedule (seconds granularity).
    pub async fn register(&self, schedule: &str) -> Result<(), AppError> {
        let reconciler = Arc::clone(&self.reconciler);
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let reconciler = Arc::clone(&reconciler);
            Box::pin(async move {
                if let Err(e) = reconciler.sweep().await {
                    tracing::error!("Stale pending sweep failed: {}", e);
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create sweep schedule: {}", e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add sweep schedule: {}", e)))?;

        tracing::info!("Registered: stale pending sweep ({})", schedule);
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Reconcile scheduler started");
        Ok(())
    }

    /// Shut down the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Reconcile scheduler shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use uuid::Uuid;

    use jobhub_database::memory::MemoryRecordStore;
    use jobhub_entity::job::Job;
    use jobhub_queue::memory::MemoryQueueStore;

    use super::*;

    #[tokio::test]
    async fn sweep_resubmits_only_stale_pending_records() {
        let records = Arc::new(RecordStoreManager::from_store(Arc::new(
            MemoryRecordStore::new(),
        )));
        let queue = Arc::new(QueueManager::from_store(Arc::new(MemoryQueueStore::new())));

        let mut stale = Job::pending(Uuid::new_v4(), "send-email", serde_json::json!({}));
        stale.enqueued_at = Utc::now() - Duration::minutes(10);
        records.insert(&stale).await.unwrap();

        let fresh = Job::pending(Uuid::new_v4(), "send-email", serde_json::json!({}));
        records.insert(&fresh).await.unwrap();

        let reconciler =
            PendingReconciler::new(Arc::clone(&records), Arc::clone(&queue), 300);
        let resubmitted = reconciler.sweep().await.unwrap();

        assert_eq!(resubmitted, 1);
        assert_eq!(queue.len().await.unwrap(), 1);

        let signal = queue
            .pop_blocking(StdDuration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(signal.id, Some(stale.id));
    }

    #[tokio::test]
    async fn sweep_ignores_non_pending_records() {
        let records = Arc::new(RecordStoreManager::from_store(Arc::new(
            MemoryRecordStore::new(),
        )));
        let queue = Arc::new(QueueManager::from_store(Arc::new(MemoryQueueStore::new())));

        let mut job = Job::pending(Uuid::new_v4(), "send-email", serde_json::json!({}));
        job.enqueued_at = Utc::now() - Duration::minutes(10);
        records.insert(&job).await.unwrap();
        records.mark_processing(job.id, Utc::now()).await.unwrap();

        let reconciler =
            PendingReconciler::new(Arc::clone(&records), Arc::clone(&queue), 300);
        assert_eq!(reconciler.sweep().await.unwrap(), 0);
        assert_eq!(queue.len().await.unwrap(), 0);
    }
}
