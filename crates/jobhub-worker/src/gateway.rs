//! Enqueue gateway — the public entrypoint producers call to submit work.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing;
use uuid::Uuid;

use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_database::RecordStoreManager;
use jobhub_entity::job::{DispatchSignal, Job, JobStatus};
use jobhub_queue::QueueManager;

/// Gateway for submitting jobs.
///
/// An enqueue performs two writes: it inserts the durable `pending` record
/// first, then pushes the dispatch signal. The record store is the source of
/// truth — a record-store failure aborts the enqueue before any signal
/// exists, while a queue failure after the record write is survivable
/// because the stale-pending sweep resubmits the signal later.
#[derive(Debug, Clone)]
pub struct EnqueueGateway {
    /// Durable job records.
    records: Arc<RecordStoreManager>,
    /// Dispatch signals.
    queue: Arc<QueueManager>,
}

impl EnqueueGateway {
    /// Create a new gateway.
    pub fn new(records: Arc<RecordStoreManager>, queue: Arc<QueueManager>) -> Self {
        Self { records, queue }
    }

    /// Submit a job for asynchronous execution.
    ///
    /// Returns the freshly generated job id. On error the submission must be
    /// treated as not having happened; the caller may retry.
    pub async fn enqueue(&self, job_type: &str, job_data: serde_json::Value) -> AppResult<Uuid> {
        if job_type.trim().is_empty() {
            return Err(AppError::validation("Job type must not be empty"));
        }

        let job = Job::pending(Uuid::new_v4(), job_type, job_data);
        self.records.insert(&job).await?;

        if let Err(e) = self.queue.push(&job.signal()).await {
            // The pending record is durable; the sweep will resubmit it.
            tracing::error!(
                job_id = %job.id,
                job_type = %job.job_type,
                error = %e,
                "Failed to push dispatch signal, leaving record for reconciliation"
            );
        } else {
            tracing::debug!(job_id = %job.id, job_type = %job.job_type, "Enqueued job");
        }

        Ok(job.id)
    }

    /// Submit a fire-and-forget job that opts out of durable tracking.
    ///
    /// No record is written; the signal carries no id and workers skip all
    /// record-store writes for it.
    pub async fn enqueue_untracked(
        &self,
        job_type: &str,
        job_data: serde_json::Value,
    ) -> AppResult<()> {
        if job_type.trim().is_empty() {
            return Err(AppError::validation("Job type must not be empty"));
        }

        self.queue
            .push(&DispatchSignal::untracked(job_type, job_data))
            .await?;

        tracing::debug!(job_type = %job_type, "Enqueued untracked job");
        Ok(())
    }

    /// Gather queue statistics.
    pub async fn stats(&self) -> AppResult<QueueStats> {
        Ok(QueueStats {
            pending: self.records.count_by_status(JobStatus::Pending).await?,
            processing: self.records.count_by_status(JobStatus::Processing).await?,
            failed: self.records.count_by_status(JobStatus::Failed).await?,
            queued: self.queue.len().await?,
        })
    }
}

/// Queue statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    /// Number of pending job records.
    pub pending: i64,
    /// Number of job records currently processing.
    pub processing: i64,
    /// Number of failed job records.
    pub failed: i64,
    /// Number of dispatch signals waiting in the queue.
    pub queued: u64,
}
