//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::signal::DispatchSignal;
use super::status::JobStatus;

/// A background job record.
///
/// This is the durable, queryable row describing one unit of work's full
/// lifecycle. The dispatch queue only carries the transient
/// [`DispatchSignal`]; the record is the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique job identifier, generated at enqueue time.
    pub id: Uuid,
    /// Job type identifier (e.g., `"send-email"`, `"video-transcription"`).
    pub job_type: String,
    /// Processor-specific payload (JSON).
    pub job_data: serde_json::Value,
    /// Current job status.
    pub status: JobStatus,
    /// Error message, set only on failure.
    pub error_message: Option<String>,
    /// When the job was enqueued.
    pub enqueued_at: DateTime<Utc>,
    /// When a worker started executing the job.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Build a fresh `pending` record for an enqueue.
    pub fn pending(id: Uuid, job_type: impl Into<String>, job_data: serde_json::Value) -> Self {
        Self {
            id,
            job_type: job_type.into(),
            job_data,
            status: JobStatus::Pending,
            error_message: None,
            enqueued_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// The dispatch signal that wakes a worker for this record.
    pub fn signal(&self) -> DispatchSignal {
        DispatchSignal::tracked(self.id, self.job_type.clone(), self.job_data.clone())
    }
}
