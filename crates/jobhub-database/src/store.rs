//! Job record store trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use jobhub_core::result::AppResult;
use jobhub_core::types::pagination::{PageRequest, PageResponse};
use jobhub_entity::job::{Job, JobStatus};

/// Trait for job record store backends (PostgreSQL or in-memory).
///
/// The record store carries the durable truth about every tracked job. All
/// status updates are compare-and-set: they fire only from the expected
/// prior status and report whether a row actually transitioned. That keeps
/// the `pending → processing → completed | failed` state machine
/// one-directional even when a dispatch signal is delivered more than once.
///
/// Records are never deleted by this subsystem; retention is an external
/// concern.
#[async_trait]
pub trait JobRecordStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a fresh record. Fails on a duplicate id.
    async fn insert(&self, job: &Job) -> AppResult<()>;

    /// Find a record by id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>>;

    /// List records, newest first.
    async fn list(&self, page: &PageRequest) -> AppResult<PageResponse<Job>>;

    /// Transition `pending` → `processing` and set `started_at`.
    ///
    /// Returns `false` when the record is missing or not `pending`.
    async fn mark_processing(&self, id: Uuid, started_at: DateTime<Utc>) -> AppResult<bool>;

    /// Transition `processing` → `completed` and set `completed_at`.
    ///
    /// Returns `false` when the record is missing or not `processing`.
    async fn mark_completed(&self, id: Uuid, completed_at: DateTime<Utc>) -> AppResult<bool>;

    /// Transition `processing` → `failed`, recording the error message and
    /// `completed_at`.
    ///
    /// Returns `false` when the record is missing or not `processing`.
    async fn mark_failed(
        &self,
        id: Uuid,
        error_message: &str,
        completed_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Records still `pending` that were enqueued before `older_than`.
    ///
    /// These are candidates for reconciliation: their dispatch signal was
    /// lost or never pushed.
    async fn find_stale_pending(&self, older_than: DateTime<Utc>) -> AppResult<Vec<Job>>;

    /// Count records in a given status.
    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
