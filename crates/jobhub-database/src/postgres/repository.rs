//! PostgreSQL job record store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use jobhub_core::error::{AppError, ErrorKind};
use jobhub_core::result::AppResult;
use jobhub_core::types::pagination::{PageRequest, PageResponse};
use jobhub_entity::job::{Job, JobStatus};

use crate::store::JobRecordStore;

/// Durable job record store backed by PostgreSQL.
///
/// Status transitions are guarded in SQL (`WHERE status = ...`), so the
/// per-row update is all the locking the state machine needs; concurrent
/// workers updating different job ids never conflict.
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Create a new record store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRecordStore for PostgresRecordStore {
    async fn insert(&self, job: &Job) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO jobs (id, job_type, job_data, status, enqueued_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(job.id)
        .bind(&job.job_type)
        .bind(&job.job_data)
        .bind(job.status)
        .bind(job.enqueued_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert job", e))?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))
    }

    async fn list(&self, page: &PageRequest) -> AppResult<PageResponse<Job>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))?;

        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs ORDER BY enqueued_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list jobs", e))?;

        Ok(PageResponse::new(
            jobs,
            page.page,
            page.page_size,
            total as u64,
        ))
    }

    async fn mark_processing(&self, id: Uuid, started_at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'processing', started_at = $2 \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(started_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark job as processing", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_completed(&self, id: Uuid, completed_at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'completed', completed_at = $2 \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark job as completed", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        error_message: &str,
        completed_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'failed', error_message = $2, completed_at = $3 \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(error_message)
        .bind(completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark job as failed", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_stale_pending(&self, older_than: DateTime<Utc>) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE status = 'pending' AND enqueued_at < $1 \
             ORDER BY enqueued_at ASC",
        )
        .bind(older_than)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find stale pending jobs", e)
        })
    }

    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count jobs by status", e)
            })
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }
}
