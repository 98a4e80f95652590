//! Record store manager that dispatches to the configured backend.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use jobhub_core::config::records::RecordStoreConfig;
use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_core::types::pagination::{PageRequest, PageResponse};
use jobhub_entity::job::{Job, JobStatus};

use crate::store::JobRecordStore;

/// Record store manager that wraps the configured backend.
///
/// The backend is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct RecordStoreManager {
    /// The inner record store.
    inner: Arc<dyn JobRecordStore>,
}

impl RecordStoreManager {
    /// Create a new record store manager from configuration.
    ///
    /// For the PostgreSQL backend this connects the pool and runs pending
    /// migrations before returning.
    pub async fn new(config: &RecordStoreConfig) -> AppResult<Self> {
        let inner: Arc<dyn JobRecordStore> = match config.provider.as_str() {
            "postgres" => {
                info!("Initializing PostgreSQL record store");
                let pool = crate::postgres::create_pool(&config.postgres).await?;
                crate::migration::run_migrations(&pool).await?;
                Arc::new(crate::postgres::PostgresRecordStore::new(pool))
            }
            "memory" => {
                info!("Initializing in-memory record store");
                Arc::new(crate::memory::MemoryRecordStore::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown record store provider: '{other}'. Supported: postgres, memory"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a manager from an existing store (for testing).
    pub fn from_store(store: Arc<dyn JobRecordStore>) -> Self {
        Self { inner: store }
    }

    /// Insert a fresh record.
    pub async fn insert(&self, job: &Job) -> AppResult<()> {
        self.inner.insert(job).await
    }

    /// Find a record by id.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        self.inner.find_by_id(id).await
    }

    /// List records, newest first.
    pub async fn list(&self, page: &PageRequest) -> AppResult<PageResponse<Job>> {
        self.inner.list(page).await
    }

    /// Transition `pending` → `processing`.
    pub async fn mark_processing(&self, id: Uuid, started_at: DateTime<Utc>) -> AppResult<bool> {
        self.inner.mark_processing(id, started_at).await
    }

    /// Transition `processing` → `completed`.
    pub async fn mark_completed(&self, id: Uuid, completed_at: DateTime<Utc>) -> AppResult<bool> {
        self.inner.mark_completed(id, completed_at).await
    }

    /// Transition `processing` → `failed`.
    pub async fn mark_failed(
        &self,
        id: Uuid,
        error_message: &str,
        completed_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.inner.mark_failed(id, error_message, completed_at).await
    }

    /// Records still `pending` enqueued before `older_than`.
    pub async fn find_stale_pending(&self, older_than: DateTime<Utc>) -> AppResult<Vec<Job>> {
        self.inner.find_stale_pending(older_than).await
    }

    /// Count records in a given status.
    pub async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        self.inner.count_by_status(status).await
    }

    /// Check that the backend is reachable.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
