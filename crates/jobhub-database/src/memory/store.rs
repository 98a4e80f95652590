//! In-memory job record store using dashmap.
//!
//! Keeps nothing across restarts; for development and tests. The transition
//! guards mirror the SQL `WHERE status = ...` clauses of the PostgreSQL
//! backend so both enforce the same state machine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_core::types::pagination::{PageRequest, PageResponse};
use jobhub_entity::job::{Job, JobStatus};

use crate::store::JobRecordStore;

/// In-memory record store.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    jobs: DashMap<Uuid, Job>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
        }
    }
}

#[async_trait]
impl JobRecordStore for MemoryRecordStore {
    async fn insert(&self, job: &Job) -> AppResult<()> {
        match self.jobs.entry(job.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AppError::conflict(format!(
                "Job record {} already exists",
                job.id
            ))),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(job.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        Ok(self.jobs.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list(&self, page: &PageRequest) -> AppResult<PageResponse<Job>> {
        let mut jobs: Vec<Job> = self
            .jobs
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        jobs.sort_by(|a, b| b.enqueued_at.cmp(&a.enqueued_at));

        let total = jobs.len() as u64;
        let items = jobs
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();

        Ok(PageResponse::new(items, page.page, page.page_size, total))
    }

    async fn mark_processing(&self, id: Uuid, started_at: DateTime<Utc>) -> AppResult<bool> {
        Ok(match self.jobs.get_mut(&id) {
            Some(mut entry) if entry.status == JobStatus::Pending => {
                entry.status = JobStatus::Processing;
                entry.started_at = Some(started_at);
                true
            }
            _ => false,
        })
    }

    async fn mark_completed(&self, id: Uuid, completed_at: DateTime<Utc>) -> AppResult<bool> {
        Ok(match self.jobs.get_mut(&id) {
            Some(mut entry) if entry.status == JobStatus::Processing => {
                entry.status = JobStatus::Completed;
                entry.completed_at = Some(completed_at);
                true
            }
            _ => false,
        })
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        error_message: &str,
        completed_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        Ok(match self.jobs.get_mut(&id) {
            Some(mut entry) if entry.status == JobStatus::Processing => {
                entry.status = JobStatus::Failed;
                entry.error_message = Some(error_message.to_string());
                entry.completed_at = Some(completed_at);
                true
            }
            _ => false,
        })
    }

    async fn find_stale_pending(&self, older_than: DateTime<Utc>) -> AppResult<Vec<Job>> {
        let mut stale: Vec<Job> = self
            .jobs
            .iter()
            .filter(|entry| {
                entry.status == JobStatus::Pending && entry.enqueued_at < older_than
            })
            .map(|entry| entry.value().clone())
            .collect();
        stale.sort_by(|a, b| a.enqueued_at.cmp(&b.enqueued_at));
        Ok(stale)
    }

    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| entry.status == status)
            .count() as i64)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
