//! Queue manager that dispatches to the configured backend.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use jobhub_core::config::queue::QueueConfig;
use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_entity::job::DispatchSignal;

use crate::store::QueueStore;

/// Queue manager that wraps the configured queue backend.
///
/// The backend is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct QueueManager {
    /// The inner queue store.
    inner: Arc<dyn QueueStore>,
}

impl QueueManager {
    /// Create a new queue manager from configuration.
    pub async fn new(config: &QueueConfig) -> AppResult<Self> {
        let inner: Arc<dyn QueueStore> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis queue backend");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisQueueStore::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory queue backend");
                Arc::new(crate::memory::MemoryQueueStore::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown queue provider: '{other}'. Supported: redis, memory"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a queue manager from an existing store (for testing).
    pub fn from_store(store: Arc<dyn QueueStore>) -> Self {
        Self { inner: store }
    }

    /// Append a signal at the tail of the queue.
    pub async fn push(&self, signal: &DispatchSignal) -> AppResult<()> {
        self.inner.push(signal).await
    }

    /// Remove and return the signal at the head of the queue, waiting up to
    /// `timeout`.
    pub async fn pop_blocking(&self, timeout: Duration) -> AppResult<Option<DispatchSignal>> {
        self.inner.pop_blocking(timeout).await
    }

    /// Number of signals currently waiting.
    pub async fn len(&self) -> AppResult<u64> {
        self.inner.len().await
    }

    /// Check that the queue backend is reachable.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
