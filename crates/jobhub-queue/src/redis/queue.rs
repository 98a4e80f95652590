//! Redis-backed dispatch queue.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use jobhub_core::error::{AppError, ErrorKind};
use jobhub_core::result::AppResult;
use jobhub_entity::job::DispatchSignal;

use super::client::RedisClient;
use crate::store::QueueStore;

/// Name of the dispatch list, relative to the configured key prefix.
const DISPATCH_KEY: &str = "queue:dispatch";

/// Dispatch queue backed by a Redis list.
///
/// Signals are RPUSHed at the tail and BLPOPed from the head, which gives
/// global FIFO order and exactly-one delivery per signal across any number
/// of consumers. A blocking pop occupies the multiplexed connection for its
/// full timeout; give each worker process its own client.
#[derive(Debug, Clone)]
pub struct RedisQueueStore {
    /// Redis client.
    client: RedisClient,
    /// Full key of the dispatch list.
    key: String,
}

impl RedisQueueStore {
    /// Create a new Redis queue store.
    pub fn new(client: RedisClient) -> Self {
        let key = client.prefixed_key(DISPATCH_KEY);
        Self { client, key }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Queue, format!("Redis error: {e}"), e)
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn push(&self, signal: &DispatchSignal) -> AppResult<()> {
        let payload = serde_json::to_string(signal)?;
        let mut conn = self.client.conn_mut();
        let _: i64 = conn.rpush(&self.key, &payload).await.map_err(Self::map_err)?;

        debug!(job_type = %signal.job_type, "Pushed dispatch signal");
        Ok(())
    }

    async fn pop_blocking(&self, timeout: Duration) -> AppResult<Option<DispatchSignal>> {
        let mut conn = self.client.conn_mut();

        // BLPOP returns (key, value) or nil on timeout.
        let popped: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(&self.key)
            .arg(timeout.as_secs_f64())
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;

        match popped {
            Some((_, payload)) => {
                let signal: DispatchSignal = serde_json::from_str(&payload)?;
                debug!(job_type = %signal.job_type, "Popped dispatch signal");
                Ok(Some(signal))
            }
            None => Ok(None),
        }
    }

    async fn len(&self) -> AppResult<u64> {
        let mut conn = self.client.conn_mut();
        let len: u64 = conn.llen(&self.key).await.map_err(Self::map_err)?;
        Ok(len)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
