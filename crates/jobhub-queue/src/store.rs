//! Queue store trait for pluggable dispatch backends.

use std::time::Duration;

use async_trait::async_trait;

use jobhub_core::result::AppResult;
use jobhub_entity::job::DispatchSignal;

/// Trait for dispatch queue backends (Redis or in-memory).
///
/// Signals are dequeued in the exact order they were enqueued. A pop is
/// atomic with respect to all consumers: each signal is delivered to exactly
/// one successful pop, which is what makes running several worker instances
/// against the same queue safe.
#[async_trait]
pub trait QueueStore: Send + Sync + std::fmt::Debug + 'static {
    /// Append a signal at the tail of the queue.
    async fn push(&self, signal: &DispatchSignal) -> AppResult<()>;

    /// Remove and return the signal at the head of the queue.
    ///
    /// Suspends the caller until a signal is available or `timeout` elapses;
    /// a timeout returns `Ok(None)` rather than an error.
    async fn pop_blocking(&self, timeout: Duration) -> AppResult<Option<DispatchSignal>>;

    /// Number of signals currently waiting.
    async fn len(&self) -> AppResult<u64>;

    /// Check that the queue backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
