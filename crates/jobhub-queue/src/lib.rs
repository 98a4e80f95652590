//! # jobhub-queue
//!
//! Dispatch queue implementations for JobHub. The queue store is a FIFO list
//! of transient dispatch signals; it carries no durable history. Two
//! backends are supported:
//!
//! - **redis**: a Redis list (RPUSH/BLPOP) using the [redis](https://crates.io/crates/redis) crate
//! - **memory**: an in-process list for development and tests
//!
//! The backend is selected at runtime based on configuration.

#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;
pub mod store;

pub use provider::QueueManager;
pub use store::QueueStore;
