//! Redis queue backend.

pub mod client;
pub mod queue;

pub use client::RedisClient;
pub use queue::RedisQueueStore;
