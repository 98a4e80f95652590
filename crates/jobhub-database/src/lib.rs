//! # jobhub-database
//!
//! Job record store implementations for JobHub. The record store is the
//! durable table of job executions used for audit and status query; workers
//! drive every status transition through it.
//!
//! Two backends are provided:
//!
//! - **postgres**: durable store using [sqlx](https://crates.io/crates/sqlx)
//! - **memory**: in-process store for development and tests
//!
//! The backend is selected at runtime based on configuration.

pub mod memory;
pub mod migration;
pub mod postgres;
pub mod provider;
pub mod store;

pub use provider::RecordStoreManager;
pub use store::JobRecordStore;
