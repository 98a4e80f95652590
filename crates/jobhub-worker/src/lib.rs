//! Background job processing for JobHub.
//!
//! This crate provides:
//! - The enqueue gateway producers call to submit work
//! - A worker runner that consumes dispatch signals and executes jobs
//! - A processor registry that dispatches jobs to the correct handler
//! - A reconciliation sweep that resubmits stale pending records

pub mod gateway;
pub mod processors;
pub mod reconciler;
pub mod registry;
pub mod runner;

pub use gateway::EnqueueGateway;
pub use reconciler::{PendingReconciler, ReconcileScheduler};
pub use registry::{Processor, ProcessorError, ProcessorRegistry};
pub use runner::{WorkerHandle, WorkerRunner};
