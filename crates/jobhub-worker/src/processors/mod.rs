//! Built-in processor implementations.
//!
//! Business logic for individual job types lives with the producing systems;
//! the only processor shipped here is the generic webhook deliverer that
//! forwards a job payload to an external HTTP endpoint.

pub mod webhook;

pub use webhook::WebhookProcessor;
