//! Background job domain entities.

pub mod model;
pub mod signal;
pub mod status;

pub use model::Job;
pub use signal::DispatchSignal;
pub use status::JobStatus;
