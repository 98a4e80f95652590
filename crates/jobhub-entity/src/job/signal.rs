//! Dispatch signal carried by the queue store.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The minimal message pushed through the queue store to wake a worker.
///
/// A signal without an `id` belongs to a fire-and-forget job that opted out
/// of durable tracking; workers skip all record-store writes for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSignal {
    /// Record id, absent for untracked jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Job type used for processor dispatch.
    pub job_type: String,
    /// Processor-specific payload.
    pub job_data: serde_json::Value,
}

impl DispatchSignal {
    /// Signal for a durably tracked job.
    pub fn tracked(id: Uuid, job_type: impl Into<String>, job_data: serde_json::Value) -> Self {
        Self {
            id: Some(id),
            job_type: job_type.into(),
            job_data,
        }
    }

    /// Signal for a fire-and-forget job with no record.
    pub fn untracked(job_type: impl Into<String>, job_data: serde_json::Value) -> Self {
        Self {
            id: None,
            job_type: job_type.into(),
            job_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untracked_signal_omits_id_on_the_wire() {
        let signal = DispatchSignal::untracked("send-email", serde_json::json!({"to": "a@b.com"}));
        let wire = serde_json::to_string(&signal).unwrap();
        assert!(!wire.contains("\"id\""));

        let decoded: DispatchSignal = serde_json::from_str(&wire).unwrap();
        assert_eq!(decoded, signal);
    }
}
