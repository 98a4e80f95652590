//! Worker loop configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of worker loop instances to run in this process.
    ///
    /// Each instance is strictly sequential; concurrency across jobs comes
    /// only from running more instances.
    #[serde(default = "default_instances")]
    pub instances: usize,
    /// Maximum time in seconds a blocking queue pop waits before the loop
    /// re-checks the shutdown signal.
    #[serde(default = "default_pop_timeout")]
    pub pop_timeout_seconds: u64,
    /// Job types the deployment declares it will enqueue. Startup fails if
    /// any of these has no registered processor.
    #[serde(default)]
    pub expected_job_types: Vec<String>,
    /// Webhook delivery targets registered as processors at startup.
    #[serde(default)]
    pub webhooks: Vec<WebhookTarget>,
    /// Stale-pending reconciliation settings.
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            instances: default_instances(),
            pop_timeout_seconds: default_pop_timeout(),
            expected_job_types: Vec::new(),
            webhooks: Vec::new(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

/// A job type delivered to an external HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookTarget {
    /// Job type this target handles.
    pub job_type: String,
    /// Endpoint the job payload is POSTed to.
    pub url: String,
}

/// Configuration for the stale-pending reconciliation sweep.
///
/// The sweep re-submits dispatch signals for records that stayed `pending`
/// past the deadline, closing the gap left by a queue push that failed after
/// the record write succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Whether the sweep runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron schedule for the sweep (seconds granularity).
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// Age in seconds after which a `pending` record counts as stale.
    #[serde(default = "default_stale_after")]
    pub stale_after_seconds: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule: default_schedule(),
            stale_after_seconds: default_stale_after(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_instances() -> usize {
    1
}

fn default_pop_timeout() -> u64 {
    5
}

fn default_schedule() -> String {
    // Every minute, on the minute.
    "0 * * * * *".to_string()
}

fn default_stale_after() -> u64 {
    300
}
