//! Webhook delivery processor.

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use crate::registry::{Processor, ProcessorError};

/// Delivers a job payload to an external HTTP endpoint.
///
/// One instance is registered per configured `worker.webhooks` target. The
/// payload is POSTed as JSON; a transport error or non-2xx response fails
/// the job.
#[derive(Debug)]
pub struct WebhookProcessor {
    /// Job type this target handles.
    job_type: String,
    /// Endpoint the payload is POSTed to.
    url: String,
    /// Shared HTTP client.
    client: reqwest::Client,
}

impl WebhookProcessor {
    /// Create a new webhook processor.
    pub fn new(
        job_type: impl Into<String>,
        url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            job_type: job_type.into(),
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl Processor for WebhookProcessor {
    fn job_type(&self) -> &str {
        &self.job_type
    }

    async fn process(&self, job_data: &Value) -> Result<(), ProcessorError> {
        tracing::debug!(job_type = %self.job_type, url = %self.url, "Delivering webhook");

        let response = self
            .client
            .post(&self.url)
            .json(job_data)
            .send()
            .await
            .map_err(|e| {
                ProcessorError::Failed(format!("Webhook request to {} failed: {e}", self.url))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProcessorError::Failed(format!(
                "Webhook endpoint {} returned {status}",
                self.url
            )));
        }

        Ok(())
    }
}
