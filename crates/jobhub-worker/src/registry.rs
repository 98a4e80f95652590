//! Processor registry — dispatches jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;

/// Trait for job processor implementations.
///
/// Processors are pure functions of the payload. They must not assume any
/// ordering beyond "this payload was dequeued in FIFO order relative to
/// other jobs", and must not assume they run in the same process as the
/// enqueue gateway.
#[async_trait]
pub trait Processor: Send + Sync + std::fmt::Debug {
    /// The job type this processor handles.
    fn job_type(&self) -> &str;

    /// Perform the work for one job.
    async fn process(&self, job_data: &Value) -> Result<(), ProcessorError>;
}

/// Error from job dispatch or execution.
///
/// The `Display` text of the error is what lands in the job record's
/// `error_message`, so variants carry the message verbatim.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// No processor is registered for the job type.
    #[error("No processor registered for job type '{0}'")]
    UnknownJobType(String),

    /// The processor itself failed.
    #[error("{0}")]
    Failed(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// Dispatches jobs to the appropriate processor based on job type.
#[derive(Debug, Default)]
pub struct ProcessorRegistry {
    /// Registered processors by type.
    processors: HashMap<String, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            processors: HashMap::new(),
        }
    }

    /// Register a processor.
    pub fn register(&mut self, processor: Arc<dyn Processor>) {
        let job_type = processor.job_type().to_string();
        tracing::info!("Registered processor for job type '{}'", job_type);
        self.processors.insert(job_type, processor);
    }

    /// Dispatch a job to the processor registered for its type.
    pub async fn dispatch(&self, job_type: &str, job_data: &Value) -> Result<(), ProcessorError> {
        let processor = self
            .processors
            .get(job_type)
            .ok_or_else(|| ProcessorError::UnknownJobType(job_type.to_string()))?;

        processor.process(job_data).await
    }

    /// Check if a processor is registered for a job type.
    pub fn has_processor(&self, job_type: &str) -> bool {
        self.processors.contains_key(job_type)
    }

    /// The list of registered job types.
    pub fn registered_types(&self) -> Vec<String> {
        self.processors.keys().cloned().collect()
    }

    /// Verify that every expected job type has a processor.
    ///
    /// Called at startup so a deployment that declares job types it cannot
    /// handle fails fast instead of failing jobs at runtime.
    pub fn ensure_registered(&self, expected: &[String]) -> AppResult<()> {
        let missing: Vec<&str> = expected
            .iter()
            .filter(|job_type| !self.has_processor(job_type))
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::dispatch(format!(
                "No processor registered for expected job types: {}",
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NoopProcessor {
        job_type: String,
    }

    #[async_trait]
    impl Processor for NoopProcessor {
        fn job_type(&self) -> &str {
            &self.job_type
        }

        async fn process(&self, _job_data: &Value) -> Result<(), ProcessorError> {
            Ok(())
        }
    }

    fn registry_with(job_type: &str) -> ProcessorRegistry {
        let mut registry = ProcessorRegistry::new();
        registry.register(Arc::new(NoopProcessor {
            job_type: job_type.to_string(),
        }));
        registry
    }

    #[tokio::test]
    async fn dispatches_to_the_registered_processor() {
        let registry = registry_with("send-email");
        let result = registry
            .dispatch("send-email", &serde_json::json!({"to": "a@b.com"}))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn unknown_type_error_names_the_type() {
        let registry = registry_with("send-email");
        let err = registry
            .dispatch("render-certificate", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("render-certificate"));
    }

    #[test]
    fn ensure_registered_fails_fast_on_missing_types() {
        let registry = registry_with("send-email");

        registry
            .ensure_registered(&["send-email".to_string()])
            .unwrap();

        let err = registry
            .ensure_registered(&["send-email".to_string(), "video-transcription".to_string()])
            .unwrap_err();
        assert!(err.message.contains("video-transcription"));
    }
}
