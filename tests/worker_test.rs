//! End-to-end worker tests over the in-memory backends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use jobhub_core::config::worker::WorkerConfig;
use jobhub_database::RecordStoreManager;
use jobhub_database::memory::MemoryRecordStore;
use jobhub_entity::job::{Job, JobStatus};
use jobhub_queue::QueueManager;
use jobhub_queue::memory::MemoryQueueStore;
use jobhub_worker::gateway::EnqueueGateway;
use jobhub_worker::registry::{Processor, ProcessorError, ProcessorRegistry};
use jobhub_worker::runner::{WorkerHandle, WorkerRunner};
use jobhub_worker::PendingReconciler;

/// Processor that records every payload it sees.
#[derive(Debug, Default)]
struct RecordingProcessor {
    seen: Mutex<Vec<Value>>,
}

impl RecordingProcessor {
    fn seen(&self) -> Vec<Value> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Processor for RecordingProcessor {
    fn job_type(&self) -> &str {
        "send-email"
    }

    async fn process(&self, job_data: &Value) -> Result<(), ProcessorError> {
        self.seen.lock().unwrap().push(job_data.clone());
        Ok(())
    }
}

/// Processor that always fails with a fixed message.
#[derive(Debug)]
struct FailingProcessor {
    job_type: &'static str,
    message: &'static str,
}

#[async_trait]
impl Processor for FailingProcessor {
    fn job_type(&self) -> &str {
        self.job_type
    }

    async fn process(&self, _job_data: &Value) -> Result<(), ProcessorError> {
        Err(ProcessorError::Failed(self.message.to_string()))
    }
}

struct TestHarness {
    records: Arc<RecordStoreManager>,
    queue: Arc<QueueManager>,
    registry: Arc<ProcessorRegistry>,
    gateway: EnqueueGateway,
}

impl TestHarness {
    fn new(registry: ProcessorRegistry) -> Self {
        let records = Arc::new(RecordStoreManager::from_store(Arc::new(
            MemoryRecordStore::new(),
        )));
        let queue = Arc::new(QueueManager::from_store(Arc::new(MemoryQueueStore::new())));
        let gateway = EnqueueGateway::new(Arc::clone(&records), Arc::clone(&queue));
        Self {
            records,
            queue,
            registry: Arc::new(registry),
            gateway,
        }
    }

    fn spawn_worker(&self, worker_id: &str) -> WorkerHandle {
        let config = WorkerConfig {
            pop_timeout_seconds: 1,
            ..WorkerConfig::default()
        };
        WorkerRunner::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.records),
            Arc::clone(&self.registry),
            config,
            worker_id.to_string(),
        )
        .spawn()
    }

    /// Poll until the record reaches a terminal status.
    async fn wait_for_terminal(&self, id: Uuid) -> Job {
        for _ in 0..500 {
            if let Some(job) = self.records.find_by_id(id).await.unwrap() {
                if job.status.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} did not reach a terminal status in time");
    }
}

#[tokio::test]
async fn successful_job_completes_with_timestamps() {
    let recorder = Arc::new(RecordingProcessor::default());
    let mut registry = ProcessorRegistry::new();
    registry.register(Arc::clone(&recorder) as Arc<dyn Processor>);

    let harness = TestHarness::new(registry);
    let worker = harness.spawn_worker("worker-a");

    let id = harness
        .gateway
        .enqueue("send-email", serde_json::json!({"to": "a@b.com"}))
        .await
        .unwrap();

    let job = harness.wait_for_terminal(id).await;
    worker.stop().await;

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error_message.is_none());
    let started = job.started_at.expect("started_at set");
    let completed = job.completed_at.expect("completed_at set");
    assert!(started <= completed);
    assert_eq!(harness.queue.len().await.unwrap(), 0);

    let seen = recorder.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["to"], "a@b.com");
}

#[tokio::test]
async fn failing_processor_records_its_exact_message() {
    let mut registry = ProcessorRegistry::new();
    registry.register(Arc::new(FailingProcessor {
        job_type: "send-email",
        message: "smtp down",
    }));

    let harness = TestHarness::new(registry);
    let worker = harness.spawn_worker("worker-a");

    let id = harness
        .gateway
        .enqueue("send-email", serde_json::json!({"to": "a@b.com"}))
        .await
        .unwrap();

    let job = harness.wait_for_terminal(id).await;
    worker.stop().await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_message.as_deref(), Some("smtp down"));
    assert!(job.completed_at.is_some());
}

#[tokio::test]
async fn unknown_job_type_fails_with_a_descriptive_message() {
    let harness = TestHarness::new(ProcessorRegistry::new());
    let worker = harness.spawn_worker("worker-a");

    let id = harness
        .gateway
        .enqueue("render-certificate", serde_json::json!({}))
        .await
        .unwrap();

    let job = harness.wait_for_terminal(id).await;
    worker.stop().await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(
        job.error_message
            .as_deref()
            .unwrap()
            .contains("render-certificate")
    );
}

#[tokio::test]
async fn worker_survives_a_failing_job() {
    let recorder = Arc::new(RecordingProcessor::default());
    let mut registry = ProcessorRegistry::new();
    registry.register(Arc::clone(&recorder) as Arc<dyn Processor>);
    registry.register(Arc::new(FailingProcessor {
        job_type: "video-transcription",
        message: "codec unsupported",
    }));

    let harness = TestHarness::new(registry);
    let worker = harness.spawn_worker("worker-a");

    let failing = harness
        .gateway
        .enqueue("video-transcription", serde_json::json!({}))
        .await
        .unwrap();
    let succeeding = harness
        .gateway
        .enqueue("send-email", serde_json::json!({"to": "a@b.com"}))
        .await
        .unwrap();

    let failed = harness.wait_for_terminal(failing).await;
    let completed = harness.wait_for_terminal(succeeding).await;
    worker.stop().await;

    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(completed.status, JobStatus::Completed);
}

/// Processor that tallies how many times each payload sequence number runs.
#[derive(Debug, Default)]
struct TallyProcessor {
    counts: Mutex<HashMap<u64, u64>>,
}

#[async_trait]
impl Processor for TallyProcessor {
    fn job_type(&self) -> &str {
        "send-email"
    }

    async fn process(&self, job_data: &Value) -> Result<(), ProcessorError> {
        let n = job_data["n"].as_u64().expect("sequence number");
        *self.counts.lock().unwrap().entry(n).or_insert(0) += 1;
        Ok(())
    }
}

#[tokio::test]
async fn single_worker_dispatches_in_fifo_order() {
    let recorder = Arc::new(RecordingProcessor::default());
    let mut registry = ProcessorRegistry::new();
    registry.register(Arc::clone(&recorder) as Arc<dyn Processor>);

    let harness = TestHarness::new(registry);

    let mut ids = Vec::new();
    for n in 0..20u64 {
        let id = harness
            .gateway
            .enqueue("send-email", serde_json::json!({ "n": n }))
            .await
            .unwrap();
        ids.push(id);
    }

    // Worker starts after all pushes so the order is fully determined.
    let worker = harness.spawn_worker("worker-a");
    for id in &ids {
        harness.wait_for_terminal(*id).await;
    }
    worker.stop().await;

    let seen: Vec<u64> = recorder
        .seen()
        .iter()
        .map(|v| v["n"].as_u64().unwrap())
        .collect();
    assert_eq!(seen, (0..20).collect::<Vec<_>>());
}

#[tokio::test]
async fn concurrent_workers_process_every_job_exactly_once() {
    let tally = Arc::new(TallyProcessor::default());
    let mut registry = ProcessorRegistry::new();
    registry.register(Arc::clone(&tally) as Arc<dyn Processor>);

    let harness = TestHarness::new(registry);

    let workers = vec![
        harness.spawn_worker("worker-a"),
        harness.spawn_worker("worker-b"),
        harness.spawn_worker("worker-c"),
    ];

    let total = 100u64;
    let mut ids = Vec::new();
    for n in 0..total {
        let id = harness
            .gateway
            .enqueue("send-email", serde_json::json!({ "n": n }))
            .await
            .unwrap();
        ids.push(id);
    }

    for id in &ids {
        let job = harness.wait_for_terminal(*id).await;
        assert_eq!(job.status, JobStatus::Completed);
    }
    for worker in workers {
        worker.stop().await;
    }

    let counts = tally.counts.lock().unwrap();
    assert_eq!(counts.len(), total as usize);
    assert!(counts.values().all(|&count| count == 1));

    let stats = harness.gateway.stats().await.unwrap();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.processing, 0);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.queued, 0);
}

#[tokio::test]
async fn untracked_jobs_run_without_record_writes() {
    let recorder = Arc::new(RecordingProcessor::default());
    let mut registry = ProcessorRegistry::new();
    registry.register(Arc::clone(&recorder) as Arc<dyn Processor>);

    let harness = TestHarness::new(registry);
    let worker = harness.spawn_worker("worker-a");

    harness
        .gateway
        .enqueue_untracked("send-email", serde_json::json!({"to": "a@b.com"}))
        .await
        .unwrap();

    for _ in 0..500 {
        if !recorder.seen().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    worker.stop().await;

    assert_eq!(recorder.seen().len(), 1);
    let page = harness
        .records
        .list(&jobhub_core::types::pagination::PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total_items, 0);
}

#[tokio::test]
async fn stopped_worker_consumes_no_further_signals() {
    let recorder = Arc::new(RecordingProcessor::default());
    let mut registry = ProcessorRegistry::new();
    registry.register(Arc::clone(&recorder) as Arc<dyn Processor>);

    let harness = TestHarness::new(registry);
    let worker = harness.spawn_worker("worker-a");
    worker.stop().await;

    let id = harness
        .gateway
        .enqueue("send-email", serde_json::json!({}))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let job = harness.records.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(harness.queue.len().await.unwrap(), 1);
    assert!(recorder.seen().is_empty());
}

#[tokio::test]
async fn reconciled_record_is_eventually_processed() {
    let recorder = Arc::new(RecordingProcessor::default());
    let mut registry = ProcessorRegistry::new();
    registry.register(Arc::clone(&recorder) as Arc<dyn Processor>);

    let harness = TestHarness::new(registry);

    // A pending record whose dispatch signal was lost.
    let mut orphan = Job::pending(
        Uuid::new_v4(),
        "send-email",
        serde_json::json!({"to": "a@b.com"}),
    );
    orphan.enqueued_at = chrono::Utc::now() - chrono::Duration::minutes(10);
    harness.records.insert(&orphan).await.unwrap();

    let reconciler = PendingReconciler::new(
        Arc::clone(&harness.records),
        Arc::clone(&harness.queue),
        300,
    );
    assert_eq!(reconciler.sweep().await.unwrap(), 1);

    let worker = harness.spawn_worker("worker-a");
    let job = harness.wait_for_terminal(orphan.id).await;
    worker.stop().await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(recorder.seen().len(), 1);
}
