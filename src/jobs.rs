//! Background mashup jobs for the web variant
//!
//! [`JobRunner::spawn`] returns as soon as the job is registered; the pipeline, the
//! notification and the cleanup all happen on a tokio task. Every job reaches the
//! notifier exactly once, whatever the pipeline did.

use crate::delivery::{DeliveryStatus, Notifier};
use crate::pipeline::{MashupPipeline, cleanup};
use crate::types::{
    Event, JobId, JobOutcome, JobRecord, JobStatus, MashupArtifact, MashupRequest,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Capacity of the event channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Error code recorded when a finished mashup could not be zipped for delivery
pub const PACKAGING_FAILED: &str = "packaging_failed";

/// How long finished jobs stay in the registry unless configured otherwise
pub const DEFAULT_JOB_RETENTION: Duration = Duration::from_secs(3600);

/// Shared table of job records, keyed by id
///
/// Finished records are kept for a retention window so `GET /jobs/:id` can report
/// them, then pruned whenever another job finishes.
#[derive(Clone)]
pub struct JobRegistry {
    records: Arc<RwLock<HashMap<JobId, JobRecord>>>,
    retention: Duration,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::with_retention(DEFAULT_JOB_RETENTION)
    }
}

impl JobRegistry {
    /// Create an empty registry keeping finished records for `retention`
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Look up a job
    pub async fn get(&self, id: JobId) -> Option<JobRecord> {
        self.records.read().await.get(&id).cloned()
    }

    /// Number of records currently held
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether no record is held
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Drop finished records older than the retention window, as of `now`
    ///
    /// Returns the number of records removed. Queued and running jobs are never pruned.
    pub async fn prune_finished(&self, now: DateTime<Utc>) -> usize {
        let Ok(retention) = chrono::Duration::from_std(self.retention) else {
            return 0;
        };
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            return 0;
        };

        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| r.finished_at.is_none_or(|finished| finished > cutoff));
        let removed = before - records.len();
        if removed > 0 {
            debug!(removed, remaining = records.len(), "pruned finished jobs");
        }
        removed
    }

    async fn insert(&self, record: JobRecord) {
        self.records.write().await.insert(record.id, record);
    }

    async fn update(&self, id: JobId, f: impl FnOnce(&mut JobRecord)) {
        if let Some(record) = self.records.write().await.get_mut(&id) {
            f(record);
        }
    }
}

/// Handle to a spawned job
pub struct JobHandle {
    id: JobId,
    task: JoinHandle<JobOutcome>,
}

impl JobHandle {
    /// The job's id
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Whether the background task has finished (notification and cleanup included)
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the job and return its outcome
    ///
    /// A panicked task is reported as a failed outcome.
    pub async fn wait(self) -> JobOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => JobOutcome::Failed {
                code: "internal_error",
                message: format!("job task aborted: {}", e),
            },
        }
    }
}

/// Runs mashup jobs in the background and mails their results
#[derive(Clone)]
pub struct JobRunner {
    pipeline: Arc<MashupPipeline>,
    notifier: Arc<Notifier>,
    registry: JobRegistry,
    event_tx: broadcast::Sender<Event>,
    output_name: String,
}

impl JobRunner {
    /// Create a runner; the pipeline is wired to the runner's event channel
    pub fn new(pipeline: MashupPipeline, notifier: Notifier, output_name: impl Into<String>) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            pipeline: Arc::new(pipeline.with_events(event_tx.clone())),
            notifier: Arc::new(notifier),
            registry: JobRegistry::default(),
            event_tx,
            output_name: output_name.into(),
        }
    }

    /// Keep finished job records for `retention` instead of the default hour
    pub fn with_job_retention(mut self, retention: Duration) -> Self {
        self.registry = JobRegistry::with_retention(retention);
        self
    }

    /// Subscribe to job events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The job table
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Register `request` and start it on a background task
    ///
    /// Requests without a recipient still run; their outcome is logged instead of
    /// mailed.
    pub async fn spawn(&self, request: MashupRequest) -> JobHandle {
        let id = JobId::new();
        self.registry
            .insert(JobRecord {
                id,
                status: JobStatus::Queued,
                query: request.query().to_string(),
                track_count: request.track_count(),
                clip_seconds: request.clip_seconds(),
                created_at: Utc::now(),
                finished_at: None,
                error_code: None,
                error: None,
            })
            .await;
        self.emit(Event::JobQueued {
            id,
            query: request.query().to_string(),
        });
        info!(job_id = %id, query = request.query(), "job queued");

        let runner = self.clone();
        let task = tokio::spawn(async move { runner.run_job(id, request).await });
        JobHandle { id, task }
    }

    async fn run_job(self, id: JobId, request: MashupRequest) -> JobOutcome {
        self.registry
            .update(id, |r| r.status = JobStatus::Running)
            .await;
        self.emit(Event::JobStarted { id });

        let (outcome, workspace) = match self.pipeline.create_workspace(id).await {
            Ok(workspace) => {
                let output = workspace.path_for(&self.output_name);
                let result = self.pipeline.produce(&workspace, &request, &output).await;
                let outcome = match result {
                    Ok(artifact) => JobOutcome::Completed(artifact),
                    Err(e) => JobOutcome::from_error(&e),
                };
                (outcome, Some(workspace))
            }
            Err(e) => (JobOutcome::from_error(&e), None),
        };

        self.record_outcome(id, &outcome).await;

        let mut leftovers = Vec::new();
        if let Some(MashupArtifact { path, .. }) = outcome.artifact() {
            leftovers.push(path.clone());
        }

        match request.recipient() {
            Some(recipient) => {
                let report = self.notifier.notify(recipient, &outcome).await;
                match report.status {
                    DeliveryStatus::Sent { success } => {
                        self.emit(Event::NotificationSent { id, success })
                    }
                    DeliveryStatus::Dropped(e) => self.emit(Event::NotificationDropped {
                        id,
                        error: e.to_string(),
                    }),
                }
                if let Some(e) = report.packaging_error {
                    self.record_packaging_failure(id, &e.to_string()).await;
                }
                if let Some(package) = report.package {
                    leftovers.push(package.path);
                }
            }
            None => info!(job_id = %id, success = outcome.is_success(), "job has no recipient"),
        }

        if let Some(workspace) = workspace {
            cleanup::cleanup_run(&workspace, &leftovers).await;
        }
        outcome
    }

    async fn record_outcome(&self, id: JobId, outcome: &JobOutcome) {
        let finished_at = Utc::now();
        self.registry.prune_finished(finished_at).await;
        match outcome {
            JobOutcome::Completed(artifact) => {
                self.registry
                    .update(id, |r| {
                        r.status = JobStatus::Succeeded;
                        r.finished_at = Some(finished_at);
                    })
                    .await;
                info!(job_id = %id, clips = artifact.clip_count, "job completed");
                self.emit(Event::JobCompleted {
                    id,
                    clip_count: artifact.clip_count,
                    duration_secs: artifact.duration.as_secs_f64(),
                });
            }
            JobOutcome::Failed { code, message } => {
                self.registry
                    .update(id, |r| {
                        r.status = JobStatus::Failed;
                        r.finished_at = Some(finished_at);
                        r.error_code = Some(code.to_string());
                        r.error = Some(message.clone());
                    })
                    .await;
                error!(job_id = %id, code, error = %message, "job failed");
                self.emit(Event::JobFailed {
                    id,
                    code: code.to_string(),
                    error: message.clone(),
                });
            }
        }
    }

    /// A completed run whose archive could not be built reached the user as a failure
    async fn record_packaging_failure(&self, id: JobId, message: &str) {
        self.registry
            .update(id, |r| {
                r.status = JobStatus::Failed;
                r.error_code = Some(PACKAGING_FAILED.to_string());
                r.error = Some(message.to_string());
            })
            .await;
        warn!(job_id = %id, error = %message, "mashup exported but could not be packaged");
        self.emit(Event::JobFailed {
            id,
            code: PACKAGING_FAILED.to_string(),
            error: message.to_string(),
        });
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}
