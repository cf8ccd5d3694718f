//! Report job engine.
//!
//! Each submitted job runs as its own tokio task through the fixed stage
//! sequence. Job records live in one map keyed by id; every mutation goes
//! through `advance`/`finish`, which only touch the record of the job they
//! were called for and never move a terminal job.

use super::analysis::synthesize;
use super::artifacts::{Artifact, ArtifactStore, ReportDownload};
use super::dataset::ReportDataset;
use super::writers::{WriteContext, WriterRegistry};
use super::ReportError;
use crate::config::{defaults, ReportsConfig};
use crate::telemetry::{Clock, SystemClock};
use crate::types::{JobEvent, JobStatus, ReportConfig, ReportJob, ReportStage};
use chrono::Duration;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Notify, RwLock};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Error recorded on a job that was cancelled before finishing.
pub const CANCELLED_MESSAGE: &str = "generación cancelada";

struct JobEntry {
    job: ReportJob,
    seq: u64,
    cancel: CancellationToken,
}

struct EngineInner {
    jobs: RwLock<HashMap<String, JobEntry>>,
    next_seq: AtomicU64,
    writers: WriterRegistry,
    artifacts: ArtifactStore,
    config: ReportsConfig,
    site_name: String,
    clock: Arc<dyn Clock>,
    seed: Option<u64>,
    events: broadcast::Sender<JobEvent>,
    changed: Notify,
    cancel: CancellationToken,
}

/// Cheap to clone; clones share the same job table.
#[derive(Clone)]
pub struct ReportEngine {
    inner: Arc<EngineInner>,
}

pub struct ReportEngineBuilder {
    config: ReportsConfig,
    site_name: String,
    clock: Arc<dyn Clock>,
    writers: WriterRegistry,
    seed: Option<u64>,
    cancel: CancellationToken,
}

impl ReportEngineBuilder {
    pub fn site_name(mut self, name: impl Into<String>) -> Self {
        self.site_name = name.into();
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn writers(mut self, writers: WriterRegistry) -> Self {
        self.writers = writers;
        self
    }

    /// Make mock data and analysis reproducible: job `n` uses `seed + n`.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parent token; cancelling it cancels every running job.
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> ReportEngine {
        let (events, _) = broadcast::channel(defaults::JOB_EVENT_CHANNEL_CAPACITY);
        ReportEngine {
            inner: Arc::new(EngineInner {
                jobs: RwLock::new(HashMap::new()),
                next_seq: AtomicU64::new(0),
                writers: self.writers,
                artifacts: ArtifactStore::new(),
                config: self.config,
                site_name: self.site_name,
                clock: self.clock,
                seed: self.seed,
                events,
                changed: Notify::new(),
                cancel: self.cancel,
            }),
        }
    }
}

impl ReportEngine {
    pub fn builder(config: ReportsConfig) -> ReportEngineBuilder {
        ReportEngineBuilder {
            config,
            site_name: defaults::LOCATION_NAME.to_string(),
            clock: Arc::new(SystemClock),
            writers: WriterRegistry::with_defaults(),
            seed: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn new(config: ReportsConfig) -> Self {
        Self::builder(config).build()
    }

    /// Reject configs that cannot produce a report. No job is created.
    pub fn validate(&self, config: &ReportConfig) -> Result<(), ReportError> {
        if !config.has_selection() {
            return Err(ReportError::Validation("no variables selected".to_string()));
        }
        let range = &config.date_range;
        if range.end < range.start {
            return Err(ReportError::Validation(
                "date range end precedes start".to_string(),
            ));
        }
        let max = self.inner.config.max_range_days;
        // A limit chrono cannot represent is treated as exceeded
        let within = Duration::try_days(max).is_some_and(|limit| range.end - range.start <= limit);
        if !within {
            return Err(ReportError::Validation(format!(
                "date range exceeds {max} days"
            )));
        }
        Ok(())
    }

    /// Validate, record a `Pending` job and start its pipeline.
    ///
    /// Returns as soon as the job is recorded.
    pub async fn submit(&self, config: ReportConfig) -> Result<String, ReportError> {
        self.validate(&config)?;

        let now = self.inner.clock.now();
        let id = new_job_id(now.timestamp_millis());
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        let cancel = self.inner.cancel.child_token();
        let job = ReportJob::new(id.clone(), config.clone(), now);

        {
            let mut jobs = self.inner.jobs.write().await;
            self.inner.emit(&job);
            jobs.insert(
                id.clone(),
                JobEntry {
                    job,
                    seq,
                    cancel: cancel.clone(),
                },
            );
        }
        info!(
            job_id = %id,
            format = %config.format,
            variables = config.selected_variables().count(),
            ai_analysis = config.ai_analysis,
            "Report job submitted"
        );

        let rng = match self.inner.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(seq)),
            None => StdRng::from_entropy(),
        };
        let inner = Arc::clone(&self.inner);
        let job_id = id.clone();
        tokio::spawn(async move {
            let timeout = inner.config.job_timeout();
            // The pipeline runs in its own task so a panicking stage or writer
            // still ends in `finish`.
            let pipeline = {
                let inner = Arc::clone(&inner);
                let job_id = job_id.clone();
                tokio::spawn(async move { inner.run_pipeline(&job_id, &config, rng).await })
            };
            let abort = pipeline.abort_handle();
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    Err(ReportError::Generation(anyhow::anyhow!(CANCELLED_MESSAGE)))
                }
                result = tokio::time::timeout(timeout, pipeline) => match result {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(join_err)) => Err(pipeline_crashed(join_err)),
                    Err(_) => Err(ReportError::Generation(anyhow::anyhow!(
                        "tiempo de generación agotado tras {} s",
                        timeout.as_secs()
                    ))),
                },
            };
            abort.abort();
            inner.finish(&job_id, outcome).await;
        });

        Ok(id)
    }

    pub async fn get_job(&self, id: &str) -> Option<ReportJob> {
        self.inner.jobs.read().await.get(id).map(|e| e.job.clone())
    }

    /// All jobs, newest first.
    pub async fn list_jobs(&self) -> Vec<ReportJob> {
        let jobs = self.inner.jobs.read().await;
        let mut entries: Vec<&JobEntry> = jobs.values().collect();
        entries.sort_by(|a, b| b.seq.cmp(&a.seq));
        entries.into_iter().map(|e| e.job.clone()).collect()
    }

    /// True while at least one job is pending or generating.
    pub async fn is_generating(&self) -> bool {
        self.inner
            .jobs
            .read()
            .await
            .values()
            .any(|e| !e.job.status.is_terminal())
    }

    /// Artifact bytes and filename of a completed job; `None` otherwise.
    pub async fn download_report(&self, id: &str) -> Option<ReportDownload> {
        let job = self.get_job(id).await?;
        if job.status != JobStatus::Completed {
            return None;
        }
        let url = job.download_url.as_deref()?;
        let artifact = self.inner.artifacts.get(url).await?;
        Some(ReportDownload {
            filename: format!(
                "reporte_{}_{}.{}",
                job.config.format.tag(),
                job.created_at.format("%Y-%m-%d"),
                artifact.extension
            ),
            content_type: artifact.content_type,
            bytes: artifact.bytes,
        })
    }

    /// Remove a job whatever its state, cancelling it if still running.
    pub async fn delete_report(&self, id: &str) -> bool {
        let removed = self.inner.jobs.write().await.remove(id);
        match removed {
            Some(entry) => {
                entry.cancel.cancel();
                if let Some(url) = &entry.job.download_url {
                    self.inner.artifacts.remove(url).await;
                }
                self.inner.changed.notify_waiters();
                info!(job_id = %id, status = %entry.job.status, "Report job deleted");
                true
            }
            None => false,
        }
    }

    /// Remove every `Completed` job. Failed and running jobs stay.
    pub async fn clear_completed(&self) -> usize {
        let removed: Vec<JobEntry> = {
            let mut jobs = self.inner.jobs.write().await;
            let ids: Vec<String> = jobs
                .iter()
                .filter(|(_, e)| e.job.status == JobStatus::Completed)
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter().filter_map(|id| jobs.remove(id)).collect()
        };
        for entry in &removed {
            if let Some(url) = &entry.job.download_url {
                self.inner.artifacts.remove(url).await;
            }
        }
        if !removed.is_empty() {
            self.inner.changed.notify_waiters();
            info!(removed = removed.len(), "Cleared completed report jobs");
        }
        removed.len()
    }

    /// Force a running job into `Error`. Terminal jobs are returned unchanged.
    pub async fn cancel(&self, id: &str) -> Result<ReportJob, ReportError> {
        let mut jobs = self.inner.jobs.write().await;
        let entry = jobs
            .get_mut(id)
            .ok_or_else(|| ReportError::NotFound(id.to_string()))?;
        if !entry.job.status.is_terminal() {
            entry.cancel.cancel();
            entry.job.status = JobStatus::Error;
            entry.job.error = Some(CANCELLED_MESSAGE.to_string());
            self.inner.emit(&entry.job);
            self.inner.changed.notify_waiters();
            info!(job_id = %id, progress = entry.job.progress, "Report job cancelled");
        }
        Ok(entry.job.clone())
    }

    /// Resolve once the job is terminal. `None` if it does not exist or is
    /// deleted while waiting.
    pub async fn wait_for(&self, id: &str) -> Option<ReportJob> {
        loop {
            let notified = self.inner.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let job = self.get_job(id).await?;
            if job.status.is_terminal() {
                return Some(job);
            }
            notified.await;
        }
    }

    /// Every status/progress transition of every job.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.events.subscribe()
    }

    /// Cancel all running jobs.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    pub fn writers(&self) -> &WriterRegistry {
        &self.inner.writers
    }
}

impl EngineInner {
    fn emit(&self, job: &ReportJob) {
        // No subscribers is fine
        let _ = self.events.send(JobEvent {
            job_id: job.id.clone(),
            status: job.status,
            progress: job.progress,
            stage: job.stage,
        });
    }

    /// Move job `id` to `stage`. The first advance flips `Pending` to
    /// `Generating`; progress never goes backwards.
    async fn advance(&self, id: &str, stage: ReportStage) -> Result<(), ReportError> {
        let mut jobs = self.jobs.write().await;
        let entry = jobs
            .get_mut(id)
            .ok_or_else(|| ReportError::NotFound(id.to_string()))?;
        if entry.job.status.is_terminal() {
            return Err(ReportError::Generation(anyhow::anyhow!(
                "job already {}",
                entry.job.status
            )));
        }
        entry.job.status = JobStatus::Generating;
        entry.job.progress = entry.job.progress.max(stage.progress());
        entry.job.stage = Some(stage);
        self.emit(&entry.job);
        self.changed.notify_waiters();
        debug!(job_id = %id, progress = entry.job.progress, stage = stage.label(), "Report stage");
        Ok(())
    }

    async fn run_pipeline(
        &self,
        id: &str,
        config: &ReportConfig,
        mut rng: StdRng,
    ) -> Result<Artifact, ReportError> {
        self.advance(id, ReportStage::DataCollection).await?;
        let dataset = ReportDataset::build(config, &mut rng)?;
        tokio::time::sleep(self.config.stage_delay(ReportStage::DataCollection)).await;

        self.advance(id, ReportStage::AnalysisProcessing).await?;
        let stats = dataset.column_stats();
        tokio::time::sleep(self.config.stage_delay(ReportStage::AnalysisProcessing)).await;

        let analysis = if config.ai_analysis {
            self.advance(id, ReportStage::AiSynthesis).await?;
            let analysis = synthesize(config, &mut rng);
            tokio::time::sleep(self.config.stage_delay(ReportStage::AiSynthesis)).await;
            Some(analysis)
        } else {
            None
        };

        self.advance(id, ReportStage::ArtifactAssembly).await?;
        tokio::time::sleep(self.config.stage_delay(ReportStage::ArtifactAssembly)).await;

        let writer = self.writers.get(&config.format)?;
        let ctx = WriteContext {
            config,
            dataset: &dataset,
            stats: &stats,
            analysis: analysis.as_ref(),
            site_name: &self.site_name,
            generated_at: self.clock.now(),
        };
        let bytes = writer.write(&ctx)?;
        Ok(Artifact::new(bytes, writer.content_type(), writer.extension()))
    }

    /// Record the pipeline outcome unless the job was deleted or already
    /// moved to a terminal state.
    async fn finish(&self, id: &str, outcome: Result<Artifact, ReportError>) {
        let mut jobs = self.jobs.write().await;
        let Some(entry) = jobs.get_mut(id) else {
            debug!(job_id = %id, "Report job gone before finishing");
            return;
        };
        if entry.job.status.is_terminal() {
            return;
        }

        match outcome {
            Ok(artifact) => {
                let size = artifact.len();
                let url = self.artifacts.put(artifact).await;
                entry.job.status = JobStatus::Completed;
                entry.job.progress = ReportStage::Writing.progress();
                entry.job.stage = Some(ReportStage::Writing);
                entry.job.completed_at = Some(self.clock.now());
                entry.job.download_url = Some(url);
                info!(job_id = %id, bytes = size, "Report job completed");
            }
            Err(e) => {
                entry.job.status = JobStatus::Error;
                entry.job.error = Some(e.to_string());
                warn!(job_id = %id, progress = entry.job.progress, error = %e, "Report job failed");
            }
        }
        self.emit(&entry.job);
        self.changed.notify_waiters();
    }
}

/// Map a panicked or aborted pipeline task to a job error.
fn pipeline_crashed(err: JoinError) -> ReportError {
    let detail = match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "pánico sin mensaje".to_string()),
        Err(err) => err.to_string(),
    };
    error!(error = %detail, "Report pipeline task crashed");
    ReportError::Generation(anyhow::anyhow!("error interno de generación: {detail}"))
}

/// `report_<unix-millis>_<9 hex chars>`
fn new_job_id(millis: i64) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("report_{}_{}", millis, &suffix[..9])
}
