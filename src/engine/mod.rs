//! Verdict engine — submission gate, dedup, and background analysis
//!
//! `submit` is the synchronous part of the pipeline: it validates and
//! fingerprints the content, then either registers a new job and hands it
//! to the scheduler, or reports the job that already owns the artifact.
//! Everything after that happens in the background worker (`runner`),
//! which talks only to the shared dependency bundle.
//!
//! All state flows through injected seams (`JobStore`, `EvidenceSink`,
//! `ContentSource`, `Scheduler`); the engine itself holds nothing mutable.

pub mod runner;

use crate::analyzers::{AnalyzerSet, HistoricalBaseline};
use crate::config::EngineConfig;
use crate::ingest::{self, ContentSource, Fingerprint};
use crate::job::{
    AnalysisJob, CreateOutcome, EvidenceSink, JobStore, MemoryEvidenceSink, MemoryJobStore,
};
use crate::report::{self, Report};
use crate::{PramanaError, PramanaResult};
use std::sync::Arc;
use uuid::Uuid;

// ─── Dependencies ──────────────────────────────────────────────────────

/// Everything a worker needs to run one job
pub struct EngineDeps {
    pub(crate) config: EngineConfig,
    pub(crate) store: Arc<dyn JobStore>,
    pub(crate) sink: Arc<dyn EvidenceSink>,
    pub(crate) source: Arc<dyn ContentSource>,
    pub(crate) analyzers: AnalyzerSet,
}

// ─── Scheduling ────────────────────────────────────────────────────────

/// Hands accepted jobs to a worker. The call must not block: analysis
/// runs in the background and submitters only ever wait on the gate.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, deps: Arc<EngineDeps>, job_id: Uuid);
}

/// Default scheduler: one detached tokio task per job
pub struct SpawnScheduler;

impl Scheduler for SpawnScheduler {
    fn schedule(&self, deps: Arc<EngineDeps>, job_id: Uuid) {
        tokio::spawn(runner::execute_job(deps, job_id));
    }
}

// ─── Submission ────────────────────────────────────────────────────────

/// One artifact submission
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Raw content, used for validation and fingerprinting
    pub content: Vec<u8>,
    /// Original filename, used as a format fallback when magic bytes
    /// are inconclusive
    pub filename: String,
    /// Where the caller persisted the content; workers fetch from here
    pub storage_path: String,
    /// Historical figures for claim verification on text artifacts
    pub baseline: Option<HistoricalBaseline>,
}

/// What `submit` decided for the artifact
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// New artifact: a job was created and scheduled
    Scheduled(AnalysisJob),
    /// Duplicate of a job still pending or processing
    InProgress(AnalysisJob),
    /// Duplicate of a finished job; its report can be fetched now
    AlreadyAnalyzed(AnalysisJob),
}

impl SubmitOutcome {
    pub fn job(&self) -> &AnalysisJob {
        match self {
            SubmitOutcome::Scheduled(job)
            | SubmitOutcome::InProgress(job)
            | SubmitOutcome::AlreadyAnalyzed(job) => job,
        }
    }
}

// ─── Engine ────────────────────────────────────────────────────────────

/// Multi-signal content authenticity engine
pub struct VerdictEngine {
    deps: Arc<EngineDeps>,
    scheduler: Arc<dyn Scheduler>,
}

impl VerdictEngine {
    /// Engine with in-memory stores and the spawning scheduler
    pub fn new(config: EngineConfig, source: Arc<dyn ContentSource>) -> Self {
        Self::with_parts(
            config,
            source,
            Arc::new(MemoryJobStore::new()),
            Arc::new(MemoryEvidenceSink::new()),
            Arc::new(SpawnScheduler),
        )
    }

    /// Engine over caller-provided stores and scheduler
    pub fn with_parts(
        config: EngineConfig,
        source: Arc<dyn ContentSource>,
        store: Arc<dyn JobStore>,
        sink: Arc<dyn EvidenceSink>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let analyzers = AnalyzerSet::new(&config);
        Self {
            deps: Arc::new(EngineDeps {
                config,
                store,
                sink,
                source,
                analyzers,
            }),
            scheduler,
        }
    }

    /// Accept an artifact for analysis.
    ///
    /// Unsupported modalities and oversize content are rejected here,
    /// before any job exists. One job per fingerprint: a duplicate
    /// submission joins the existing job instead of racing it.
    pub async fn submit(&self, request: SubmitRequest) -> PramanaResult<SubmitOutcome> {
        let artifact = ingest::ingest(
            &request.content,
            Some(request.filename.as_str()),
            &self.deps.config.limits,
        )?;

        let job = AnalysisJob::new(
            artifact.fingerprint,
            artifact.modality,
            request.storage_path,
            request.baseline,
        );

        match self.deps.store.create_or_existing(job).await {
            CreateOutcome::Created(job) => {
                tracing::info!(
                    "accepted {} artifact {} as job {}",
                    job.modality,
                    job.fingerprint.short(),
                    job.id
                );
                self.scheduler.schedule(Arc::clone(&self.deps), job.id);
                Ok(SubmitOutcome::Scheduled(job))
            }
            CreateOutcome::Existing(job) => {
                tracing::info!(
                    "artifact {} already has job {} ({})",
                    job.fingerprint.short(),
                    job.id,
                    job.status
                );
                if job.status.is_terminal() {
                    Ok(SubmitOutcome::AlreadyAnalyzed(job))
                } else {
                    Ok(SubmitOutcome::InProgress(job))
                }
            }
        }
    }

    /// Current job row for an artifact, if any
    pub async fn job(&self, fingerprint: &Fingerprint) -> Option<AnalysisJob> {
        self.deps.store.get(fingerprint).await
    }

    /// Full report for a finished job. In-flight jobs are not ready and
    /// unknown fingerprints are not found.
    pub async fn report(&self, fingerprint: &Fingerprint) -> PramanaResult<Report> {
        let job = self
            .deps
            .store
            .get(fingerprint)
            .await
            .ok_or_else(|| PramanaError::JobNotFound(fingerprint.short().to_string()))?;

        if !job.status.is_terminal() {
            return Err(PramanaError::InvalidState(format!(
                "job {} is still {}",
                job.id, job.status
            )));
        }

        let signals = self.deps.sink.signals_for(job.id).await;
        Ok(report::materialize(&job, &signals))
    }

    /// Administrative re-run for a finished job. The old row and its
    /// evidence are replaced by a fresh pending job over the same
    /// artifact.
    pub async fn reanalyze(&self, fingerprint: &Fingerprint) -> PramanaResult<AnalysisJob> {
        let old = self
            .deps
            .store
            .get(fingerprint)
            .await
            .ok_or_else(|| PramanaError::JobNotFound(fingerprint.short().to_string()))?;

        let fresh = self.deps.store.reset(fingerprint).await?;
        self.deps.sink.discard(old.id).await;

        tracing::info!(
            "reanalyzing artifact {}: job {} replaces {}",
            fingerprint.short(),
            fresh.id,
            old.id
        );
        self.scheduler.schedule(Arc::clone(&self.deps), fresh.id);
        Ok(fresh)
    }
}
