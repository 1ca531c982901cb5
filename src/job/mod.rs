//! Job lifecycle — pending, processing, and the terminal states
//!
//! One job per artifact fingerprint. The store is the single gate for
//! both deduplication and state changes: `create_or_existing` decides
//! atomically whether a submission starts a new analysis or joins an
//! existing one, and `transition` is the conditional step workers use to
//! claim a job. Terminal rows never change again.
//!
//! ```text
//!            claim                complete
//!  pending ────────→ processing ────────────→ completed
//!                        │
//!                        │ timeout / retrieval / analysis error
//!                        └──────────────────→ failed
//! ```

use crate::analyzers::HistoricalBaseline;
use crate::ingest::{Fingerprint, Modality};
use crate::signal::Signal;
use crate::verdict::Verdict;
use crate::{PramanaError, PramanaResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;
use uuid::Uuid;

// ─── Job record ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why a job ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Analysis exceeded the configured deadline
    Timeout,
    /// Content could not be fetched from storage
    Retrieval,
    /// An analyzer failed in a way it could not degrade around
    Analysis,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Retrieval => "retrieval",
            FailureKind::Analysis => "analysis",
        };
        f.write_str(s)
    }
}

/// One analysis job, keyed by artifact fingerprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: Uuid,
    pub fingerprint: Fingerprint,
    pub modality: Modality,
    /// Where the artifact's bytes live, relative to the content source
    pub storage_path: String,
    pub status: JobStatus,
    pub verdict: Option<Verdict>,
    pub confidence: Option<f64>,
    pub failure: Option<FailureKind>,
    /// Historical figures for claim verification on text jobs
    pub baseline: Option<HistoricalBaseline>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisJob {
    pub fn new(
        fingerprint: Fingerprint,
        modality: Modality,
        storage_path: impl Into<String>,
        baseline: Option<HistoricalBaseline>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            fingerprint,
            modality,
            storage_path: storage_path.into(),
            status: JobStatus::Pending,
            verdict: None,
            confidence: None,
            failure: None,
            baseline,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// What `create_or_existing` decided, with the canonical row either way
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created(AnalysisJob),
    Existing(AnalysisJob),
}

// ─── Job store ─────────────────────────────────────────────────────────

/// Persistence seam for jobs. Every method is atomic with respect to the
/// others; callers never get to observe a half-applied change.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert `job` unless a job for its fingerprint already exists.
    async fn create_or_existing(&self, job: AnalysisJob) -> CreateOutcome;

    async fn get(&self, fingerprint: &Fingerprint) -> Option<AnalysisJob>;

    async fn get_by_id(&self, id: Uuid) -> Option<AnalysisJob>;

    /// Move the job from `from` to `to` only if it is currently in
    /// `from`. Returns false otherwise; terminal rows always refuse.
    async fn transition(&self, id: Uuid, from: JobStatus, to: JobStatus) -> bool;

    /// Record the verdict and finish the job. Only valid from
    /// `Processing`; returns false otherwise.
    async fn complete(&self, id: Uuid, verdict: Verdict, confidence: f64) -> bool;

    /// Fail the job with `kind`. Returns false if the job is already
    /// terminal or missing.
    async fn fail(&self, id: Uuid, kind: FailureKind) -> bool;

    /// Replace a terminal job with a fresh pending one for the same
    /// artifact, keeping fingerprint, modality, path, and baseline.
    async fn reset(&self, fingerprint: &Fingerprint) -> PramanaResult<AnalysisJob>;
}

#[derive(Default)]
struct JobTable {
    by_fingerprint: HashMap<Fingerprint, AnalysisJob>,
    ids: HashMap<Uuid, Fingerprint>,
}

/// In-memory job store over a single `RwLock`
#[derive(Default)]
pub struct MemoryJobStore {
    table: RwLock<JobTable>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_or_existing(&self, job: AnalysisJob) -> CreateOutcome {
        let mut table = self.table.write().await;
        if let Some(existing) = table.by_fingerprint.get(&job.fingerprint) {
            return CreateOutcome::Existing(existing.clone());
        }
        table.ids.insert(job.id, job.fingerprint.clone());
        table
            .by_fingerprint
            .insert(job.fingerprint.clone(), job.clone());
        CreateOutcome::Created(job)
    }

    async fn get(&self, fingerprint: &Fingerprint) -> Option<AnalysisJob> {
        self.table
            .read()
            .await
            .by_fingerprint
            .get(fingerprint)
            .cloned()
    }

    async fn get_by_id(&self, id: Uuid) -> Option<AnalysisJob> {
        let table = self.table.read().await;
        let fingerprint = table.ids.get(&id)?;
        table.by_fingerprint.get(fingerprint).cloned()
    }

    async fn transition(&self, id: Uuid, from: JobStatus, to: JobStatus) -> bool {
        let mut table = self.table.write().await;
        let Some(job) = lookup_mut(&mut table, id) else {
            return false;
        };
        if job.status != from || job.status.is_terminal() {
            return false;
        }
        job.status = to;
        true
    }

    async fn complete(&self, id: Uuid, verdict: Verdict, confidence: f64) -> bool {
        let mut table = self.table.write().await;
        let Some(job) = lookup_mut(&mut table, id) else {
            return false;
        };
        if job.status != JobStatus::Processing {
            return false;
        }
        job.status = JobStatus::Completed;
        job.verdict = Some(verdict);
        job.confidence = Some(confidence);
        job.completed_at = Some(Utc::now());
        true
    }

    async fn fail(&self, id: Uuid, kind: FailureKind) -> bool {
        let mut table = self.table.write().await;
        let Some(job) = lookup_mut(&mut table, id) else {
            return false;
        };
        if job.status.is_terminal() {
            return false;
        }
        job.status = JobStatus::Failed;
        job.failure = Some(kind);
        job.completed_at = Some(Utc::now());
        true
    }

    async fn reset(&self, fingerprint: &Fingerprint) -> PramanaResult<AnalysisJob> {
        let mut table = self.table.write().await;
        let (old_id, fresh) = {
            let old = table
                .by_fingerprint
                .get(fingerprint)
                .ok_or_else(|| PramanaError::JobNotFound(fingerprint.short().to_string()))?;
            if !old.status.is_terminal() {
                return Err(PramanaError::InvalidState(format!(
                    "job {} is {} and cannot be reset",
                    old.id, old.status
                )));
            }
            let fresh = AnalysisJob::new(
                old.fingerprint.clone(),
                old.modality,
                old.storage_path.clone(),
                old.baseline.clone(),
            );
            (old.id, fresh)
        };

        table.ids.remove(&old_id);
        table.ids.insert(fresh.id, fresh.fingerprint.clone());
        table
            .by_fingerprint
            .insert(fresh.fingerprint.clone(), fresh.clone());
        Ok(fresh)
    }
}

fn lookup_mut(table: &mut JobTable, id: Uuid) -> Option<&mut AnalysisJob> {
    let fingerprint = table.ids.get(&id)?.clone();
    table.by_fingerprint.get_mut(&fingerprint)
}

// ─── Evidence sink ─────────────────────────────────────────────────────

/// Where completed signals land. Workers buffer signals during analysis
/// and append the whole set in one call, so readers only ever see the
/// full evidence of a job or none of it.
#[async_trait]
pub trait EvidenceSink: Send + Sync {
    async fn append(&self, job_id: Uuid, signals: Vec<Signal>);

    async fn signals_for(&self, job_id: Uuid) -> Vec<Signal>;

    /// Drop whatever was appended for the job
    async fn discard(&self, job_id: Uuid);
}

#[derive(Default)]
pub struct MemoryEvidenceSink {
    signals: RwLock<HashMap<Uuid, Vec<Signal>>>,
}

impl MemoryEvidenceSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EvidenceSink for MemoryEvidenceSink {
    async fn append(&self, job_id: Uuid, signals: Vec<Signal>) {
        self.signals
            .write()
            .await
            .entry(job_id)
            .or_default()
            .extend(signals);
    }

    async fn signals_for(&self, job_id: Uuid) -> Vec<Signal> {
        self.signals
            .read()
            .await
            .get(&job_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn discard(&self, job_id: Uuid) {
        self.signals.write().await.remove(&job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{SignalCategory, SignalKind};
    use std::sync::Arc;

    fn make_job() -> AnalysisJob {
        AnalysisJob::new(
            Fingerprint::identify(b"job fixture"),
            Modality::Document,
            "uploads/fixture.pdf",
            None,
        )
    }

    #[tokio::test]
    async fn test_create_dedupes_on_fingerprint() {
        let store = MemoryJobStore::new();
        let first = make_job();
        let first_id = first.id;

        assert!(matches!(
            store.create_or_existing(first).await,
            CreateOutcome::Created(_)
        ));

        let duplicate = make_job();
        match store.create_or_existing(duplicate).await {
            CreateOutcome::Existing(job) => assert_eq!(job.id, first_id),
            CreateOutcome::Created(_) => panic!("same fingerprint created twice"),
        }
    }

    #[tokio::test]
    async fn test_claim_is_exclusive() {
        let store = MemoryJobStore::new();
        let job = make_job();
        let id = job.id;
        store.create_or_existing(job).await;

        assert!(store.transition(id, JobStatus::Pending, JobStatus::Processing).await);
        assert!(
            !store.transition(id, JobStatus::Pending, JobStatus::Processing).await,
            "second claim must lose"
        );
    }

    #[tokio::test]
    async fn test_concurrent_claims_pick_one_winner() {
        let store = Arc::new(MemoryJobStore::new());
        let job = make_job();
        let id = job.id;
        store.create_or_existing(job).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.transition(id, JobStatus::Pending, JobStatus::Processing).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_terminal_rows_are_immutable() {
        let store = MemoryJobStore::new();
        let job = make_job();
        let id = job.id;
        store.create_or_existing(job).await;

        store.transition(id, JobStatus::Pending, JobStatus::Processing).await;
        assert!(store.complete(id, Verdict::Authentic, 0.9).await);

        assert!(!store.fail(id, FailureKind::Timeout).await);
        assert!(!store.transition(id, JobStatus::Completed, JobStatus::Pending).await);
        assert!(!store.complete(id, Verdict::Suspicious, 0.5).await);

        let job = store.get_by_id(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.verdict, Some(Verdict::Authentic));
        assert!(job.failure.is_none());
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_complete_requires_processing() {
        let store = MemoryJobStore::new();
        let job = make_job();
        let id = job.id;
        store.create_or_existing(job).await;

        // Still pending: nobody claimed it
        assert!(!store.complete(id, Verdict::Authentic, 0.9).await);
    }

    #[tokio::test]
    async fn test_fail_records_kind() {
        let store = MemoryJobStore::new();
        let job = make_job();
        let id = job.id;
        store.create_or_existing(job).await;
        store.transition(id, JobStatus::Pending, JobStatus::Processing).await;

        assert!(store.fail(id, FailureKind::Retrieval).await);
        let job = store.get_by_id(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failure, Some(FailureKind::Retrieval));
        assert!(job.verdict.is_none());
    }

    #[tokio::test]
    async fn test_reset_replaces_terminal_job() {
        let store = MemoryJobStore::new();
        let job = make_job();
        let id = job.id;
        let fingerprint = job.fingerprint.clone();
        store.create_or_existing(job).await;

        // Not terminal yet
        assert!(store.reset(&fingerprint).await.is_err());

        store.transition(id, JobStatus::Pending, JobStatus::Processing).await;
        store.complete(id, Verdict::Suspicious, 0.8).await;

        let fresh = store.reset(&fingerprint).await.unwrap();
        assert_ne!(fresh.id, id);
        assert_eq!(fresh.fingerprint, fingerprint);
        assert_eq!(fresh.status, JobStatus::Pending);
        assert!(fresh.verdict.is_none());

        // The old id no longer resolves
        assert!(store.get_by_id(id).await.is_none());
        assert_eq!(store.get_by_id(fresh.id).await.unwrap().id, fresh.id);
    }

    #[tokio::test]
    async fn test_reset_unknown_fingerprint() {
        let store = MemoryJobStore::new();
        let missing = Fingerprint::identify(b"never submitted");
        assert!(matches!(
            store.reset(&missing).await,
            Err(PramanaError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_evidence_sink_append_and_discard() {
        let sink = MemoryEvidenceSink::new();
        let id = Uuid::new_v4();

        assert!(sink.signals_for(id).await.is_empty());

        sink.append(
            id,
            vec![Signal::new(
                SignalKind::Structural,
                SignalCategory::Suspicious,
                0.7,
            )],
        )
        .await;
        assert_eq!(sink.signals_for(id).await.len(), 1);

        sink.discard(id).await;
        assert!(sink.signals_for(id).await.is_empty());
    }
}
