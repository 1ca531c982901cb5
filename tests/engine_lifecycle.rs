//! End-to-end lifecycle tests for the verdict engine.
//!
//! These drive the public API the way a caller would: submit content, let
//! the background worker finish, then read job state and reports. A
//! counting content source proves the at-most-once guarantee: however many
//! times an artifact is submitted, its bytes are fetched and analyzed once
//! per job.

use async_trait::async_trait;
use pramana::{
    AnalysisJob, ContentSource, EngineConfig, EngineDeps, FailureKind, Fingerprint, JobStatus,
    MemoryEvidenceSink, MemoryJobStore, PramanaError, PramanaResult, RiskLevel, Scheduler,
    SubmitOutcome, SubmitRequest, Verdict, VerdictEngine,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// ─── Helpers ───────────────────────────────────────────────────────────

/// In-memory content source that counts every fetch
struct CountingSource {
    files: HashMap<String, Vec<u8>>,
    fetches: Arc<AtomicUsize>,
}

impl CountingSource {
    fn new(files: &[(&str, &[u8])]) -> (Arc<Self>, Arc<AtomicUsize>) {
        let fetches = Arc::new(AtomicUsize::new(0));
        let source = Arc::new(Self {
            files: files
                .iter()
                .map(|(path, bytes)| (path.to_string(), bytes.to_vec()))
                .collect(),
            fetches: Arc::clone(&fetches),
        });
        (source, fetches)
    }
}

#[async_trait]
impl ContentSource for CountingSource {
    async fn fetch(&self, storage_path: &str) -> PramanaResult<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(storage_path)
            .cloned()
            .ok_or_else(|| PramanaError::Retrieval(format!("no such artifact: {}", storage_path)))
    }
}

/// Source that never returns, for exercising the analysis deadline
struct StalledSource;

#[async_trait]
impl ContentSource for StalledSource {
    async fn fetch(&self, _storage_path: &str) -> PramanaResult<Vec<u8>> {
        tokio::time::sleep(Duration::from_secs(86_400)).await;
        Ok(Vec::new())
    }
}

/// Scheduler that drops jobs on the floor, keeping them pending
struct NoopScheduler;

impl Scheduler for NoopScheduler {
    fn schedule(&self, _deps: Arc<EngineDeps>, _job_id: Uuid) {}
}

/// Benign PDF: known producer, plausible creation/modification dates
fn clean_pdf() -> Vec<u8> {
    "%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n<< /Info << \
     /Producer (Adobe PDF Library 15.0) /Creator (Acrobat Pro) \
     /CreationDate (D:20240110090000Z) /ModDate (D:20240215174500Z) \
     >> >>\n%%EOF\n"
        .to_string()
        .into_bytes()
}

fn pdf_request(storage_path: &str) -> SubmitRequest {
    SubmitRequest {
        content: clean_pdf(),
        filename: "filing.pdf".to_string(),
        storage_path: storage_path.to_string(),
        baseline: None,
    }
}

fn engine_over(source: Arc<dyn ContentSource>) -> VerdictEngine {
    VerdictEngine::new(EngineConfig::default(), source)
}

/// Poll until the job behind a fingerprint reaches a terminal state
async fn wait_terminal(engine: &VerdictEngine, fingerprint: &Fingerprint) -> AnalysisJob {
    for _ in 0..4000 {
        if let Some(job) = engine.job(fingerprint).await {
            if job.status.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!(
        "job for {} never reached a terminal state",
        fingerprint.short()
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Section 1: Submission and Deduplication
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_submission_runs_to_completion_with_one_fetch() {
    let pdf = clean_pdf();
    let (source, fetches) = CountingSource::new(&[("uploads/filing.pdf", &pdf)]);
    let engine = engine_over(source);

    let outcome = engine.submit(pdf_request("uploads/filing.pdf")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Scheduled(_)));

    let job = wait_terminal(&engine, &outcome.job().fingerprint).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.verdict, Some(Verdict::Authentic));
    assert!(
        job.completed_at.is_some(),
        "completed job must record its completion time"
    );
    assert_eq!(
        fetches.load(Ordering::SeqCst),
        1,
        "content must be fetched exactly once per job"
    );
}

#[tokio::test]
async fn test_resubmission_after_completion_joins_finished_job() {
    let pdf = clean_pdf();
    let (source, fetches) = CountingSource::new(&[("uploads/filing.pdf", &pdf)]);
    let engine = engine_over(source);

    let first = engine.submit(pdf_request("uploads/filing.pdf")).await.unwrap();
    wait_terminal(&engine, &first.job().fingerprint).await;

    let second = engine.submit(pdf_request("uploads/filing.pdf")).await.unwrap();
    match second {
        SubmitOutcome::AlreadyAnalyzed(job) => {
            assert_eq!(job.id, first.job().id, "duplicate must join the original job");
            assert_eq!(job.status, JobStatus::Completed);
        }
        other => panic!("expected AlreadyAnalyzed, got {:?}", other),
    }
    assert_eq!(
        fetches.load(Ordering::SeqCst),
        1,
        "resubmission must not re-run the analysis"
    );
}

#[tokio::test]
async fn test_same_bytes_under_different_name_share_one_job() {
    // Identity is the content hash; the filename is only a format hint
    let pdf = clean_pdf();
    let (source, fetches) = CountingSource::new(&[("uploads/a.pdf", &pdf)]);
    let engine = engine_over(source);

    let first = engine.submit(pdf_request("uploads/a.pdf")).await.unwrap();
    wait_terminal(&engine, &first.job().fingerprint).await;

    let renamed = SubmitRequest {
        content: clean_pdf(),
        filename: "renamed-copy.pdf".to_string(),
        storage_path: "uploads/b.pdf".to_string(),
        baseline: None,
    };
    let second = engine.submit(renamed).await.unwrap();
    assert_eq!(second.job().id, first.job().id);
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

// ═══════════════════════════════════════════════════════════════════════
// Section 2: Reports
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_completed_report_carries_verdict_and_evidence() {
    let pdf = clean_pdf();
    let (source, _) = CountingSource::new(&[("uploads/filing.pdf", &pdf)]);
    let engine = engine_over(source);

    let outcome = engine.submit(pdf_request("uploads/filing.pdf")).await.unwrap();
    let fingerprint = outcome.job().fingerprint.clone();
    wait_terminal(&engine, &fingerprint).await;

    let report = engine.report(&fingerprint).await.unwrap();
    assert_eq!(report.verdict, Some(Verdict::Authentic));
    assert!(
        (report.confidence_score.unwrap() - 0.90).abs() < 1e-9,
        "clean document maps to 0.90, got {:?}",
        report.confidence_score
    );
    assert_eq!(report.summary.overall_risk_level, RiskLevel::Low);
    assert_eq!(report.summary.total_signals, 1);
    assert!(
        report.analysis_date.is_some(),
        "finished report must carry the analysis date"
    );

    let entry = report
        .evidence
        .values()
        .next()
        .expect("structural evidence entry");
    assert_eq!(entry.evidence_data["risk_score"], 0);
    assert!(entry.processing_time >= 0.0);
}

#[tokio::test]
async fn test_report_not_ready_while_job_parked() {
    let pdf = clean_pdf();
    let (source, _) = CountingSource::new(&[("uploads/filing.pdf", &pdf)]);
    let engine = VerdictEngine::with_parts(
        EngineConfig::default(),
        source,
        Arc::new(MemoryJobStore::new()),
        Arc::new(MemoryEvidenceSink::new()),
        Arc::new(NoopScheduler),
    );

    let outcome = engine.submit(pdf_request("uploads/filing.pdf")).await.unwrap();
    let err = engine.report(&outcome.job().fingerprint).await.unwrap_err();
    assert!(
        matches!(err, PramanaError::InvalidState(_)),
        "pending job must not produce a report: {:?}",
        err
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Section 3: Failure Paths
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_missing_content_fails_job_with_retrieval_cause() {
    // The store has no file behind the storage path
    let (source, fetches) = CountingSource::new(&[]);
    let engine = engine_over(source);

    let outcome = engine.submit(pdf_request("uploads/gone.pdf")).await.unwrap();
    let fingerprint = outcome.job().fingerprint.clone();

    let job = wait_terminal(&engine, &fingerprint).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.failure, Some(FailureKind::Retrieval));
    assert_eq!(job.verdict, None, "failed job must not carry a verdict");
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    // Failed jobs still report, with the cause and no forensic claims
    let report = engine.report(&fingerprint).await.unwrap();
    assert_eq!(report.failure, Some(FailureKind::Retrieval));
    assert_eq!(report.summary.overall_risk_level, RiskLevel::Unknown);
    assert!(
        report.evidence.is_empty(),
        "failed job must expose no partial evidence"
    );
    assert!(report
        .summary
        .recommendations
        .iter()
        .any(|r| r.contains("reanalysis")));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_retrieval_hits_the_deadline() {
    let engine = engine_over(Arc::new(StalledSource));

    let outcome = engine.submit(pdf_request("uploads/slow.pdf")).await.unwrap();
    let job = wait_terminal(&engine, &outcome.job().fingerprint).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.failure, Some(FailureKind::Timeout));
}

#[tokio::test]
async fn test_failed_job_is_terminal_for_resubmission() {
    let (source, fetches) = CountingSource::new(&[]);
    let engine = engine_over(source);

    let first = engine.submit(pdf_request("uploads/gone.pdf")).await.unwrap();
    wait_terminal(&engine, &first.job().fingerprint).await;

    let second = engine.submit(pdf_request("uploads/gone.pdf")).await.unwrap();
    match second {
        SubmitOutcome::AlreadyAnalyzed(job) => {
            assert_eq!(job.status, JobStatus::Failed, "failure must stick");
        }
        other => panic!("expected AlreadyAnalyzed for failed job, got {:?}", other),
    }
    assert_eq!(
        fetches.load(Ordering::SeqCst),
        1,
        "resubmission must not retry a failed job by itself"
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Section 4: Reanalysis
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_reanalyze_replaces_job_and_runs_again() {
    let pdf = clean_pdf();
    let (source, fetches) = CountingSource::new(&[("uploads/filing.pdf", &pdf)]);
    let engine = engine_over(source);

    let first = engine.submit(pdf_request("uploads/filing.pdf")).await.unwrap();
    let fingerprint = first.job().fingerprint.clone();
    wait_terminal(&engine, &fingerprint).await;

    let fresh = engine.reanalyze(&fingerprint).await.unwrap();
    assert_ne!(fresh.id, first.job().id, "reanalysis must mint a new job");

    let job = wait_terminal(&engine, &fingerprint).await;
    assert_eq!(job.id, fresh.id);
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        fetches.load(Ordering::SeqCst),
        2,
        "reanalysis runs the full pipeline again"
    );

    let report = engine.report(&fingerprint).await.unwrap();
    assert_eq!(report.summary.total_signals, 1, "old evidence must be gone");
}

#[tokio::test]
async fn test_reanalyze_refuses_inflight_and_unknown_jobs() {
    let pdf = clean_pdf();
    let (source, _) = CountingSource::new(&[("uploads/filing.pdf", &pdf)]);
    let engine = VerdictEngine::with_parts(
        EngineConfig::default(),
        source,
        Arc::new(MemoryJobStore::new()),
        Arc::new(MemoryEvidenceSink::new()),
        Arc::new(NoopScheduler),
    );

    let outcome = engine.submit(pdf_request("uploads/filing.pdf")).await.unwrap();
    let err = engine
        .reanalyze(&outcome.job().fingerprint)
        .await
        .unwrap_err();
    assert!(
        matches!(err, PramanaError::InvalidState(_)),
        "in-flight job must not be reset: {:?}",
        err
    );

    let err = engine
        .reanalyze(&Fingerprint::identify(b"never submitted"))
        .await
        .unwrap_err();
    assert!(matches!(err, PramanaError::JobNotFound(_)));
}
