//! Background worker — claims a job, runs it, lands the outcome
//!
//! The worker is deliberately pessimistic about shared state: it only
//! proceeds after winning the pending→processing transition, the whole
//! analysis runs inside a spawned task under the configured deadline, and
//! evidence is appended in one batch so a job either shows its complete
//! signal set or nothing.

use super::EngineDeps;
use crate::job::{AnalysisJob, FailureKind, JobStatus};
use crate::signal::Signal;
use crate::verdict::{self, Verdict};
use crate::{PramanaError, PramanaResult};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Run one job to a terminal state. Safe to call for jobs someone else
/// already picked up: losing the claim is a quiet no-op.
pub async fn execute_job(deps: Arc<EngineDeps>, job_id: Uuid) {
    // ── Step 1: claim the job ──
    if !deps
        .store
        .transition(job_id, JobStatus::Pending, JobStatus::Processing)
        .await
    {
        tracing::debug!("job {} already claimed or finished, skipping", job_id);
        return;
    }
    let Some(job) = deps.store.get_by_id(job_id).await else {
        tracing::warn!("job {} vanished after claim", job_id);
        return;
    };

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!(
        "job {}: {} artifact {}",
        job.id,
        job.modality,
        job.fingerprint.short()
    );
    tracing::info!("═══════════════════════════════════════════════════════");

    // ── Step 2: run the analysis under the deadline ──
    // The inner task keeps worker state out of the panic blast radius: a
    // panicking analyzer surfaces as a JoinError here.
    let deadline_secs = deps.config.limits.analysis_timeout_secs;
    let mut handle = tokio::spawn(run_analysis(Arc::clone(&deps), job));

    let outcome = match tokio::time::timeout(Duration::from_secs(deadline_secs), &mut handle).await
    {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(PramanaError::Extraction(format!(
            "analysis task died: {}",
            join_err
        ))),
        Err(_) => {
            handle.abort();
            Err(PramanaError::Timeout(deadline_secs))
        }
    };

    // ── Step 3: land the outcome ──
    match outcome {
        Ok((verdict, confidence, signals)) => {
            deps.sink.append(job_id, signals).await;
            if deps.store.complete(job_id, verdict, confidence).await {
                tracing::info!("job {} completed: {} ({:.2})", job_id, verdict, confidence);
            } else {
                // The row changed under us; take the evidence back out so
                // no reader sees signals for a job that never completed.
                deps.sink.discard(job_id).await;
                tracing::warn!("job {} refused completion, evidence discarded", job_id);
            }
        }
        Err(e) => {
            let kind = failure_kind(&e);
            deps.sink.discard(job_id).await;
            deps.store.fail(job_id, kind).await;
            tracing::warn!("job {} failed ({}): {}", job_id, kind, e);
        }
    }
}

/// Fetch, extract, aggregate. Pure with respect to the store: all writes
/// happen in `execute_job` after this returns.
async fn run_analysis(
    deps: Arc<EngineDeps>,
    job: AnalysisJob,
) -> PramanaResult<(Verdict, f64, Vec<Signal>)> {
    let content = deps.source.fetch(&job.storage_path).await?;
    tracing::debug!(
        "job {}: fetched {} bytes from {}",
        job.id,
        content.len(),
        job.storage_path
    );

    let signals = deps
        .analyzers
        .extract(job.modality, &content, job.baseline.as_ref())
        .await?;

    let (verdict, confidence) = verdict::aggregate(&signals)?;
    Ok((verdict, confidence, signals))
}

fn failure_kind(error: &PramanaError) -> FailureKind {
    match error {
        PramanaError::Timeout(_) => FailureKind::Timeout,
        PramanaError::Retrieval(_) => FailureKind::Retrieval,
        _ => FailureKind::Analysis,
    }
}
