//! Fires many concurrent approvals at one document and tallies the outcomes.
//!
//! A healthy store always reports exactly one success.
use super::batch::BatchProcessor;
use super::document::{DocumentAction, DocumentId, DocumentStatus};
use super::error::{ServiceError, TransitionError, ValidationError};
use super::outcome::{BatchSummary, Outcome};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const PROBE_USER: &str = "test-user";
pub const PROBE_COMMENT: &str = "Concurrent test approval";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub document_id: DocumentId,
    pub success: usize,
    pub conflict: usize,
    pub not_found: usize,
    pub registry_error: usize,
    pub error: usize,
    /// `None` if the document disappeared during the run
    pub final_status: Option<DocumentStatus>,
}

pub fn probe_concurrent_approve(
    processor: &BatchProcessor,
    id: DocumentId,
    threads: usize,
    attempts: usize,
) -> Result<ProbeReport, ServiceError> {
    if threads == 0 {
        return Err(ValidationError::NotPositive("threads").into());
    }
    if attempts == 0 {
        return Err(ValidationError::NotPositive("attempts").into());
    }

    let document = processor
        .store()
        .find_by_id(id)?
        .ok_or(TransitionError::NotFound(id))?;
    if document.status() != DocumentStatus::Submitted {
        return Err(TransitionError::InvalidState {
            id,
            action: DocumentAction::Approve,
            expected: DocumentStatus::Submitted,
            found: document.status(),
        }
        .into());
    }

    tracing::info!(document_id = id, threads, attempts, "Starting concurrent approval probe");

    let remaining = AtomicUsize::new(attempts);
    let totals = Mutex::new(BatchSummary::default());

    std::thread::scope(|scope| {
        for _ in 0..threads.min(attempts) {
            scope.spawn(|| {
                let mut local = BatchSummary::default();
                while take_attempt(&remaining) {
                    let outcome = processor
                        .process_batch(
                            DocumentAction::Approve,
                            &[id],
                            PROBE_USER,
                            Some(PROBE_COMMENT),
                        )
                        .pop()
                        .unwrap_or_else(|| Outcome::error(id, "batch returned no outcome"));
                    local.record(outcome.status);
                }
                totals.lock().merge(&local);
            });
        }
    });

    let totals = totals.into_inner();
    let final_status = processor.store().find_by_id(id)?.map(|d| d.status());

    let report = ProbeReport {
        document_id: id,
        success: totals.success,
        conflict: totals.conflict,
        not_found: totals.not_found,
        registry_error: totals.registry_error,
        error: totals.error,
        final_status,
    };
    tracing::info!(?report, "Concurrent approval probe completed");

    Ok(report)
}

// claims one attempt, false once none are left
fn take_attempt(remaining: &AtomicUsize) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}
