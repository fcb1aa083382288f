//! Periodic submit and approve triggers.
//!
//! Each loop picks the oldest documents waiting for its action and hands
//! their ids to the batch processor. The workers own no state of their own;
//! the exclusive transition unit re-checks every id, so a document that moved
//! on between selection and processing just comes back as a conflict.
use super::batch::BatchProcessor;
use super::config::WorkerConfig;
use super::document::{DocumentAction, DocumentId};
use super::error::StoreError;
use super::outcome::BatchSummary;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub const SUBMIT_COMMENT: &str = "Auto-submitted by worker";
pub const APPROVE_COMMENT: &str = "Auto-approved by worker";

pub struct Worker {
    processor: Arc<BatchProcessor>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(processor: Arc<BatchProcessor>, config: WorkerConfig) -> Self {
        Self { processor, config }
    }

    /// One tick for `action`: select candidates and process them.
    pub fn run_once(&self, action: DocumentAction) -> Result<BatchSummary, StoreError> {
        let candidates = self
            .processor
            .store()
            .find_candidates_by_status(action.source_status(), self.config.batch_size)?;

        if candidates.is_empty() {
            tracing::debug!(%action, "No documents waiting");
            return Ok(BatchSummary::default());
        }

        let ids: Vec<DocumentId> = candidates.iter().map(|d| d.id()).collect();
        tracing::info!(%action, count = ids.len(), "Found documents to process");

        let started = Instant::now();
        let comment = match action {
            DocumentAction::Submit => SUBMIT_COMMENT,
            DocumentAction::Approve => APPROVE_COMMENT,
        };
        let outcomes =
            self.processor
                .process_batch(action, &ids, &self.config.system_user, Some(comment));
        let summary = BatchSummary::from_outcomes(&outcomes);

        tracing::info!(
            %action,
            duration_ms = started.elapsed().as_millis() as u64,
            success = summary.success,
            failed = summary.failed(),
            "Worker tick completed"
        );

        Ok(summary)
    }

    /// Starts the submit and approve loops. Both stop once `shutdown` is cancelled.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        let submit_every = self.config.submit_interval();
        let approve_every = self.config.approve_interval();

        vec![
            tokio::spawn(Arc::clone(&self).run_loop(
                DocumentAction::Submit,
                submit_every,
                shutdown.clone(),
            )),
            tokio::spawn(self.run_loop(DocumentAction::Approve, approve_every, shutdown)),
        ]
    }

    async fn run_loop(
        self: Arc<Self>,
        action: DocumentAction,
        every: Duration,
        shutdown: CancellationToken,
    ) {
        let mut interval = tokio::time::interval(every);
        // late ticks are pushed back, never bunched
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(%action, interval_ms = every.as_millis() as u64, "Worker started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let worker = Arc::clone(&self);
                    let tick = tokio::task::spawn_blocking(move || worker.run_once(action));
                    match tick.await {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => {
                            tracing::error!(
                                %action,
                                error = %e,
                                "Worker failed to select candidates"
                            );
                        }
                        Err(e) => {
                            tracing::error!(%action, error = %e, "Worker task panicked");
                        }
                    }
                }
                _ = shutdown.cancelled() => {
                    tracing::info!(%action, "Shutting down worker");
                    break;
                }
            }
        }
    }
}
