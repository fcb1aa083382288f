//! Batch transition processing
use super::document::{DocumentAction, DocumentId};
use super::error::{TransitionError, ValidationError};
use super::outcome::{BatchSummary, Outcome};
use super::registry::RegisterApproval;
use super::store::Store;
use super::transition::SideEffect;
use std::sync::Arc;

pub const MAX_BATCH_SIZE: usize = 1000;

/// What an external caller asks for. [`BatchProcessor::process_batch`] does
/// not validate; callers run [`BatchRequest::validate`] first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub ids: Vec<DocumentId>,
    pub user_id: String,
    pub comment: Option<String>,
}

impl BatchRequest {
    pub fn new(ids: Vec<DocumentId>, user_id: impl Into<String>) -> Self {
        Self {
            ids,
            user_id: user_id.into(),
            comment: None,
        }
    }
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ids.is_empty() || self.ids.len() > MAX_BATCH_SIZE {
            return Err(ValidationError::BatchSize {
                got: self.ids.len(),
                max: MAX_BATCH_SIZE,
            });
        }
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::MissingUser);
        }
        Ok(())
    }
}

/// Runs one exclusive transition per id. Ids never share a transaction, so
/// one id's failure can't affect another's.
pub struct BatchProcessor {
    store: Arc<Store>,
}

impl BatchProcessor {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// One outcome per input id, `outcomes[i]` for `ids[i]`.
    #[tracing::instrument(
        skip_all,
        fields(action = %action, count = ids.len(), user_id = %user_id)
    )]
    pub fn process_batch(
        &self,
        action: DocumentAction,
        ids: &[DocumentId],
        user_id: &str,
        comment: Option<&str>,
    ) -> Vec<Outcome> {
        tracing::info!("Processing batch");

        let outcomes: Vec<Outcome> = ids
            .iter()
            .map(|&id| self.process_one(action, id, user_id, comment))
            .collect();

        let summary = BatchSummary::from_outcomes(&outcomes);
        tracing::info!(
            success = summary.success,
            failed = summary.failed(),
            "Batch completed"
        );

        outcomes
    }

    /// Runs a validated request; the user id is trimmed.
    pub fn submit(&self, request: &BatchRequest) -> Vec<Outcome> {
        self.process_batch(
            DocumentAction::Submit,
            &request.ids,
            request.user_id.trim(),
            request.comment.as_deref(),
        )
    }

    pub fn approve(&self, request: &BatchRequest) -> Vec<Outcome> {
        self.process_batch(
            DocumentAction::Approve,
            &request.ids,
            request.user_id.trim(),
            request.comment.as_deref(),
        )
    }

    fn process_one(
        &self,
        action: DocumentAction,
        id: DocumentId,
        user_id: &str,
        comment: Option<&str>,
    ) -> Outcome {
        let result = match action {
            DocumentAction::Submit => {
                self.store
                    .run_transition(id, |doc| doc.submit(user_id, comment), None)
            }
            DocumentAction::Approve => {
                let effect = RegisterApproval::new(user_id);
                self.store.run_transition(
                    id,
                    |doc| doc.approve(user_id, comment),
                    Some(&effect as &dyn SideEffect),
                )
            }
        };

        match &result {
            Ok(_) => tracing::debug!(document_id = id, "Transition applied"),
            Err(TransitionError::NotFound(_)) => {
                tracing::warn!(document_id = id, "Document not found")
            }
            Err(err @ TransitionError::InvalidState { .. }) => {
                tracing::warn!(document_id = id, error = %err, "Transition rejected")
            }
            Err(err @ TransitionError::RegistryConflict { .. }) => {
                tracing::error!(document_id = id, error = %err, "Registry error")
            }
            Err(err @ TransitionError::TransientFailure(_)) => {
                tracing::error!(document_id = id, error = %err, "Transition failed")
            }
        }

        Outcome::from_result(id, action, &result)
    }
}
