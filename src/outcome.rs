//! Per-document results of a batch transition
use super::document::{DocumentAction, DocumentId};
use super::error::TransitionError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeStatus {
    Success,
    NotFound,
    Conflict,
    /// Approve only: the registry write failed and the approval was rolled back.
    RegistryError,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub document_id: DocumentId,
    pub status: OutcomeStatus,
    pub message: String,
}

/// Counts of each outcome status in one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub success: usize,
    pub not_found: usize,
    pub conflict: usize,
    pub registry_error: usize,
    pub error: usize,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Success => "SUCCESS",
            OutcomeStatus::NotFound => "NOT_FOUND",
            OutcomeStatus::Conflict => "CONFLICT",
            OutcomeStatus::RegistryError => "REGISTRY_ERROR",
            OutcomeStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Outcome {
    pub fn success(document_id: DocumentId, action: DocumentAction) -> Self {
        let message = match action {
            DocumentAction::Submit => "Document submitted successfully",
            DocumentAction::Approve => "Document approved successfully",
        };
        Self {
            document_id,
            status: OutcomeStatus::Success,
            message: message.to_string(),
        }
    }
    pub fn not_found(document_id: DocumentId) -> Self {
        Self {
            document_id,
            status: OutcomeStatus::NotFound,
            message: "Document not found".to_string(),
        }
    }
    pub fn conflict(document_id: DocumentId, message: impl Into<String>) -> Self {
        Self {
            document_id,
            status: OutcomeStatus::Conflict,
            message: message.into(),
        }
    }
    pub fn registry_error(document_id: DocumentId, message: impl Into<String>) -> Self {
        Self {
            document_id,
            status: OutcomeStatus::RegistryError,
            message: message.into(),
        }
    }
    pub fn error(document_id: DocumentId, message: impl Into<String>) -> Self {
        Self {
            document_id,
            status: OutcomeStatus::Error,
            message: message.into(),
        }
    }

    /// Classifies a transition result by error variant.
    pub fn from_result<T>(
        document_id: DocumentId,
        action: DocumentAction,
        result: &Result<T, TransitionError>,
    ) -> Self {
        match result {
            Ok(_) => Self::success(document_id, action),
            Err(TransitionError::NotFound(_)) => Self::not_found(document_id),
            Err(err @ TransitionError::InvalidState { .. }) => {
                Self::conflict(document_id, err.to_string())
            }
            Err(err @ TransitionError::RegistryConflict { .. }) => {
                Self::registry_error(document_id, err.to_string())
            }
            Err(err @ TransitionError::TransientFailure(_)) => {
                Self::error(document_id, err.to_string())
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.record(outcome.status);
        }
        summary
    }

    pub fn record(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Success => self.success += 1,
            OutcomeStatus::NotFound => self.not_found += 1,
            OutcomeStatus::Conflict => self.conflict += 1,
            OutcomeStatus::RegistryError => self.registry_error += 1,
            OutcomeStatus::Error => self.error += 1,
        }
    }

    pub fn merge(&mut self, other: &BatchSummary) {
        self.success += other.success;
        self.not_found += other.not_found;
        self.conflict += other.conflict;
        self.registry_error += other.registry_error;
        self.error += other.error;
    }

    pub fn total(&self) -> usize {
        self.success + self.failed()
    }

    pub fn failed(&self) -> usize {
        self.not_found + self.conflict + self.registry_error + self.error
    }
}
