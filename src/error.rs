use super::document::{DocumentAction, DocumentId, DocumentStatus};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Author is required")]
    MissingAuthor,
    #[error("Title is required")]
    MissingTitle,
    #[error("User ID is required")]
    MissingUser,
    #[error("Document IDs list must contain between 1 and {max} items, got {got}")]
    BatchSize { got: usize, max: usize },
    #[error("Page size must be at least 1")]
    EmptyPage,
    #[error("Date range is inverted: from is after to")]
    InvertedRange,
    #[error("{0} must be at least 1")]
    NotPositive(&'static str),
}

/// Why a single transition attempt on one document did not succeed.
///
/// Batch processing maps each variant onto an outcome status, so callers never
/// need to look at the message text to classify a failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Document {0} not found")]
    NotFound(DocumentId),
    #[error("Document must be in {expected} status to {action}, found {found}")]
    InvalidState {
        id: DocumentId,
        action: DocumentAction,
        expected: DocumentStatus,
        found: DocumentStatus,
    },
    #[error("Failed to create registry entry for document {id}: {reason}")]
    RegistryConflict { id: DocumentId, reason: String },
    #[error("Transition failed: {0}")]
    TransientFailure(String),
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Sled(#[from] sled::Error),
    #[error("Failed to encode record: {0}")]
    Encode(String),
    #[error("Failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("Approval registry already holds a record for document {0}")]
    DuplicateRegistryRecord(DocumentId),
    #[error("Could not allocate a unique document code after {0} attempts")]
    CodeExhausted(usize),
    #[error("Malformed key in {tree}: expected 8 bytes, got {len}")]
    MalformedKey { tree: &'static str, len: usize },
}

/// Errors surfaced by the document service outside of batch processing.
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TransitionError {
    pub fn transient(err: impl std::fmt::Display) -> Self {
        TransitionError::TransientFailure(err.to_string())
    }
}
