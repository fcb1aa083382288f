//! The exclusive transition unit: lock, re-read, check, mutate, commit.
//!
//! Every state change of a persisted document goes through
//! [`Store::run_transition`]. The precondition is checked against the row
//! read while the lock is held, and the lock is only released after the
//! commit, so two attempts on the same id can never both see the old status.
use super::document::{Document, DocumentId};
use super::error::{StoreError, TransitionError};
use super::store::{CommitError, RegistryTx, Store};
use sled::transaction::ConflictableTransactionResult;

/// Extra work committed atomically with a transition.
///
/// Any error other than a conflict rolls back the document write as well and
/// is reported as a registry failure.
pub trait SideEffect {
    fn apply(
        &self,
        registry: &RegistryTx<'_>,
        document: &Document,
    ) -> ConflictableTransactionResult<(), StoreError>;
}

impl Store {
    /// Applies `transition` to document `id` under its exclusive lock.
    ///
    /// Returns the committed document. On any error nothing was written and
    /// the stored document is exactly as it was before the call.
    pub fn run_transition<F>(
        &self,
        id: DocumentId,
        transition: F,
        effect: Option<&dyn SideEffect>,
    ) -> Result<Document, TransitionError>
    where
        F: FnOnce(&mut Document) -> Result<(), TransitionError>,
    {
        let scope = self.exclusive(id);

        let mut document = scope
            .load()
            .map_err(TransitionError::transient)?
            .ok_or(TransitionError::NotFound(id))?;

        transition(&mut document)?;

        scope.commit(&document, effect).map_err(|err| match err {
            CommitError::Effect(err) => TransitionError::RegistryConflict {
                id,
                reason: err.to_string(),
            },
            CommitError::Storage(err) => TransitionError::transient(err),
        })?;

        Ok(document)
    }
}
