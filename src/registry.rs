//! Approval registry records and the side effect that writes them
use super::document::{Document, DocumentId};
use super::error::StoreError;
use super::store::RegistryTx;
use super::timestamp::TimeStamp;
use super::transition::SideEffect;
use sled::transaction::ConflictableTransactionResult;

/// One row per approved document, keyed by document id.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRecord {
    #[n(0)]
    pub document_id: DocumentId,
    #[n(1)]
    pub approved_by: String,
    #[n(2)]
    pub approved_at: TimeStamp,
}

/// Inserts the registry record for a document the transition just approved.
pub struct RegisterApproval {
    approved_by: String,
}

impl ApprovalRecord {
    pub fn new(document_id: DocumentId, approved_by: String, approved_at: TimeStamp) -> Self {
        Self {
            document_id,
            approved_by,
            approved_at,
        }
    }
}

impl RegisterApproval {
    pub fn new(approved_by: impl Into<String>) -> Self {
        Self {
            approved_by: approved_by.into(),
        }
    }
}

impl SideEffect for RegisterApproval {
    fn apply(
        &self,
        registry: &RegistryTx<'_>,
        document: &Document,
    ) -> ConflictableTransactionResult<(), StoreError> {
        // stamped with the approval time so the record and the history entry agree
        let record = ApprovalRecord::new(
            document.id(),
            self.approved_by.clone(),
            document.updated_at(),
        );
        registry.insert_record(&record)
    }
}
