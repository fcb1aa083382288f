//! sled-backed persistence for documents and the approval registry
use super::document::{Document, DocumentId, DocumentStatus};
use super::error::StoreError;
use super::lock::{DocumentLock, LockTable};
use super::registry::ApprovalRecord;
use super::timestamp::TimeStamp;
use super::transition::SideEffect;
use super::utils;
use sled::Transactional;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionalTree,
};
use sled::{Db, Tree};
use std::path::Path;
use std::sync::Arc;

const DOCUMENTS: &str = "documents";
const CODES: &str = "document_codes";
const REGISTRY: &str = "approval_registry";

// codes are 32 bits of a hash, so collisions are possible but rare
const CODE_ATTEMPTS: usize = 16;

pub struct Store {
    instance: Arc<Db>,
    documents: Tree,
    codes: Tree,
    registry: Tree,
    locks: LockTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

/// Search criteria, all optional and combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub status: Option<DocumentStatus>,
    pub author: Option<String>,
    pub created_from: Option<TimeStamp>,
    pub created_to: Option<TimeStamp>,
    pub page: Page,
}

/// A locked view of one document row.
///
/// The lock is taken when the scope is opened and released when it is
/// dropped, whether or not [`ExclusiveScope::commit`] ran.
pub struct ExclusiveScope<'a> {
    store: &'a Store,
    lock: DocumentLock<'a>,
}

/// The approval registry as seen from inside a commit.
pub struct RegistryTx<'a> {
    tree: &'a TransactionalTree,
}

#[derive(thiserror::Error, Debug)]
pub enum CommitError {
    /// The side effect failed; nothing from this commit was written.
    #[error("side effect aborted: {0}")]
    Effect(StoreError),
    #[error("storage failure: {0}")]
    Storage(StoreError),
}

impl Default for Page {
    fn default() -> Self {
        Self { number: 0, size: 20 }
    }
}

impl Page {
    pub fn new(number: usize, size: usize) -> Self {
        Self { number, size }
    }
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.number.saturating_mul(self.size))
            .take(self.size)
            .collect()
    }
}

impl DocumentFilter {
    pub fn matches(&self, document: &Document) -> bool {
        if let Some(status) = self.status {
            if document.status() != status {
                return false;
            }
        }
        if let Some(author) = &self.author {
            if document.author() != author {
                return false;
            }
        }
        if let Some(from) = self.created_from {
            if document.created_at() < from {
                return false;
            }
        }
        if let Some(to) = self.created_to {
            if document.created_at() > to {
                return false;
            }
        }
        true
    }
}

impl Store {
    pub fn new(instance: Arc<Db>) -> Result<Self, StoreError> {
        let documents = instance.open_tree(DOCUMENTS)?;
        let codes = instance.open_tree(CODES)?;
        let registry = instance.open_tree(REGISTRY)?;

        Ok(Self {
            instance,
            documents,
            codes,
            registry,
            locks: LockTable::default(),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Self::new(Arc::new(db))
    }

    /// An in-memory store removed on drop.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::new(Arc::new(db))
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.instance.flush()?;
        Ok(())
    }

    /// Persists a new draft. Callers validate author and title.
    pub fn create_document(&self, author: &str, title: &str) -> Result<Document, StoreError> {
        // sled ids start at zero, document ids start at one
        let id = self.instance.generate_id()? + 1;
        let key = document_key(id);

        for _ in 0..CODE_ATTEMPTS {
            let document = Document::new(
                id,
                utils::new_document_code(),
                author.to_string(),
                title.to_string(),
            );
            let bytes = encode(&document)?;

            // the code mapping and the document land together or not at all
            let inserted = (&self.codes, &self.documents)
                .transaction(
                    |(codes, documents)| -> ConflictableTransactionResult<bool, StoreError> {
                        let code = document.code().as_bytes();
                        if codes.get(code)?.is_some() {
                            return Ok(false);
                        }
                        codes.insert(code, &key[..])?;
                        documents.insert(&key[..], bytes.as_slice())?;
                        Ok(true)
                    },
                )
                .map_err(flatten)?;

            if inserted {
                return Ok(document);
            }
            tracing::warn!(code = document.code(), "document code collision, regenerating");
        }
        Err(StoreError::CodeExhausted(CODE_ATTEMPTS))
    }

    /// Unlocked read.
    pub fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        match self.documents.get(&document_key(id)[..])? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn find_by_code(&self, code: &str) -> Result<Option<Document>, StoreError> {
        match self.codes.get(code.as_bytes())? {
            Some(key) => self.find_by_id(decode_key(CODES, &key)?),
            None => Ok(None),
        }
    }

    /// The documents among `ids` that exist, highest id first.
    pub fn find_by_ids(
        &self,
        ids: &[DocumentId],
        page: Page,
    ) -> Result<Vec<Document>, StoreError> {
        let mut ids = ids.to_vec();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        ids.dedup();

        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(document) = self.find_by_id(id)? {
                found.push(document);
            }
        }
        Ok(page.apply(found))
    }

    /// Newest first.
    pub fn search(&self, filter: &DocumentFilter) -> Result<Vec<Document>, StoreError> {
        let mut documents: Vec<Document> = self
            .scan_documents()?
            .into_iter()
            .filter(|d| filter.matches(d))
            .collect();

        documents.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });

        Ok(filter.page.apply(documents))
    }

    /// Up to `limit` documents in `status`, oldest first.
    ///
    /// This is a snapshot. Whoever acts on the result must re-check each
    /// document under its lock.
    pub fn find_candidates_by_status(
        &self,
        status: DocumentStatus,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError> {
        let mut candidates: Vec<Document> = self
            .scan_documents()?
            .into_iter()
            .filter(|d| d.status() == status)
            .collect();

        candidates.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        candidates.truncate(limit);

        Ok(candidates)
    }

    fn scan_documents(&self) -> Result<Vec<Document>, StoreError> {
        self.documents
            .iter()
            .values()
            .map(|bytes| decode::<Document>(&bytes?))
            .collect()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn find_registry_record(
        &self,
        id: DocumentId,
    ) -> Result<Option<ApprovalRecord>, StoreError> {
        match self.registry.get(&document_key(id)[..])? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn registry_len(&self) -> usize {
        self.registry.len()
    }

    /// Writes a registry record outside of any transition.
    ///
    /// Approvals never use this, they insert through [`RegistryTx`] inside
    /// their commit. Fails if a record already exists for the document.
    pub fn insert_registry_record(&self, record: &ApprovalRecord) -> Result<(), StoreError> {
        let bytes = encode(record)?;
        let swapped = self.registry.compare_and_swap(
            &document_key(record.document_id)[..],
            None as Option<&[u8]>,
            Some(bytes),
        )?;
        swapped.map_err(|_| StoreError::DuplicateRegistryRecord(record.document_id))
    }

    /// Locks `id`, blocking until any other scope on it is dropped.
    pub fn exclusive(&self, id: DocumentId) -> ExclusiveScope<'_> {
        ExclusiveScope {
            store: self,
            lock: self.locks.lock(id),
        }
    }
}

impl ExclusiveScope<'_> {
    pub fn id(&self) -> DocumentId {
        self.lock.id()
    }

    /// The authoritative state of the locked row.
    pub fn load(&self) -> Result<Option<Document>, StoreError> {
        self.store.find_by_id(self.id())
    }

    /// Writes `document` and runs `effect` in one sled transaction, then
    /// releases the lock. Either both land or neither does.
    ///
    /// Any failure inside `effect`, storage faults included, comes back as
    /// [`CommitError::Effect`]. Conflicts are still retried by sled.
    pub fn commit(
        self,
        document: &Document,
        effect: Option<&dyn SideEffect>,
    ) -> Result<(), CommitError> {
        debug_assert_eq!(document.id(), self.id());

        let key = document_key(self.id());
        let bytes = encode(document).map_err(CommitError::Storage)?;

        let result = (&self.store.documents, &self.store.registry).transaction(
            |(documents, registry)| -> ConflictableTransactionResult<(), StoreError> {
                documents.insert(&key[..], bytes.as_slice())?;
                if let Some(effect) = effect {
                    effect
                        .apply(&RegistryTx { tree: registry }, document)
                        .map_err(|err| match err {
                            ConflictableTransactionError::Storage(e) => {
                                ConflictableTransactionError::Abort(StoreError::Sled(e))
                            }
                            other => other,
                        })?;
                }
                Ok(())
            },
        );

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(err)) => Err(CommitError::Effect(err)),
            Err(TransactionError::Storage(err)) => Err(CommitError::Storage(err.into())),
        }
    }
}

impl RegistryTx<'_> {
    /// Aborts the surrounding commit if the document already has a record.
    pub fn insert_record(
        &self,
        record: &ApprovalRecord,
    ) -> ConflictableTransactionResult<(), StoreError> {
        let key = document_key(record.document_id);
        if self.tree.get(&key[..])?.is_some() {
            return Err(ConflictableTransactionError::Abort(
                StoreError::DuplicateRegistryRecord(record.document_id),
            ));
        }
        let bytes = encode(record).map_err(ConflictableTransactionError::Abort)?;
        self.tree.insert(&key[..], bytes)?;
        Ok(())
    }
}

fn flatten(err: TransactionError<StoreError>) -> StoreError {
    match err {
        TransactionError::Abort(err) => err,
        TransactionError::Storage(err) => err.into(),
    }
}

// big-endian so tree order is id order
fn document_key(id: DocumentId) -> [u8; 8] {
    id.to_be_bytes()
}

fn decode_key(tree: &'static str, bytes: &[u8]) -> Result<DocumentId, StoreError> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::MalformedKey {
            tree,
            len: bytes.len(),
        })?;
    Ok(DocumentId::from_be_bytes(raw))
}

fn encode<T: minicbor::Encode<()>>(value: &T) -> Result<Vec<u8>, StoreError> {
    minicbor::to_vec(value).map_err(|e| StoreError::Encode(e.to_string()))
}

fn decode<T: for<'b> minicbor::Decode<'b, ()>>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(minicbor::decode(bytes)?)
}
