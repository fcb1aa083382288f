//! Per-document exclusive locks.
//!
//! Documents hash onto a fixed set of mutex shards. A transition only ever
//! holds one shard, so two transitions can't wait on each other in a cycle.
//! Distinct ids that share a shard are serialized too, which costs throughput
//! but never correctness.
use super::document::DocumentId;
use parking_lot::{Mutex, MutexGuard};

pub const DEFAULT_SHARDS: usize = 256;

pub struct LockTable {
    shards: Box<[Mutex<()>]>,
}

/// Held for as long as one document's row is locked.
pub struct DocumentLock<'a> {
    id: DocumentId,
    _guard: MutexGuard<'a, ()>,
}

impl LockTable {
    pub fn new(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            shards: (0..shards).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Blocks until the shard owning `id` is free.
    pub fn lock(&self, id: DocumentId) -> DocumentLock<'_> {
        let guard = self.shards[self.shard_of(id)].lock();
        DocumentLock { id, _guard: guard }
    }

    pub fn try_lock(&self, id: DocumentId) -> Option<DocumentLock<'_>> {
        self.shards[self.shard_of(id)]
            .try_lock()
            .map(|guard| DocumentLock { id, _guard: guard })
    }

    fn shard_of(&self, id: DocumentId) -> usize {
        (id % self.shards.len() as u64) as usize
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new(DEFAULT_SHARDS)
    }
}

impl DocumentLock<'_> {
    pub fn id(&self) -> DocumentId {
        self.id
    }
}
