//! Document approval: a draft → submitted → approved lifecycle where every
//! transition of a document happens at most once, and every approval writes
//! exactly one registry record in the same commit.

pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod lock;
pub mod outcome;
pub mod probe;
pub mod registry;
pub mod service;
pub mod store;
pub mod timestamp;
pub mod transition;
pub mod utils;
pub mod worker;

pub use batch::{BatchProcessor, BatchRequest};
pub use document::{Document, DocumentAction, DocumentId, DocumentStatus, HistoryEntry};
pub use outcome::{BatchSummary, Outcome, OutcomeStatus};
pub use store::Store;
