//! Documents, their history and the lifecycle state machine
use super::error::TransitionError;
use super::timestamp::TimeStamp;
use std::fmt;
use std::str::FromStr;

pub type DocumentId = u64;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentStatus {
    #[n(0)]
    Draft,
    #[n(1)]
    Submitted,
    #[n(2)]
    Approved,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentAction {
    #[n(0)]
    Submit,
    #[n(1)]
    Approve,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    #[n(0)]
    pub action: DocumentAction,
    #[n(1)]
    pub user_id: String,
    #[n(2)]
    pub comment: Option<String>,
    #[n(3)]
    pub timestamp: TimeStamp,
}

/// A document and its append-only history.
///
/// Status and history are only reachable through [`Document::submit`] and
/// [`Document::approve`], so a decoded or freshly built document can never
/// regress or skip a state.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Document {
    #[n(0)]
    id: DocumentId,
    #[n(1)]
    code: String, // DOC-XXXXXXXX, unique across the store
    #[n(2)]
    author: String,
    #[n(3)]
    title: String,
    #[n(4)]
    status: DocumentStatus,
    #[n(5)]
    created_at: TimeStamp,
    #[n(6)]
    updated_at: TimeStamp,
    #[n(7)]
    history: Vec<HistoryEntry>,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "DRAFT",
            DocumentStatus::Submitted => "SUBMITTED",
            DocumentStatus::Approved => "APPROVED",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(DocumentStatus::Draft),
            "SUBMITTED" => Ok(DocumentStatus::Submitted),
            "APPROVED" => Ok(DocumentStatus::Approved),
            _ => Err(format!("Invalid document status: {}", s)),
        }
    }
}

impl DocumentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentAction::Submit => "SUBMIT",
            DocumentAction::Approve => "APPROVE",
        }
    }
    /// The single status this action may start from.
    pub fn source_status(&self) -> DocumentStatus {
        match self {
            DocumentAction::Submit => DocumentStatus::Draft,
            DocumentAction::Approve => DocumentStatus::Submitted,
        }
    }
    pub fn target_status(&self) -> DocumentStatus {
        match self {
            DocumentAction::Submit => DocumentStatus::Submitted,
            DocumentAction::Approve => DocumentStatus::Approved,
        }
    }
}

impl fmt::Display for DocumentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SUBMIT" => Ok(DocumentAction::Submit),
            "APPROVE" => Ok(DocumentAction::Approve),
            _ => Err(format!("Invalid document action: {}", s)),
        }
    }
}

impl Document {
    /// A new draft with an empty history.
    pub fn new(id: DocumentId, code: String, author: String, title: String) -> Self {
        let now = TimeStamp::new();
        Self {
            id,
            code,
            author,
            title,
            status: DocumentStatus::Draft,
            created_at: now,
            updated_at: now,
            history: vec![],
        }
    }
    pub fn id(&self) -> DocumentId {
        self.id
    }
    pub fn code(&self) -> &str {
        &self.code
    }
    pub fn author(&self) -> &str {
        &self.author
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn status(&self) -> DocumentStatus {
        self.status
    }
    pub fn created_at(&self) -> TimeStamp {
        self.created_at
    }
    pub fn updated_at(&self) -> TimeStamp {
        self.updated_at
    }
    /// History in chronological order.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn submit(&mut self, user_id: &str, comment: Option<&str>) -> Result<(), TransitionError> {
        self.apply(DocumentAction::Submit, user_id, comment)
    }

    pub fn approve(&mut self, user_id: &str, comment: Option<&str>) -> Result<(), TransitionError> {
        self.apply(DocumentAction::Approve, user_id, comment)
    }

    /// Runs one lifecycle edge. Nothing is touched when the current status is
    /// not the action's source status.
    pub fn apply(
        &mut self,
        action: DocumentAction,
        user_id: &str,
        comment: Option<&str>,
    ) -> Result<(), TransitionError> {
        let expected = action.source_status();
        if self.status != expected {
            return Err(TransitionError::InvalidState {
                id: self.id,
                action,
                expected,
                found: self.status,
            });
        }

        let now = TimeStamp::new();
        self.status = action.target_status();
        self.updated_at = now;
        self.history.push(HistoryEntry {
            action,
            user_id: user_id.to_string(),
            comment: comment.map(str::to_string),
            timestamp: now,
        });

        Ok(())
    }
}
