//! Service layer API for document workflow operations
use super::batch::{BatchProcessor, BatchRequest};
use super::document::{DocumentAction, Document, DocumentId, HistoryEntry};
use super::error::{ServiceError, TransitionError, ValidationError};
use super::outcome::Outcome;
use super::store::{DocumentFilter, Page, Store};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub author: String,
    pub title: String,
}

pub struct DocumentService {
    processor: Arc<BatchProcessor>,
}

impl NewDocument {
    pub fn new(author: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            title: title.into(),
        }
    }
    // trims both fields, rejects blanks
    fn normalised(&self) -> Result<(&str, &str), ValidationError> {
        let author = self.author.trim();
        let title = self.title.trim();
        if author.is_empty() {
            return Err(ValidationError::MissingAuthor);
        }
        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        Ok((author, title))
    }
}

fn validate_page(page: &Page) -> Result<(), ValidationError> {
    if page.size == 0 {
        return Err(ValidationError::EmptyPage);
    }
    Ok(())
}

fn validate_filter(filter: &DocumentFilter) -> Result<(), ValidationError> {
    validate_page(&filter.page)?;
    if let (Some(from), Some(to)) = (filter.created_from, filter.created_to) {
        if from > to {
            return Err(ValidationError::InvertedRange);
        }
    }
    Ok(())
}

impl DocumentService {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            processor: Arc::new(BatchProcessor::new(store)),
        }
    }

    pub fn processor(&self) -> &Arc<BatchProcessor> {
        &self.processor
    }

    fn store(&self) -> &Store {
        self.processor.store()
    }

    /// Create a new draft document
    pub fn create_document(&self, request: &NewDocument) -> Result<Document, ServiceError> {
        let (author, title) = request.normalised()?;
        tracing::debug!(author, title, "Creating document");

        let document = self.store().create_document(author, title)?;
        tracing::info!(
            document_id = document.id(),
            code = document.code(),
            "Document created"
        );

        Ok(document)
    }

    /// Fetch one document with its full history
    pub fn get_document(&self, id: DocumentId) -> Result<Document, ServiceError> {
        self.store()
            .find_by_id(id)?
            .ok_or_else(|| TransitionError::NotFound(id).into())
    }

    pub fn get_by_code(&self, code: &str) -> Result<Option<Document>, ServiceError> {
        Ok(self.store().find_by_code(code)?)
    }

    /// Fetch the existing documents among `ids`, highest id first
    pub fn get_documents(
        &self,
        ids: &[DocumentId],
        page: Page,
    ) -> Result<Vec<Document>, ServiceError> {
        validate_page(&page)?;
        Ok(self.store().find_by_ids(ids, page)?)
    }

    pub fn search(&self, filter: &DocumentFilter) -> Result<Vec<Document>, ServiceError> {
        validate_filter(filter)?;
        Ok(self.store().search(filter)?)
    }

    /// History of one document, most recent first
    pub fn history(&self, id: DocumentId) -> Result<Vec<HistoryEntry>, ServiceError> {
        let document = self.get_document(id)?;
        Ok(document.history().iter().rev().cloned().collect())
    }

    /// Validate the request, then submit each id independently
    pub fn submit_documents(&self, request: &BatchRequest) -> Result<Vec<Outcome>, ServiceError> {
        self.run(DocumentAction::Submit, request)
    }

    /// Validate the request, then approve each id independently
    pub fn approve_documents(&self, request: &BatchRequest) -> Result<Vec<Outcome>, ServiceError> {
        self.run(DocumentAction::Approve, request)
    }

    fn run(
        &self,
        action: DocumentAction,
        request: &BatchRequest,
    ) -> Result<Vec<Outcome>, ServiceError> {
        request.validate()?;
        Ok(match action {
            DocumentAction::Submit => self.processor.submit(request),
            DocumentAction::Approve => self.processor.approve(request),
        })
    }
}
