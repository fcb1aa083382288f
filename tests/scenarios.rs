use anyhow::Context;
use document_approval::registry::ApprovalRecord;
use document_approval::service::{DocumentService, NewDocument};
use document_approval::timestamp::TimeStamp;
use document_approval::{
    BatchRequest, DocumentAction, DocumentStatus, OutcomeStatus, Store,
};
use sled::open;
use std::sync::Arc;

use tempfile::{TempDir, tempdir}; // Use for test db cleanup.

// Sled locks its directory, so every test opens its own database under a
// fresh temp dir. The TempDir is returned so it outlives the store.
fn service(name: &str) -> anyhow::Result<(TempDir, Arc<Store>, DocumentService)> {
    let temp_dir = tempdir()?;
    let db = open(temp_dir.path().join(name))?;
    let store = Arc::new(Store::new(Arc::new(db))?);
    let service = DocumentService::new(Arc::clone(&store));
    Ok((temp_dir, store, service))
}

fn statuses(outcomes: &[document_approval::Outcome]) -> Vec<OutcomeStatus> {
    outcomes.iter().map(|o| o.status).collect()
}

#[test]
fn submit_and_approve_document() -> anyhow::Result<()> {
    let (_dir, store, service) = service("submit_and_approve.db")?;

    let doc = service.create_document(&NewDocument::new("alice", "Annual report"))?;
    assert!(doc.code().starts_with("DOC-"));

    let request = BatchRequest::new(vec![doc.id()], "alice").with_comment("ready for review");
    let outcomes = service
        .submit_documents(&request)
        .context("Document failed on submit: ")?;
    assert_eq!(statuses(&outcomes), vec![OutcomeStatus::Success]);

    let doc = service.get_document(doc.id())?;
    assert_eq!(doc.status(), DocumentStatus::Submitted);
    assert_eq!(doc.history().len(), 1);
    assert_eq!(doc.history()[0].comment.as_deref(), Some("ready for review"));

    let outcomes = service
        .approve_documents(&BatchRequest::new(vec![doc.id()], "bob"))
        .context("Document failed on approval: ")?;
    assert_eq!(statuses(&outcomes), vec![OutcomeStatus::Success]);
    assert_eq!(outcomes[0].message, "Document approved successfully");

    let doc = service.get_document(doc.id())?;
    assert_eq!(doc.status(), DocumentStatus::Approved);
    assert_eq!(doc.history().len(), 2);
    assert_eq!(doc.history()[1].action, DocumentAction::Approve);

    let record = store
        .find_registry_record(doc.id())?
        .context("approval left no registry record")?;
    assert_eq!(record.approved_by, "bob");
    assert_eq!(store.registry_len(), 1);

    Ok(())
}

#[test]
fn mixed_batch_keeps_input_order() -> anyhow::Result<()> {
    let (_dir, _store, service) = service("mixed_batch.db")?;

    let draft = service.create_document(&NewDocument::new("alice", "draft"))?;
    let submitted = service.create_document(&NewDocument::new("alice", "submitted"))?;
    service.submit_documents(&BatchRequest::new(vec![submitted.id()], "alice"))?;

    let outcomes = service.submit_documents(&BatchRequest::new(
        vec![draft.id(), 99_999, submitted.id()],
        "alice",
    ))?;

    let ids: Vec<_> = outcomes.iter().map(|o| o.document_id).collect();
    assert_eq!(ids, vec![draft.id(), 99_999, submitted.id()]);
    assert_eq!(
        statuses(&outcomes),
        vec![
            OutcomeStatus::Success,
            OutcomeStatus::NotFound,
            OutcomeStatus::Conflict
        ]
    );

    // the conflicting document kept its single history entry
    assert_eq!(service.get_document(submitted.id())?.history().len(), 1);

    Ok(())
}

#[test]
fn approve_with_mixed_statuses_is_partial() -> anyhow::Result<()> {
    let (_dir, store, service) = service("partial_approve.db")?;

    let mut submitted = vec![];
    for i in 0..5 {
        let doc = service.create_document(&NewDocument::new("alice", format!("s{i}")))?;
        submitted.push(doc.id());
    }
    service.submit_documents(&BatchRequest::new(submitted.clone(), "alice"))?;

    let mut drafts = vec![];
    for i in 0..3 {
        let doc = service.create_document(&NewDocument::new("alice", format!("d{i}")))?;
        drafts.push(doc.id());
    }

    let mut ids = submitted.clone();
    ids.extend(&drafts);
    let outcomes = service.approve_documents(&BatchRequest::new(ids, "bob"))?;

    assert_eq!(outcomes.len(), 8);
    let success = outcomes.iter().filter(|o| o.is_success()).count();
    let conflict = outcomes
        .iter()
        .filter(|o| o.status == OutcomeStatus::Conflict)
        .count();
    assert_eq!(success, 5);
    assert_eq!(conflict, 3);

    for id in drafts {
        assert_eq!(store.find_registry_record(id)?, None);
        assert_eq!(service.get_document(id)?.status(), DocumentStatus::Draft);
    }
    assert_eq!(store.registry_len(), 5);

    Ok(())
}

#[test]
fn repeated_approval_never_adds_registry_records() -> anyhow::Result<()> {
    let (_dir, store, service) = service("repeated_approve.db")?;

    let doc = service.create_document(&NewDocument::new("alice", "t"))?;
    let request = BatchRequest::new(vec![doc.id()], "bob");
    service.submit_documents(&request)?;
    service.approve_documents(&request)?;

    for _ in 0..5 {
        let outcomes = service.approve_documents(&request)?;
        assert_eq!(statuses(&outcomes), vec![OutcomeStatus::Conflict]);
    }

    assert_eq!(store.registry_len(), 1);
    assert_eq!(service.get_document(doc.id())?.history().len(), 2);

    Ok(())
}

#[test]
fn registry_failure_rolls_back_approval() -> anyhow::Result<()> {
    let (_dir, store, service) = service("registry_failure.db")?;

    let doc = service.create_document(&NewDocument::new("alice", "t"))?;
    service.submit_documents(&BatchRequest::new(vec![doc.id()], "alice"))?;
    let before = service.get_document(doc.id())?;

    // a leftover record makes the registry insert hit its uniqueness check
    store.insert_registry_record(&ApprovalRecord::new(
        doc.id(),
        "ghost".into(),
        TimeStamp::new(),
    ))?;

    let outcomes = service.approve_documents(&BatchRequest::new(vec![doc.id()], "bob"))?;
    assert_eq!(statuses(&outcomes), vec![OutcomeStatus::RegistryError]);

    let after = service.get_document(doc.id())?;
    assert_eq!(after, before);
    assert_eq!(after.status(), DocumentStatus::Submitted);
    assert_eq!(store.registry_len(), 1);

    Ok(())
}

#[test]
fn unknown_ids_are_not_found_for_both_actions() -> anyhow::Result<()> {
    let (_dir, _store, service) = service("unknown_ids.db")?;

    let request = BatchRequest::new(vec![404, 405], "alice");
    for outcomes in [
        service.submit_documents(&request)?,
        service.approve_documents(&request)?,
    ] {
        assert_eq!(
            statuses(&outcomes),
            vec![OutcomeStatus::NotFound, OutcomeStatus::NotFound]
        );
        assert!(outcomes.iter().all(|o| o.message == "Document not found"));
    }

    Ok(())
}

#[test]
fn state_survives_reopen() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("reopen.db");

    let id = {
        let store = Arc::new(Store::new(Arc::new(open(&db_path)?))?);
        let service = DocumentService::new(Arc::clone(&store));
        let doc = service.create_document(&NewDocument::new("alice", "t"))?;
        service.submit_documents(&BatchRequest::new(vec![doc.id()], "alice"))?;
        store.flush()?;
        doc.id()
    };

    let store = Arc::new(Store::new(Arc::new(open(&db_path)?))?);
    let service = DocumentService::new(store);
    let doc = service.get_document(id)?;
    assert_eq!(doc.status(), DocumentStatus::Submitted);

    // ids keep increasing after a restart
    let next = service.create_document(&NewDocument::new("alice", "next"))?;
    assert!(next.id() > id);

    Ok(())
}
