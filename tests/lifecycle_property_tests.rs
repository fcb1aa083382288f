//! Property-based tests for the document lifecycle and batch alignment
//!
//! The state machine has only three states, but the interesting failures come
//! from arbitrary sequences of actions and arbitrary mixes of ids in a batch.
//! These tests generate both and check the invariants that must hold for every
//! sequence:
//!
//! 1. Status never regresses and never skips SUBMITTED
//! 2. History grows by exactly one entry per successful transition
//! 3. A rejected transition leaves the document untouched
//! 4. Batch outcomes are index-aligned with the input ids
//! 5. The registry holds exactly one record per approved document

use document_approval::{
    BatchProcessor, Document, DocumentAction, DocumentId, DocumentStatus, OutcomeStatus, Store,
};
use proptest::prelude::*;
use std::sync::Arc;

/// Strategy to generate a lifecycle action
fn action_strategy() -> impl Strategy<Value = DocumentAction> {
    prop::bool::ANY.prop_map(|b| {
        if b {
            DocumentAction::Submit
        } else {
            DocumentAction::Approve
        }
    })
}

fn rank(status: DocumentStatus) -> u8 {
    match status {
        DocumentStatus::Draft => 0,
        DocumentStatus::Submitted => 1,
        DocumentStatus::Approved => 2,
    }
}

/// What a batch id points at
#[derive(Debug, Clone, Copy)]
enum Slot {
    Draft,
    Submitted,
    Approved,
    Missing,
}

fn slot_strategy() -> impl Strategy<Value = Slot> {
    prop_oneof![
        Just(Slot::Draft),
        Just(Slot::Submitted),
        Just(Slot::Approved),
        Just(Slot::Missing),
    ]
}

fn expected_status(slot: Slot, action: DocumentAction) -> OutcomeStatus {
    match (slot, action) {
        (Slot::Missing, _) => OutcomeStatus::NotFound,
        (Slot::Draft, DocumentAction::Submit) => OutcomeStatus::Success,
        (Slot::Submitted, DocumentAction::Approve) => OutcomeStatus::Success,
        _ => OutcomeStatus::Conflict,
    }
}

// PROPERTY TESTS
proptest! {
    // each batch case opens its own sled database
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: any action sequence moves the status forward one step at a time
    #[test]
    fn prop_status_only_advances(
        actions in prop::collection::vec(action_strategy(), 0..=12)
    ) {
        let mut doc = Document::new(1, "DOC-00000001".into(), "a".into(), "t".into());

        for action in actions {
            let before = doc.clone();
            match doc.apply(action, "user", None) {
                Ok(()) => {
                    prop_assert_eq!(rank(doc.status()), rank(before.status()) + 1);
                    prop_assert_eq!(doc.history().len(), before.history().len() + 1);
                    prop_assert_eq!(doc.history().last().map(|h| h.action), Some(action));
                }
                Err(_) => {
                    prop_assert_eq!(&doc, &before, "rejected transition changed the document");
                }
            }
        }

        // history is exactly the prefix of SUBMIT, APPROVE that was reached
        let actions: Vec<_> = doc.history().iter().map(|h| h.action).collect();
        let expected = [DocumentAction::Submit, DocumentAction::Approve];
        prop_assert_eq!(&actions[..], &expected[..actions.len()]);
        prop_assert_eq!(rank(doc.status()) as usize, actions.len());
    }

    /// Property: outcomes line up with ids for any mix of states and unknown ids
    #[test]
    fn prop_batch_outcomes_are_aligned(
        slots in prop::collection::vec(slot_strategy(), 0..=16),
        action in action_strategy(),
    ) {
        let store = Arc::new(Store::temporary().unwrap());
        let processor = BatchProcessor::new(Arc::clone(&store));

        // one fresh document per slot, so repeated ids never interfere
        let mut ids: Vec<DocumentId> = vec![];
        for (i, slot) in slots.iter().enumerate() {
            let id = match slot {
                Slot::Missing => 1_000_000 + i as DocumentId,
                _ => store.create_document("alice", "t").unwrap().id(),
            };
            if matches!(slot, Slot::Submitted | Slot::Approved) {
                processor.process_batch(DocumentAction::Submit, &[id], "alice", None);
            }
            if matches!(slot, Slot::Approved) {
                processor.process_batch(DocumentAction::Approve, &[id], "bob", None);
            }
            ids.push(id);
        }
        let registry_before = store.registry_len();

        let outcomes = processor.process_batch(action, &ids, "carol", Some("prop"));

        prop_assert_eq!(outcomes.len(), ids.len());
        for ((outcome, id), slot) in outcomes.iter().zip(&ids).zip(&slots) {
            prop_assert_eq!(outcome.document_id, *id);
            prop_assert_eq!(outcome.status, expected_status(*slot, action));
        }

        let newly_approved = outcomes
            .iter()
            .filter(|o| o.is_success() && action == DocumentAction::Approve)
            .count();
        prop_assert_eq!(store.registry_len(), registry_before + newly_approved);

        for id in &ids {
            if let Some(doc) = store.find_by_id(*id).unwrap() {
                let has_record = store.find_registry_record(*id).unwrap().is_some();
                prop_assert_eq!(has_record, doc.status() == DocumentStatus::Approved);
            }
        }
    }
}
