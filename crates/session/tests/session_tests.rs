//! Integration tests for docdb-session
//!
//! These tests exercise the session store the way the client uses it:
//! many operations recording and resolving tokens at the same time.
//!
//! 1. **Monotonicity** - stored LSNs never decrease, whatever the merge order
//! 2. **Concurrent merges** - racing writers converge on the maximum
//! 3. **Resolution** - id-based and name-based requests share one keyspace
//! 4. **Clearing** - delete followed by recreate starts from nothing

use proptest::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;

use docdb_core::constants::headers;
use docdb_core::{DocumentServiceRequest, DocumentServiceResponse, OperationType, ResourceId, ResourceType};
use docdb_session::{parse_composite, SessionContainer};

static_assertions::assert_impl_all!(SessionContainer: Send, Sync);

// ============================================================================
// Test Helpers
// ============================================================================

const DB_RID: u32 = 0x0063_abd4;

fn collection_rid(collection: u32) -> ResourceId {
    ResourceId::new_collection(DB_RID, collection | 0x80).unwrap()
}

fn document_request(collection: u32, op: OperationType) -> DocumentServiceRequest {
    let coll = collection_rid(collection);
    let doc = ResourceId::new_document(DB_RID, coll.collection(), 1).unwrap();
    let path = format!(
        "dbs/{}/colls/{}/docs/{}",
        ResourceId::new_database(DB_RID),
        coll,
        doc
    );
    DocumentServiceRequest::new(op, ResourceType::Document, path)
}

fn token_response(token: &str) -> DocumentServiceResponse {
    DocumentServiceResponse::new(200).with_header(headers::SESSION_TOKEN, token)
}

// ============================================================================
// Monotonicity
// ============================================================================

#[test]
fn test_out_of_order_tokens_keep_max() {
    let container = SessionContainer::new();
    let request = document_request(1, OperationType::Read);

    for token in ["0:5", "0:3", "1:7", "0:9", "1:2"] {
        container.set_session_token(&request, &token_response(token));
    }

    assert_eq!(
        container.resolve_session_token(&request).as_deref(),
        Some("0:9,1:7")
    );
}

proptest! {
    #[test]
    fn prop_stored_lsn_is_max_of_merged(lsns in proptest::collection::vec((0u8..4, any::<u32>()), 1..40)) {
        let container = SessionContainer::new();
        let key = collection_rid(1).unique_collection_id();

        for (range, lsn) in &lsns {
            container
                .merge_session_token(key, &format!("{}:{}", range, lsn))
                .unwrap();
        }

        for range in 0u8..4 {
            let expected = lsns
                .iter()
                .filter(|(r, _)| *r == range)
                .map(|(_, lsn)| u64::from(*lsn))
                .max();
            prop_assert_eq!(container.lsn(key, &range.to_string()), expected);
        }
    }

    #[test]
    fn prop_resolved_token_parses(lsns in proptest::collection::vec((0u8..8, any::<u64>()), 1..20)) {
        let container = SessionContainer::new();
        let request = document_request(2, OperationType::Read);
        for (range, lsn) in &lsns {
            container.set_session_token(&request, &token_response(&format!("{}:{}", range, lsn)));
        }

        let resolved = container.resolve_session_token(&request).unwrap();
        let tokens = parse_composite(&resolved).unwrap();
        let mut ranges: Vec<&str> = tokens.iter().map(|t| t.range_id()).collect();
        let before = ranges.clone();
        ranges.sort();
        ranges.dedup();
        prop_assert_eq!(ranges, before);
    }
}

// ============================================================================
// Concurrent Merges
// ============================================================================

#[test]
fn test_concurrent_merges_converge_on_max() {
    const THREADS: u64 = 8;
    const PER_THREAD: u64 = 500;

    let container = Arc::new(SessionContainer::new());
    let barrier = Arc::new(Barrier::new(THREADS as usize));
    let key = collection_rid(3).unique_collection_id();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let container = Arc::clone(&container);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..PER_THREAD {
                    let lsn = i * THREADS + t;
                    container
                        .merge_session_token(key, &format!("0:{},1:{}", lsn, PER_THREAD * THREADS - lsn))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(container.lsn(key, "0"), Some(PER_THREAD * THREADS - 1));
    assert_eq!(container.lsn(key, "1"), Some(PER_THREAD * THREADS));
}

#[test]
fn test_concurrent_collections_are_independent() {
    let container = Arc::new(SessionContainer::new());
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (1..=4u32)
        .map(|c| {
            let container = Arc::clone(&container);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let request = document_request(c, OperationType::Create);
                barrier.wait();
                for lsn in 0..200u64 {
                    container.set_session_token(&request, &token_response(&format!("0:{}", lsn * u64::from(c))));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(container.collection_count(), 4);
    for c in 1..=4u32 {
        let request = document_request(c, OperationType::Read);
        assert_eq!(
            container.resolve_session_token(&request),
            Some(format!("0:{}", 199 * u64::from(c)))
        );
    }
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_feed_request_resolves_owner_collection() {
    let container = SessionContainer::new();
    container.set_session_token(&document_request(5, OperationType::Create), &token_response("0:4"));

    let coll = collection_rid(5);
    let feed = DocumentServiceRequest::new(
        OperationType::ReadFeed,
        ResourceType::Document,
        format!("dbs/{}/colls/{}/docs", ResourceId::new_database(DB_RID), coll),
    );
    assert_eq!(container.resolve_session_token(&feed).as_deref(), Some("0:4"));
}

#[test]
fn test_unknown_name_resolves_nothing() {
    let container = SessionContainer::new();
    let request = DocumentServiceRequest::new(
        OperationType::Read,
        ResourceType::Document,
        "dbs/shop/colls/never-seen/docs/x",
    );
    assert_eq!(container.resolve_session_token(&request), None);
}

#[test]
fn test_name_index_populated_from_request_path() {
    let container = SessionContainer::new();
    let coll = collection_rid(6);
    let request = DocumentServiceRequest::new(
        OperationType::Upsert,
        ResourceType::Document,
        "dbs/shop/colls/carts/docs/c-1",
    );
    let response = token_response("0:12").with_header(headers::OWNER_ID, coll.to_text());
    container.set_session_token(&request, &response);

    assert_eq!(
        container.collection_id_for_name("dbs/shop/colls/carts"),
        Some(coll.unique_collection_id())
    );
    assert_eq!(container.resolve_session_token(&request).as_deref(), Some("0:12"));
}

// ============================================================================
// Clearing
// ============================================================================

#[test]
fn test_delete_then_recreate_starts_fresh() {
    let container = SessionContainer::new();
    let request = document_request(7, OperationType::Read);
    container.set_session_token(&request, &token_response("0:900"));

    let coll = collection_rid(7);
    let delete = DocumentServiceRequest::new(
        OperationType::Delete,
        ResourceType::DocumentCollection,
        format!("dbs/{}/colls/{}", ResourceId::new_database(DB_RID), coll),
    );
    container.clear_token(&delete);
    assert_eq!(container.resolve_session_token(&request), None);

    container.set_session_token(&request, &token_response("0:1"));
    assert_eq!(container.resolve_session_token(&request).as_deref(), Some("0:1"));
}
