//! Session token store
//!
//! Tracks, per collection, the highest LSN the client has observed on each
//! partition range, so that later reads can ask a replica to be at least that
//! fresh (read-your-writes under session consistency).
//!
//! # Design
//!
//! - Outer table: `DashMap<unique collection id, Arc<PartitionTokens>>`
//! - Inner table: `DashMap<range id, AtomicU64>`; merges are a
//!   compare-and-swap loop that only ever raises the stored LSN
//! - Name index: `DashMap<collection path, unique collection id>`, set-if-absent
//!
//! Readers never block writers and writers only contend on the CAS of the same
//! (collection, range) slot.
//!
//! # Staleness
//!
//! The name index is never invalidated by the service. If a collection is
//! deleted and recreated under the same name through another client, this
//! store keeps resolving the old identity until `clear_token` is called for
//! that name.

use dashmap::DashMap;
use docdb_core::constants::headers;
use docdb_core::types::is_reading_from_master;
use docdb_core::{paths, DocumentServiceRequest, DocumentServiceResponse, ResourceId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::token::{self, SessionToken};

/// Per-collection map of partition range id → highest LSN seen
#[derive(Debug, Default)]
pub struct PartitionTokens {
    lsns: DashMap<String, AtomicU64>,
}

impl PartitionTokens {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `lsn` for `range_id`, keeping the larger value
    ///
    /// Returns the LSN stored after the merge.
    pub fn merge(&self, range_id: &str, lsn: u64) -> u64 {
        if let Some(slot) = self.lsns.get(range_id) {
            return raise_to(slot.value(), lsn);
        }
        let slot = self
            .lsns
            .entry(range_id.to_owned())
            .or_insert_with(|| AtomicU64::new(0));
        raise_to(slot.value(), lsn)
    }

    /// Stored LSN for `range_id`
    pub fn get(&self, range_id: &str) -> Option<u64> {
        self.lsns.get(range_id).map(|slot| slot.load(Ordering::Acquire))
    }

    /// Number of ranges tracked
    pub fn len(&self) -> usize {
        self.lsns.len()
    }

    /// True when no range is tracked
    pub fn is_empty(&self) -> bool {
        self.lsns.is_empty()
    }

    /// Snapshot of all tokens, sorted by range id
    pub fn tokens(&self) -> Vec<SessionToken> {
        let mut tokens: Vec<SessionToken> = self
            .lsns
            .iter()
            .map(|entry| SessionToken::new(entry.key().clone(), entry.value().load(Ordering::Acquire)))
            .collect();
        tokens.sort();
        tokens
    }

    /// Composite token, or `None` when empty
    pub fn composite(&self) -> Option<String> {
        let tokens = self.tokens();
        if tokens.is_empty() {
            None
        } else {
            Some(token::format_composite(&tokens))
        }
    }
}

/// Raise `slot` to `lsn` unless it already holds something at least as large
fn raise_to(slot: &AtomicU64, lsn: u64) -> u64 {
    let mut current = slot.load(Ordering::Acquire);
    loop {
        if current >= lsn {
            return current;
        }
        match slot.compare_exchange_weak(current, lsn, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return lsn,
            Err(actual) => current = actual,
        }
    }
}

/// Session token store shared by all operations of one client
///
/// Thread safety: all methods take `&self` and may be called concurrently.
#[derive(Debug, Default)]
pub struct SessionContainer {
    tokens_by_collection: DashMap<u64, Arc<PartitionTokens>>,
    collection_ids_by_name: DashMap<String, u64>,
}

impl SessionContainer {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Composite session token for the collection `request` addresses
    ///
    /// Returns `None` when the request does not address a collection, when a
    /// name-based request names a collection never seen in a response, or when
    /// no token has been recorded yet.
    pub fn resolve_session_token(&self, request: &DocumentServiceRequest) -> Option<String> {
        let key = self.collection_key(request)?;
        self.session_token_for(key)
    }

    /// Composite session token for a unique collection id
    pub fn session_token_for(&self, unique_collection_id: u64) -> Option<String> {
        self.tokens_by_collection
            .get(&unique_collection_id)
            .and_then(|tokens| tokens.composite())
    }

    /// Stored LSN for one (collection, range) pair
    pub fn lsn(&self, unique_collection_id: u64, range_id: &str) -> Option<u64> {
        self.tokens_by_collection
            .get(&unique_collection_id)
            .and_then(|tokens| tokens.get(range_id))
    }

    /// Unique collection id recorded for a name-based collection path
    pub fn collection_id_for_name(&self, collection_path: &str) -> Option<u64> {
        let name = paths::collection_path(collection_path)?;
        self.collection_ids_by_name.get(name).map(|id| *id)
    }

    /// Number of collections with recorded tokens
    pub fn collection_count(&self) -> usize {
        self.tokens_by_collection.len()
    }

    /// Record the session token carried by `response`
    ///
    /// Ignored when the request was served by the master partition, when the
    /// response has no session token, or when the owner is not a collection
    /// (or something inside one). Malformed tokens are logged and dropped.
    pub fn set_session_token(
        &self,
        request: &DocumentServiceRequest,
        response: &DocumentServiceResponse,
    ) {
        if is_reading_from_master(request.resource_type(), request.operation_type()) {
            return;
        }
        let Some(session_token) = response.session_token() else {
            return;
        };

        let owner_id = if request.is_name_based() {
            response.header(headers::OWNER_ID)
        } else {
            request.resource_id()
        };
        let Some(owner_id) = owner_id.and_then(owner_resource_id) else {
            tracing::debug!(
                target: "docdb::session",
                path = request.path(),
                "Response carries a session token but no owner id, ignoring"
            );
            return;
        };

        let rid = match ResourceId::parse(owner_id) {
            Ok(rid) => rid,
            Err(e) => {
                tracing::debug!(
                    target: "docdb::session",
                    owner_id,
                    error = %e,
                    "Owner id is not a resource id, ignoring session token"
                );
                return;
            }
        };
        if !rid.is_collection_scoped() {
            return;
        }

        let key = rid.unique_collection_id();
        if let Err(e) = self.merge_session_token(key, session_token) {
            tracing::debug!(
                target: "docdb::session",
                token = session_token,
                error = %e,
                "Malformed session token, ignoring"
            );
            return;
        }

        let name = response
            .header(headers::OWNER_FULL_NAME)
            .and_then(paths::collection_path)
            .or_else(|| request.collection_path());
        if let Some(name) = name {
            self.collection_ids_by_name
                .entry(name.to_owned())
                .or_insert(key);
        }
    }

    /// Merge a composite token into the map of one collection
    ///
    /// Each pair is merged independently with keep-the-larger semantics.
    /// Nothing is merged if any pair is malformed.
    pub fn merge_session_token(
        &self,
        unique_collection_id: u64,
        composite: &str,
    ) -> docdb_core::DocDbResult<()> {
        let tokens = token::parse_composite(composite)?;
        if tokens.is_empty() {
            return Ok(());
        }
        let map = self.tokens_for(unique_collection_id);
        for token in &tokens {
            map.merge(token.range_id(), token.lsn());
        }
        Ok(())
    }

    /// Forget every token of the collection `request` addresses
    ///
    /// Used after a collection delete. For name-based requests the name index
    /// entry is removed too. Calling this for a collection without tokens is a
    /// no-op.
    pub fn clear_token(&self, request: &DocumentServiceRequest) {
        let key = if request.is_name_based() {
            request
                .collection_path()
                .and_then(|name| self.collection_ids_by_name.remove(name))
                .map(|(_, id)| id)
        } else {
            id_based_collection_key(request)
        };

        if let Some(key) = key {
            if self.tokens_by_collection.remove(&key).is_some() {
                tracing::debug!(
                    target: "docdb::session",
                    collection = key,
                    "Cleared session tokens"
                );
            }
        }
    }

    fn tokens_for(&self, unique_collection_id: u64) -> Arc<PartitionTokens> {
        if let Some(existing) = self.tokens_by_collection.get(&unique_collection_id) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .tokens_by_collection
            .entry(unique_collection_id)
            .or_insert_with(|| Arc::new(PartitionTokens::new()));
        Arc::clone(entry.value())
    }

    fn collection_key(&self, request: &DocumentServiceRequest) -> Option<u64> {
        if request.is_name_based() {
            let name = request.collection_path()?;
            self.collection_ids_by_name.get(name).map(|id| *id)
        } else {
            id_based_collection_key(request)
        }
    }
}

fn id_based_collection_key(request: &DocumentServiceRequest) -> Option<u64> {
    request
        .resource_id()
        .and_then(ResourceId::try_parse)
        .filter(ResourceId::is_collection_scoped)
        .map(|rid| rid.unique_collection_id())
}

/// The owner header may carry a bare resource id or an id-based link
fn owner_resource_id(owner: &str) -> Option<&str> {
    if owner.contains('/') {
        paths::last_resource_id(owner)
    } else if owner.is_empty() {
        None
    } else {
        Some(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docdb_core::{OperationType, ResourceType};

    const COLLECTION_RID: &str = "1KtjAImkcgw=";
    const DOCUMENT_LINK: &str = "dbs/1KtjAA==/colls/1KtjAImkcgw=/docs/1KtjAImkcgwBAAAAAAAAAA==";

    fn collection_key() -> u64 {
        ResourceId::parse(COLLECTION_RID).unwrap().unique_collection_id()
    }

    fn read_document() -> DocumentServiceRequest {
        DocumentServiceRequest::new(OperationType::Read, ResourceType::Document, DOCUMENT_LINK)
    }

    fn response_with_token(token: &str) -> DocumentServiceResponse {
        DocumentServiceResponse::new(200).with_header(headers::SESSION_TOKEN, token)
    }

    #[test]
    fn test_partition_tokens_keep_max() {
        let tokens = PartitionTokens::new();
        assert_eq!(tokens.merge("0", 10), 10);
        assert_eq!(tokens.merge("0", 5), 10);
        assert_eq!(tokens.merge("0", 11), 11);
        assert_eq!(tokens.get("0"), Some(11));
        assert_eq!(tokens.get("1"), None);
    }

    #[test]
    fn test_composite_is_sorted_by_range() {
        let tokens = PartitionTokens::new();
        tokens.merge("2", 3);
        tokens.merge("0", 7);
        tokens.merge("1", 1);
        assert_eq!(tokens.composite().as_deref(), Some("0:7,1:1,2:3"));
        assert_eq!(PartitionTokens::new().composite(), None);
    }

    #[test]
    fn test_set_then_resolve_id_based() {
        let container = SessionContainer::new();
        let request = read_document();
        container.set_session_token(&request, &response_with_token("0:42"));

        assert_eq!(container.resolve_session_token(&request).as_deref(), Some("0:42"));
        assert_eq!(container.lsn(collection_key(), "0"), Some(42));
    }

    #[test]
    fn test_composite_response_token_merges_each_pair() {
        let container = SessionContainer::new();
        let request = read_document();
        container.set_session_token(&request, &response_with_token("0:10,1:20"));
        container.set_session_token(&request, &response_with_token("1:15,2:1"));

        assert_eq!(
            container.resolve_session_token(&request).as_deref(),
            Some("0:10,1:20,2:1")
        );
    }

    #[test]
    fn test_lower_lsn_is_noop() {
        let container = SessionContainer::new();
        let request = read_document();
        container.set_session_token(&request, &response_with_token("0:100"));
        container.set_session_token(&request, &response_with_token("0:99"));
        assert_eq!(container.lsn(collection_key(), "0"), Some(100));
    }

    #[test]
    fn test_master_requests_do_not_record() {
        let container = SessionContainer::new();
        let request =
            DocumentServiceRequest::new(OperationType::Read, ResourceType::Database, "dbs/1KtjAA==");
        container.set_session_token(&request, &response_with_token("0:1"));
        assert_eq!(container.collection_count(), 0);
    }

    #[test]
    fn test_database_scoped_owner_is_ignored() {
        let container = SessionContainer::new();
        let request = DocumentServiceRequest::new(
            OperationType::Read,
            ResourceType::Document,
            "dbs/1KtjAA==/users/1KtjAG2n4wA=",
        );
        container.set_session_token(&request, &response_with_token("0:1"));
        assert_eq!(container.collection_count(), 0);
    }

    #[test]
    fn test_malformed_token_is_ignored() {
        let container = SessionContainer::new();
        let request = read_document();
        container.set_session_token(&request, &response_with_token("garbage"));
        assert_eq!(container.resolve_session_token(&request), None);
    }

    #[test]
    fn test_name_based_resolution_after_name_based_response() {
        let container = SessionContainer::new();
        let by_name = DocumentServiceRequest::new(
            OperationType::Read,
            ResourceType::Document,
            "dbs/shop/colls/orders/docs/o-1",
        );
        assert_eq!(container.resolve_session_token(&by_name), None);

        let response = response_with_token("0:9")
            .with_header(headers::OWNER_ID, COLLECTION_RID)
            .with_header(headers::OWNER_FULL_NAME, "dbs/shop/colls/orders");
        container.set_session_token(&by_name, &response);

        assert_eq!(container.resolve_session_token(&by_name).as_deref(), Some("0:9"));
        assert_eq!(
            container.collection_id_for_name("/dbs/shop/colls/orders/"),
            Some(collection_key())
        );
        // Same keyspace as id-based requests
        assert_eq!(container.resolve_session_token(&read_document()).as_deref(), Some("0:9"));
    }

    #[test]
    fn test_clear_token_is_idempotent() {
        let container = SessionContainer::new();
        let request = read_document();
        container.clear_token(&request);

        container.set_session_token(&request, &response_with_token("0:1"));
        container.clear_token(&request);
        container.clear_token(&request);
        assert_eq!(container.resolve_session_token(&request), None);
        assert_eq!(container.collection_count(), 0);
    }

    #[test]
    fn test_clear_by_name_removes_index_entry() {
        let container = SessionContainer::new();
        let by_name = DocumentServiceRequest::new(
            OperationType::Delete,
            ResourceType::DocumentCollection,
            "dbs/shop/colls/orders",
        );
        let read = DocumentServiceRequest::new(
            OperationType::Read,
            ResourceType::Document,
            "dbs/shop/colls/orders/docs/o-1",
        );
        let response = response_with_token("0:9")
            .with_header(headers::OWNER_ID, COLLECTION_RID)
            .with_header(headers::OWNER_FULL_NAME, "dbs/shop/colls/orders");
        container.set_session_token(&read, &response);

        container.clear_token(&by_name);
        assert_eq!(container.resolve_session_token(&read), None);
        assert_eq!(container.collection_id_for_name("dbs/shop/colls/orders"), None);
    }

    #[test]
    fn test_owner_id_may_be_a_link() {
        assert_eq!(owner_resource_id("dbs/1KtjAA==/colls/1KtjAImkcgw="), Some(COLLECTION_RID));
        assert_eq!(owner_resource_id(COLLECTION_RID), Some(COLLECTION_RID));
        assert_eq!(owner_resource_id(""), None);
    }
}
