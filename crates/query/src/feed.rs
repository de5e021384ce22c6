//! Feed options and feed pages
//!
//! [`FeedOptions`] are the per-cursor knobs a caller sets (page size,
//! partition key, resume point). They travel as request headers. A
//! [`FeedPage`] is one decoded response of a feed or query.

use docdb_core::constants::headers;
use docdb_core::{DocDbResult, DocumentServiceRequest, DocumentServiceResponse, ResourceType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Options for reading a feed or running a query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedOptions {
    /// Maximum items per page; the service picks when unset
    pub page_size: Option<u32>,
    /// Continuation to resume from
    pub request_continuation: Option<String>,
    /// Session token to read at, overriding the ambient one
    pub session_token: Option<String>,
    /// Partition key value to scope the read to
    pub partition_key: Option<serde_json::Value>,
    /// Let the service fan the query out over partitions
    pub enable_cross_partition_query: Option<bool>,
    /// Let the service scan when no index serves the query
    pub enable_scan_in_query: Option<bool>,
}

impl FeedOptions {
    /// Options with everything unset
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Resume from `continuation`
    pub fn with_request_continuation(mut self, continuation: impl Into<String>) -> Self {
        self.request_continuation = Some(continuation.into());
        self
    }

    /// Read at `session_token`
    pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }

    /// Scope the read to one partition key value
    pub fn with_partition_key(mut self, partition_key: impl Into<serde_json::Value>) -> Self {
        self.partition_key = Some(partition_key.into());
        self
    }

    /// Allow cross-partition queries
    pub fn with_cross_partition_query(mut self, enabled: bool) -> Self {
        self.enable_cross_partition_query = Some(enabled);
        self
    }

    /// Allow scans
    pub fn with_scan_in_query(mut self, enabled: bool) -> Self {
        self.enable_scan_in_query = Some(enabled);
        self
    }

    /// Write every set option except the continuation as a header on `request`
    ///
    /// The continuation is owned by the cursor, which sends it per page.
    pub fn apply_to(&self, request: &mut DocumentServiceRequest) {
        if let Some(page_size) = self.page_size {
            request.set_header(headers::PAGE_SIZE, page_size.to_string());
        }
        if let Some(token) = &self.session_token {
            request.set_header(headers::SESSION_TOKEN, token.clone());
        }
        if let Some(key) = &self.partition_key {
            request.set_header(headers::PARTITION_KEY, partition_key_header(key));
        }
        if let Some(enabled) = self.enable_cross_partition_query {
            request.set_header(headers::ENABLE_CROSS_PARTITION_QUERY, enabled.to_string());
        }
        if let Some(enabled) = self.enable_scan_in_query {
            request.set_header(headers::ENABLE_SCAN_IN_QUERY, enabled.to_string());
        }
    }
}

/// Partition keys travel as a one-element JSON array: `["tenant-1"]`
pub fn partition_key_header(key: &serde_json::Value) -> String {
    serde_json::Value::Array(vec![key.clone()]).to_string()
}

/// One page of a feed
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage<T> {
    /// Items on this page, possibly none
    pub items: Vec<T>,
    /// Continuation for the next page; `None` on the last page
    pub continuation: Option<String>,
    /// Response headers of the page
    pub headers: HashMap<String, String>,
}

impl<T> FeedPage<T> {
    /// Page built from parts
    pub fn new(items: Vec<T>, continuation: Option<String>) -> Self {
        Self {
            items,
            continuation,
            headers: HashMap::new(),
        }
    }
}

impl<T: DeserializeOwned> FeedPage<T> {
    /// Decode a feed response listing `resource_type` items
    ///
    /// # Errors
    ///
    /// Returns `Serialization` when the body is not a feed of `T`.
    pub fn from_response(
        response: &DocumentServiceResponse,
        resource_type: ResourceType,
    ) -> DocDbResult<Self> {
        Ok(Self {
            items: response.feed(resource_type)?,
            continuation: response.continuation().map(str::to_owned),
            headers: response.headers().clone(),
        })
    }
}
