//! Request and response envelopes exchanged with the transport
//!
//! A [`DocumentServiceRequest`] is built once per logical operation and
//! mutated in place by the layers it passes through: the session layer sets
//! the session token header, retry policies set refresh flags or an endpoint
//! override, and the query cursor sets the continuation header.
//!
//! Header names are stored lowercased; lookups are case-insensitive.

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::constants::headers;
use crate::error::{DocDbError, DocDbResult, ServiceError};
use crate::paths;
use crate::types::{OperationType, ResourceType};

/// A request on its way to the service
#[derive(Debug, Clone)]
pub struct DocumentServiceRequest {
    operation_type: OperationType,
    resource_type: ResourceType,
    path: String,
    resource_id: Option<String>,
    is_name_based: bool,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
    activity_id: String,
    endpoint_override: Option<String>,
    force_address_refresh: bool,
    force_name_cache_refresh: bool,
}

impl DocumentServiceRequest {
    /// Create a request addressing `path`
    ///
    /// Whether the request is name-based, and for id-based links the resource
    /// id of the innermost addressed resource, are derived from the path.
    pub fn new(
        operation_type: OperationType,
        resource_type: ResourceType,
        path: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let is_name_based = paths::is_name_based(&path);
        let resource_id = if is_name_based {
            None
        } else {
            paths::last_resource_id(&path).map(str::to_string)
        };

        Self {
            operation_type,
            resource_type,
            path,
            resource_id,
            is_name_based,
            headers: HashMap::new(),
            body: None,
            activity_id: Uuid::new_v4().to_string(),
            endpoint_override: None,
            force_address_refresh: false,
            force_name_cache_refresh: false,
        }
    }

    /// Attach a body
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a header
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Operation performed
    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    /// Resource kind addressed
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Link addressed by this request
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Resource id of the addressed resource (id-based requests only)
    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    /// True when the path uses names rather than resource ids
    pub fn is_name_based(&self) -> bool {
        self.is_name_based
    }

    /// Name-based `dbs/<db>/colls/<coll>` prefix of the path
    pub fn collection_path(&self) -> Option<&str> {
        if self.is_name_based {
            paths::collection_path(&self.path)
        } else {
            None
        }
    }

    /// Request body
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Activity id sent with every attempt of this request
    pub fn activity_id(&self) -> &str {
        &self.activity_id
    }

    /// Header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// All headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Set a header, replacing any previous value
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Remove a header
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(&name.to_ascii_lowercase())
    }

    /// Endpoint that must serve the next attempt, overriding normal resolution
    pub fn endpoint_override(&self) -> Option<&str> {
        self.endpoint_override.as_deref()
    }

    /// Pin the next attempts to `endpoint`
    pub fn set_endpoint_override(&mut self, endpoint: impl Into<String>) {
        self.endpoint_override = Some(endpoint.into());
    }

    /// Re-resolve replica addresses before the next attempt
    pub fn force_address_refresh(&self) -> bool {
        self.force_address_refresh
    }

    /// Set the address refresh flag
    pub fn set_force_address_refresh(&mut self, force: bool) {
        self.force_address_refresh = force;
    }

    /// Re-resolve name → id mappings before the next attempt
    pub fn force_name_cache_refresh(&self) -> bool {
        self.force_name_cache_refresh
    }

    /// Set the name cache refresh flag
    pub fn set_force_name_cache_refresh(&mut self, force: bool) {
        self.force_name_cache_refresh = force;
    }
}

/// A response received from the service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentServiceResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl DocumentServiceResponse {
    /// Create an empty response with `status`
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Attach a header
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Attach a body
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Attach a JSON body
    pub fn with_json(self, value: &serde_json::Value) -> Self {
        self.with_body(value.to_string().into_bytes())
    }

    /// HTTP status
    pub fn status(&self) -> u16 {
        self.status
    }

    /// True for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// All headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Raw body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// `x-ms-session-token`, if present and non-empty
    pub fn session_token(&self) -> Option<&str> {
        self.header(headers::SESSION_TOKEN).filter(|s| !s.is_empty())
    }

    /// `x-ms-continuation`, if present and non-empty
    pub fn continuation(&self) -> Option<&str> {
        self.header(headers::CONTINUATION).filter(|s| !s.is_empty())
    }

    /// Deserialize the body as one resource
    pub fn json<T: DeserializeOwned>(&self) -> DocDbResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Deserialize the items of a feed body
    ///
    /// Feed bodies carry their items in a property named after the resource
    /// kind (`Documents`, `DocumentCollections`, ...). An empty body is an
    /// empty page.
    pub fn feed<T: DeserializeOwned>(&self, resource_type: ResourceType) -> DocDbResult<Vec<T>> {
        if self.body.is_empty() {
            return Ok(Vec::new());
        }
        let mut value: serde_json::Value = serde_json::from_slice(&self.body)?;
        let property = resource_type.feed_property();
        match value.get_mut(property).map(serde_json::Value::take) {
            Some(items) => Ok(serde_json::from_value(items)?),
            None => Err(DocDbError::Serialization(format!(
                "feed response has no '{}' property",
                property
            ))),
        }
    }

    /// Convert a failure response into a [`ServiceError`]
    ///
    /// Reads the sub-status, retry-after and activity id headers, and the
    /// `message` property of a JSON error body when there is one.
    pub fn to_service_error(&self) -> ServiceError {
        let message = serde_json::from_slice::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| String::from_utf8_lossy(&self.body).into_owned());

        let mut error = ServiceError::new(self.status, message);
        if let Some(sub_status) = self
            .header(headers::SUB_STATUS)
            .and_then(|s| s.trim().parse::<u32>().ok())
        {
            error = error.with_sub_status(sub_status);
        }
        if let Some(ms) = self
            .header(headers::RETRY_AFTER_IN_MILLISECONDS)
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            error = error.with_retry_after(Duration::from_millis(ms));
        }
        if let Some(activity_id) = self.header(headers::ACTIVITY_ID) {
            error = error.with_activity_id(activity_id);
        }
        error
    }
}
