//! Collaborator seams
//!
//! The consistency and resilience layer never talks to the network or to
//! the service's metadata directly. It reaches them through these traits so
//! that transports, topology sources and caches can be swapped (and faked in
//! tests) without touching the retry, session or paging logic.
//!
//! Thread safety: implementations are shared between concurrently running
//! operations and must be `Send + Sync`.

use crate::error::DocDbResult;
use crate::request::{DocumentServiceRequest, DocumentServiceResponse};
use crate::types::{OperationType, PartitionKeyDefinition};

/// Performs one HTTP round trip
pub trait Transport: Send + Sync {
    /// Send `request` to `endpoint`
    ///
    /// # Errors
    ///
    /// Non-2xx responses must be returned as `DocDbError::Service` carrying the
    /// status, sub-status and retry-after of the response (see
    /// [`DocumentServiceResponse::to_service_error`]). Connection failures and
    /// timeouts are `DocDbError::Transport`.
    fn execute(
        &self,
        request: &DocumentServiceRequest,
        endpoint: &str,
    ) -> DocDbResult<DocumentServiceResponse>;
}

/// Knows which regional endpoint serves reads and writes
pub trait EndpointProvider: Send + Sync {
    /// Endpoint for an operation: the write endpoint for writes, the read
    /// endpoint otherwise
    fn resolve_endpoint(&self, operation: OperationType) -> String {
        if operation.is_write() {
            self.write_endpoint()
        } else {
            self.read_endpoint()
        }
    }

    /// Current read endpoint
    fn read_endpoint(&self) -> String;

    /// Current write endpoint
    fn write_endpoint(&self) -> String;

    /// Re-read the account topology
    fn refresh_endpoint_list(&self);
}

/// Cache of collection partition key definitions, keyed by collection link
pub trait PartitionKeyDefinitionCache: Send + Sync {
    /// Definition for `collection_link`, loading it on a miss
    fn get(&self, collection_link: &str) -> DocDbResult<PartitionKeyDefinition>;

    /// Evict the entry for `collection_link` and load it again
    fn refresh(&self, collection_link: &str) -> DocDbResult<()>;
}
