//! Core types and traits for docdb
//!
//! This crate defines the foundational types shared by every other crate:
//! - Error: `DocDbError` / `ServiceError` hierarchy and the `DocDbResult` alias
//! - ResourceId: compact binary resource identifier codec
//! - Request/Response: `DocumentServiceRequest`, `DocumentServiceResponse`
//! - ResourceType / OperationType: request classification
//! - Paths: link parsing helpers (name-based vs id-based links)
//! - Constants: wire header names, status and sub-status codes
//! - Traits: collaborator seams (Transport, EndpointProvider,
//!   PartitionKeyDefinitionCache)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod error;
pub mod paths;
pub mod request;
pub mod resource_id;
pub mod traits;
pub mod types;

pub use error::{DocDbError, DocDbResult, ServiceError};
pub use request::{DocumentServiceRequest, DocumentServiceResponse};
pub use resource_id::ResourceId;
pub use traits::{EndpointProvider, PartitionKeyDefinitionCache, Transport};
pub use types::{OperationType, PartitionKeyDefinition, PartitionKind, ResourceType};
