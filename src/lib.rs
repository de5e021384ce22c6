//! docdb - consistency and resilience layer for a partitioned document database client
//!
//! docdb sits between application code and a transport. It keeps reads
//! session-consistent, retries transient service failures within fixed
//! bounds, routes documents to collections client-side, and pages through
//! feeds and queries lazily.
//!
//! # Quick Start
//!
//! ```ignore
//! use docdb::{ClientConfig, DocumentClient, FeedOptions};
//!
//! let config = ClientConfig::from_file(Path::new("docdb.toml"))?;
//! let client = DocumentClient::with_http(config)?;
//!
//! let orders: Vec<Order> = client
//!     .read_documents("dbs/shop/colls/orders", &FeedOptions::new().with_page_size(100))
//!     .to_list()?;
//! ```
//!
//! # Architecture
//!
//! | crate | role |
//! |-------|------|
//! | `docdb-core` | errors, resource ids, request/response, collaborator traits |
//! | `docdb-session` | session token store |
//! | `docdb-routing` | consistent hash ring and partition resolvers |
//! | `docdb-retry` | failure classification, retry policies, orchestrator |
//! | `docdb-query` | paginated cursors |
//!
//! This crate adds configuration, endpoint selection, the optional HTTP
//! transport and the [`DocumentClient`] facade. The library logs through
//! `tracing` and never installs a subscriber.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod endpoint;
#[cfg(feature = "http")]
pub mod http;

pub use client::DocumentClient;
pub use config::{ClientConfig, ConsistencyLevel, CONFIG_FILE_NAME};
pub use endpoint::{
    regional_endpoint, DatabaseAccount, DatabaseAccountLocation, GlobalEndpointManager,
    StaticEndpointProvider, TopologyReader, TransportTopologyReader,
};
#[cfg(feature = "http")]
pub use http::HttpTransport;

pub use docdb_core::{
    constants, paths, DocDbError, DocDbResult, DocumentServiceRequest, DocumentServiceResponse,
    EndpointProvider, OperationType, PartitionKeyDefinition, PartitionKeyDefinitionCache,
    PartitionKind, ResourceId, ResourceType, ServiceError, Transport,
};
pub use docdb_query::{FeedOptions, FeedPage, MultiCollectionCursor, QueryCursor};
pub use docdb_retry::{RetryOptions, RetryOrchestrator, Sleeper, ThreadSleeper};
pub use docdb_routing::{
    ConsistentHashRing, DocumentRouter, HashPartitionResolver, InMemoryPartitionKeyDefinitionCache,
    KeyRange, MurmurHash3, PartitionResolver, PropertyExtractor, RangePartitionResolver,
    RangeQuery, Xxh3Hash,
};
pub use docdb_session::{SessionContainer, SessionToken};
