//! Request classification types
//!
//! This module defines:
//! - ResourceType: what kind of resource a request addresses
//! - OperationType: what the request does to it
//! - PartitionKeyDefinition: the partitioning scheme of a collection

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of resource addressed by a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    /// Database account (root)
    DatabaseAccount,
    /// Database
    Database,
    /// Document collection
    DocumentCollection,
    /// Document
    Document,
    /// Attachment
    Attachment,
    /// Attachment media
    Media,
    /// Stored procedure
    StoredProcedure,
    /// Trigger
    Trigger,
    /// User defined function
    UserDefinedFunction,
    /// Conflict
    Conflict,
    /// User
    User,
    /// Permission
    Permission,
    /// Throughput offer
    Offer,
    /// Partition key range
    PartitionKeyRange,
    /// Replica topology
    Topology,
}

impl ResourceType {
    /// Resources that live inside a partition of a partitioned collection
    pub fn is_partitioned(&self) -> bool {
        matches!(
            self,
            ResourceType::Document | ResourceType::Attachment | ResourceType::Conflict
        )
    }

    /// Property holding the item list in a feed response body
    pub fn feed_property(&self) -> &'static str {
        match self {
            ResourceType::DatabaseAccount => "DatabaseAccounts",
            ResourceType::Database => "Databases",
            ResourceType::DocumentCollection => "DocumentCollections",
            ResourceType::Document => "Documents",
            ResourceType::Attachment | ResourceType::Media => "Attachments",
            ResourceType::StoredProcedure => "StoredProcedures",
            ResourceType::Trigger => "Triggers",
            ResourceType::UserDefinedFunction => "UserDefinedFunctions",
            ResourceType::Conflict => "Conflicts",
            ResourceType::User => "Users",
            ResourceType::Permission => "Permissions",
            ResourceType::Offer => "Offers",
            ResourceType::PartitionKeyRange => "PartitionKeyRanges",
            ResourceType::Topology => "Topologies",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Operation performed by a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    /// Create a resource
    Create,
    /// Create or replace a resource
    Upsert,
    /// Read one resource
    Read,
    /// Read a feed of resources
    ReadFeed,
    /// Replace a resource
    Replace,
    /// Delete a resource
    Delete,
    /// Query (legacy grammar)
    Query,
    /// SQL query
    SqlQuery,
    /// Execute a stored procedure
    ExecuteJavaScript,
    /// Read headers of one resource
    Head,
    /// Read headers of a feed
    HeadFeed,
}

impl OperationType {
    /// Operations that must be served by the write region
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            OperationType::Create
                | OperationType::Upsert
                | OperationType::Delete
                | OperationType::Replace
                | OperationType::ExecuteJavaScript
        )
    }

    /// Operations whose response is a feed page
    pub fn is_feed(&self) -> bool {
        matches!(
            self,
            OperationType::ReadFeed | OperationType::Query | OperationType::SqlQuery
        )
    }

    /// HTTP verb used on the wire
    pub fn http_method(&self) -> &'static str {
        match self {
            OperationType::Create
            | OperationType::Upsert
            | OperationType::Query
            | OperationType::SqlQuery
            | OperationType::ExecuteJavaScript => "POST",
            OperationType::Read | OperationType::ReadFeed => "GET",
            OperationType::Replace => "PUT",
            OperationType::Delete => "DELETE",
            OperationType::Head | OperationType::HeadFeed => "HEAD",
        }
    }
}

/// Requests that are served from the master partition
///
/// Responses to these carry no meaningful partition LSN, so the session layer
/// ignores them.
pub fn is_reading_from_master(resource_type: ResourceType, operation_type: OperationType) -> bool {
    match resource_type {
        ResourceType::Offer
        | ResourceType::Database
        | ResourceType::User
        | ResourceType::Permission
        | ResourceType::Topology
        | ResourceType::DatabaseAccount
        | ResourceType::PartitionKeyRange => true,
        ResourceType::DocumentCollection => operation_type.is_feed(),
        _ => false,
    }
}

/// Partitioning scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PartitionKind {
    /// Hash partitioning
    #[default]
    Hash,
    /// Range partitioning
    Range,
}

/// Partition key definition of a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionKeyDefinition {
    /// JSON paths (e.g. `/tenantId`) forming the partition key
    pub paths: Vec<String>,
    /// Partitioning scheme
    #[serde(default)]
    pub kind: PartitionKind,
}

impl PartitionKeyDefinition {
    /// Hash definition over the given paths
    pub fn hash<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            kind: PartitionKind::Hash,
        }
    }

    /// True when the collection is partitioned
    pub fn is_partitioned(&self) -> bool {
        !self.paths.is_empty()
    }
}
