//! Wire constants: header names, status codes and sub-status codes

/// HTTP header names understood by the service
pub mod headers {
    /// Opaque paging cursor, echoed back verbatim
    pub const CONTINUATION: &str = "x-ms-continuation";
    /// Composite session token, `range:lsn[,range:lsn...]`
    pub const SESSION_TOKEN: &str = "x-ms-session-token";
    /// Server-suggested retry delay in milliseconds
    pub const RETRY_AFTER_IN_MILLISECONDS: &str = "x-ms-retry-after-ms";
    /// Sub-status code of a failure response
    pub const SUB_STATUS: &str = "x-ms-substatus";
    /// Activity id correlating a request with server logs
    pub const ACTIVITY_ID: &str = "x-ms-activity-id";
    /// Id-based path of the resource that owns the response
    pub const OWNER_ID: &str = "x-ms-content-path";
    /// Name-based path of the resource that owns the response
    pub const OWNER_FULL_NAME: &str = "x-ms-alt-content-path";
    /// Page size hint for feeds and queries
    pub const PAGE_SIZE: &str = "x-ms-max-item-count";
    /// Serialized partition key of the addressed document
    pub const PARTITION_KEY: &str = "x-ms-documentdb-partitionkey";
    /// Allow a query to fan out over partitions server-side
    pub const ENABLE_CROSS_PARTITION_QUERY: &str = "x-ms-documentdb-query-enablecrosspartition";
    /// Allow a query to scan when no index serves it
    pub const ENABLE_SCAN_IN_QUERY: &str = "x-ms-documentdb-query-enable-scan";
    /// Marks a request body as a query
    pub const IS_QUERY: &str = "x-ms-documentdb-isquery";
    /// Requested consistency level
    pub const CONSISTENCY_LEVEL: &str = "x-ms-consistency-level";
}

/// HTTP status codes the client interprets
pub mod status_codes {
    /// 200
    pub const OK: u16 = 200;
    /// 201
    pub const CREATED: u16 = 201;
    /// 204
    pub const NO_CONTENT: u16 = 204;
    /// 400
    pub const BAD_REQUEST: u16 = 400;
    /// 403
    pub const FORBIDDEN: u16 = 403;
    /// 404
    pub const NOT_FOUND: u16 = 404;
    /// 409
    pub const CONFLICT: u16 = 409;
    /// 410
    pub const GONE: u16 = 410;
    /// 429
    pub const TOO_MANY_REQUESTS: u16 = 429;
    /// 449
    pub const RETRY_WITH: u16 = 449;
    /// 503
    pub const SERVICE_UNAVAILABLE: u16 = 503;
}

/// Values of the `x-ms-substatus` header
pub mod sub_status_codes {
    /// 403: the write region moved
    pub const WRITE_FORBIDDEN: u32 = 3;
    /// 410: the name cache used to route the request is stale
    pub const NAME_CACHE_IS_STALE: u32 = 1000;
    /// 400: the partition key definition cached by the client is stale
    pub const PARTITION_KEY_MISMATCH: u32 = 1001;
    /// 404: the replica has not caught up with the session token yet
    pub const READ_SESSION_NOT_AVAILABLE: u32 = 1002;
    /// 400: cross-partition query cannot be served by the gateway
    pub const CROSS_PARTITION_QUERY_NOT_SERVABLE: u32 = 1004;
}

/// Link segment names
pub mod segments {
    /// Databases
    pub const DATABASES: &str = "dbs";
    /// Collections
    pub const COLLECTIONS: &str = "colls";
    /// Documents
    pub const DOCUMENTS: &str = "docs";
    /// Users
    pub const USERS: &str = "users";
    /// Permissions
    pub const PERMISSIONS: &str = "permissions";
    /// Attachments
    pub const ATTACHMENTS: &str = "attachments";
    /// Stored procedures
    pub const STORED_PROCEDURES: &str = "sprocs";
    /// Triggers
    pub const TRIGGERS: &str = "triggers";
    /// User defined functions
    pub const USER_DEFINED_FUNCTIONS: &str = "udfs";
    /// Conflicts
    pub const CONFLICTS: &str = "conflicts";
    /// Offers
    pub const OFFERS: &str = "offers";
    /// Partition key ranges
    pub const PARTITION_KEY_RANGES: &str = "pkranges";
}
