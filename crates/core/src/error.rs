//! Error types for docdb
//!
//! Every fallible operation in the workspace returns [`DocDbResult`].
//! Failures reported by the service are carried as [`ServiceError`] so the
//! retry classifier can match on status and sub-status directly instead of
//! inspecting error message text.
//!
//! ## Categories
//!
//! | Category | Variants | Retried |
//! |----------|----------|---------|
//! | Server | `Service` | only when a retry policy claims the status |
//! | Client | `InvalidInput`, `InvalidResourceId` | never |
//! | Infrastructure | `Transport`, `Serialization`, `Config`, `Internal` | never |

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for docdb operations
pub type DocDbResult<T> = std::result::Result<T, DocDbError>;

/// A failure response returned by the service.
///
/// Carries everything the retry layer and the caller need for diagnostics:
/// the HTTP status, the optional sub-status, the server-suggested retry delay
/// and the activity id that correlates the request with server logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// HTTP status code
    pub status: u16,
    /// Value of the `x-ms-substatus` header, when present
    pub sub_status: Option<u32>,
    /// Server-suggested delay before retrying (`x-ms-retry-after-ms`)
    pub retry_after: Option<Duration>,
    /// Activity id of the failed request
    pub activity_id: Option<String>,
    /// Error message from the response body
    pub message: String,
}

impl ServiceError {
    /// Create a service error with only a status and message
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            sub_status: None,
            retry_after: None,
            activity_id: None,
            message: message.into(),
        }
    }

    /// Set the sub-status code
    pub fn with_sub_status(mut self, sub_status: u32) -> Self {
        self.sub_status = Some(sub_status);
        self
    }

    /// Set the server-suggested retry delay
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Set the activity id
    pub fn with_activity_id(mut self, activity_id: impl Into<String>) -> Self {
        self.activity_id = Some(activity_id.into());
        self
    }

    /// True when the status and sub-status match exactly
    pub fn is(&self, status: u16, sub_status: u32) -> bool {
        self.status == status && self.sub_status == Some(sub_status)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}", self.status)?;
        if let Some(sub_status) = self.sub_status {
            write!(f, ", sub-status {}", sub_status)?;
        }
        if let Some(activity_id) = &self.activity_id {
            write!(f, ", activity id {}", activity_id)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Error types for the docdb client
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DocDbError {
    /// The service answered with a failure status
    #[error("service error: {0}")]
    Service(ServiceError),

    /// Malformed argument or missing required field
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Why the input was rejected
        reason: String,
    },

    /// A textual resource id could not be decoded
    #[error("invalid resource id '{id}': {reason}")]
    InvalidResourceId {
        /// The offending id
        id: String,
        /// Why decoding failed
        reason: String,
    },

    /// The transport could not complete the round trip
    #[error("transport error: {0}")]
    Transport(String),

    /// Request or response body could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be read or is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Invariant violation inside the client
    #[error("internal error: {0}")]
    Internal(String),
}

impl DocDbError {
    /// Create an `InvalidInput` error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        DocDbError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Create an `InvalidResourceId` error
    pub fn invalid_resource_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        DocDbError::InvalidResourceId {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a `Transport` error
    pub fn transport(msg: impl Into<String>) -> Self {
        DocDbError::Transport(msg.into())
    }

    /// Create a `Config` error
    pub fn config(msg: impl Into<String>) -> Self {
        DocDbError::Config(msg.into())
    }

    /// Create an `Internal` error
    pub fn internal(msg: impl Into<String>) -> Self {
        DocDbError::Internal(msg.into())
    }

    /// The service failure carried by this error, if any
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            DocDbError::Service(e) => Some(e),
            _ => None,
        }
    }

    /// HTTP status of a service failure
    pub fn status(&self) -> Option<u16> {
        self.service_error().map(|e| e.status)
    }

    /// Sub-status of a service failure
    pub fn sub_status(&self) -> Option<u32> {
        self.service_error().and_then(|e| e.sub_status)
    }
}

impl From<ServiceError> for DocDbError {
    fn from(e: ServiceError) -> Self {
        DocDbError::Service(e)
    }
}

impl From<serde_json::Error> for DocDbError {
    fn from(e: serde_json::Error) -> Self {
        DocDbError::Serialization(e.to_string())
    }
}
