//! Failure classification
//!
//! Maps a failed attempt to the policy that may retry it. Classification is a
//! pure function of (status, sub-status); anything it does not recognise is
//! terminal.

use docdb_core::constants::{status_codes, sub_status_codes};
use docdb_core::DocDbError;
use std::fmt;

/// Retry policy responsible for a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryClass {
    /// 403 / write-forbidden: the write region moved
    EndpointDiscovery,
    /// 429: request rate too large
    Throttle,
    /// 404 / read-session-not-available: the read region lags the session token
    SessionRead,
    /// 400 / partition-key-mismatch: cached partition key definition is stale
    PartitionKeyMismatch,
    /// 410 or 449: replica moved or asked for a retry
    GoneOrRetryWith,
    /// Not retriable
    Terminal,
}

impl RetryClass {
    /// True when some policy may retry this class
    pub fn is_retriable(&self) -> bool {
        !matches!(self, RetryClass::Terminal)
    }
}

impl fmt::Display for RetryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RetryClass::EndpointDiscovery => "endpoint-discovery",
            RetryClass::Throttle => "throttle",
            RetryClass::SessionRead => "session-read",
            RetryClass::PartitionKeyMismatch => "partition-key-mismatch",
            RetryClass::GoneOrRetryWith => "gone-or-retry-with",
            RetryClass::Terminal => "terminal",
        };
        f.write_str(name)
    }
}

/// Classify a failure response
pub fn classify(status: u16, sub_status: Option<u32>) -> RetryClass {
    match (status, sub_status) {
        (status_codes::FORBIDDEN, Some(sub_status_codes::WRITE_FORBIDDEN)) => {
            RetryClass::EndpointDiscovery
        }
        (status_codes::TOO_MANY_REQUESTS, _) => RetryClass::Throttle,
        (status_codes::NOT_FOUND, Some(sub_status_codes::READ_SESSION_NOT_AVAILABLE)) => {
            RetryClass::SessionRead
        }
        (status_codes::BAD_REQUEST, Some(sub_status_codes::PARTITION_KEY_MISMATCH)) => {
            RetryClass::PartitionKeyMismatch
        }
        (status_codes::GONE, _) | (status_codes::RETRY_WITH, _) => RetryClass::GoneOrRetryWith,
        _ => RetryClass::Terminal,
    }
}

/// Classify an error; only service failures can be retried
pub fn classify_error(error: &DocDbError) -> RetryClass {
    match error.service_error() {
        Some(e) => classify(e.status, e.sub_status),
        None => RetryClass::Terminal,
    }
}
