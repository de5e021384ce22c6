//! Retry policies
//!
//! One policy instance lives for the duration of one logical operation and
//! owns its own attempt counter, so interleaved failure kinds never share a
//! budget. A policy may mutate the request before the next attempt (endpoint
//! override, refresh flags).

use docdb_core::{DocumentServiceRequest, ServiceError};
use std::time::Duration;

mod endpoint_discovery;
mod gone;
mod partition_key_mismatch;
mod session_read;
mod throttle;

pub use endpoint_discovery::EndpointDiscoveryRetryPolicy;
pub use gone::GoneAndRetryWithRetryPolicy;
pub use partition_key_mismatch::PartitionKeyMismatchRetryPolicy;
pub use session_read::SessionReadRetryPolicy;
pub use throttle::ThrottleRetryPolicy;

/// Outcome of consulting a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait, then attempt again
    Retry {
        /// Delay before the next attempt
        after: Duration,
    },
    /// Give up and surface the failure
    Stop,
}

impl RetryDecision {
    /// Retry without waiting
    pub fn immediately() -> Self {
        RetryDecision::Retry {
            after: Duration::ZERO,
        }
    }

    /// True for `Retry`
    pub fn is_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry { .. })
    }
}

/// Decides whether one failure kind is retried
pub trait RetryPolicy: Send {
    /// Consult the policy after `error`; may adjust `request` for the next attempt
    fn should_retry(
        &mut self,
        error: &ServiceError,
        request: &mut DocumentServiceRequest,
    ) -> RetryDecision;

    /// Retries granted so far
    fn attempts(&self) -> u32;
}
