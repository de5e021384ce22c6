use docdb_core::{DocumentServiceRequest, EndpointProvider, ServiceError};
use std::sync::Arc;

use super::{RetryDecision, RetryPolicy};
use crate::options::RetryOptions;

/// Redirects a lagging read to the write region
///
/// Only applies to reads that are not already pinned to an endpoint, and only
/// when the account has a distinct read region.
pub struct SessionReadRetryPolicy {
    endpoints: Arc<dyn EndpointProvider>,
    max_retries: u32,
    attempts: u32,
}

impl SessionReadRetryPolicy {
    /// Policy redirecting through `endpoints`
    pub fn new(endpoints: Arc<dyn EndpointProvider>, options: &RetryOptions) -> Self {
        Self {
            endpoints,
            max_retries: options.max_session_read_retries,
            attempts: 0,
        }
    }
}

impl RetryPolicy for SessionReadRetryPolicy {
    fn should_retry(
        &mut self,
        _error: &ServiceError,
        request: &mut DocumentServiceRequest,
    ) -> RetryDecision {
        if self.attempts >= self.max_retries
            || request.operation_type().is_write()
            || request.endpoint_override().is_some()
        {
            return RetryDecision::Stop;
        }

        let read = self.endpoints.read_endpoint();
        let write = self.endpoints.write_endpoint();
        if read.eq_ignore_ascii_case(&write) {
            return RetryDecision::Stop;
        }

        tracing::info!(
            target: "docdb::retry",
            read_endpoint = %read,
            write_endpoint = %write,
            "Session not yet readable in read region, retrying against write region"
        );
        request.set_endpoint_override(write);
        self.attempts += 1;
        RetryDecision::immediately()
    }

    fn attempts(&self) -> u32 {
        self.attempts
    }
}
