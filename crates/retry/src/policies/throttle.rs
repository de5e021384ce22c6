use docdb_core::{DocumentServiceRequest, ServiceError};
use std::time::Duration;

use super::{RetryDecision, RetryPolicy};
use crate::options::RetryOptions;

/// Retries 429 responses after the server-suggested delay
///
/// Stops after `max_attempts` retries, or as soon as the cumulative wait
/// (including the delay about to be taken) reaches `max_wait`.
#[derive(Debug, Clone)]
pub struct ThrottleRetryPolicy {
    max_attempts: u32,
    max_wait: Duration,
    default_retry_after: Duration,
    attempts: u32,
    cumulative_wait: Duration,
}

impl ThrottleRetryPolicy {
    /// Policy bounded by `options`
    pub fn new(options: &RetryOptions) -> Self {
        Self {
            max_attempts: options.max_retry_attempts_on_throttled_requests,
            max_wait: options.max_retry_wait_time(),
            default_retry_after: options.default_throttle_retry_after(),
            attempts: 0,
            cumulative_wait: Duration::ZERO,
        }
    }

    /// Total delay granted so far
    pub fn cumulative_wait(&self) -> Duration {
        self.cumulative_wait
    }
}

impl RetryPolicy for ThrottleRetryPolicy {
    fn should_retry(
        &mut self,
        error: &ServiceError,
        _request: &mut DocumentServiceRequest,
    ) -> RetryDecision {
        if self.attempts >= self.max_attempts {
            return RetryDecision::Stop;
        }

        let delay = error
            .retry_after
            .filter(|d| !d.is_zero())
            .unwrap_or(self.default_retry_after);
        self.cumulative_wait += delay;
        if self.cumulative_wait >= self.max_wait {
            return RetryDecision::Stop;
        }

        self.attempts += 1;
        RetryDecision::Retry { after: delay }
    }

    fn attempts(&self) -> u32 {
        self.attempts
    }
}
