use docdb_core::constants::status_codes;
use docdb_core::{DocumentServiceRequest, ServiceError};
use std::time::Duration;

use super::{RetryDecision, RetryPolicy};
use crate::options::RetryOptions;

/// Retries 410 Gone and 449 Retry-With responses
///
/// The first retry is immediate. Later retries back off exponentially
/// (1 s, 2 s, 4 s, ...) with each delay clipped to what is left of the wait
/// budget; once the cumulative backoff has used the whole budget the policy
/// stops. A 410 also forces address and name cache refresh on the request.
#[derive(Debug, Clone)]
pub struct GoneAndRetryWithRetryPolicy {
    max_wait: Duration,
    multiplier: u32,
    next_backoff: Duration,
    waited: Duration,
    attempts: u32,
}

impl GoneAndRetryWithRetryPolicy {
    /// Policy bounded by `options`
    pub fn new(options: &RetryOptions) -> Self {
        Self {
            max_wait: Duration::from_secs(options.gone_max_wait_time_secs),
            multiplier: options.gone_backoff_multiplier.max(1),
            next_backoff: Duration::from_secs(options.gone_initial_backoff_secs),
            waited: Duration::ZERO,
            attempts: 0,
        }
    }

    /// Total backoff granted so far
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

impl RetryPolicy for GoneAndRetryWithRetryPolicy {
    fn should_retry(
        &mut self,
        error: &ServiceError,
        request: &mut DocumentServiceRequest,
    ) -> RetryDecision {
        if self.max_wait.is_zero() {
            return RetryDecision::Stop;
        }

        let delay = if self.attempts == 0 {
            Duration::ZERO
        } else {
            let remaining = self.max_wait.saturating_sub(self.waited);
            if remaining.is_zero() {
                return RetryDecision::Stop;
            }
            let delay = self.next_backoff.min(remaining);
            self.next_backoff = self.next_backoff.saturating_mul(self.multiplier);
            delay
        };

        if error.status == status_codes::GONE {
            request.set_force_address_refresh(true);
            request.set_force_name_cache_refresh(true);
        } else {
            tracing::warn!(
                target: "docdb::retry",
                activity_id = request.activity_id(),
                "Received retry-with, will retry"
            );
        }

        self.waited += delay;
        self.attempts += 1;
        RetryDecision::Retry { after: delay }
    }

    fn attempts(&self) -> u32 {
        self.attempts
    }
}
