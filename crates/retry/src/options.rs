//! Retry bounds
//!
//! Every policy is bounded. The throttle bounds are the ones callers usually
//! tune; the rest default to the service's recommended values and are exposed
//! mainly so tests and unusual deployments can shrink them.

use docdb_core::{DocDbError, DocDbResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounds for all retry policies
///
/// Deserializes from the `[retry]` table of the client configuration; every
/// field is optional there.
///
/// # Example
/// ```ignore
/// let options = RetryOptions::default()
///     .with_max_retry_attempts_on_throttled_requests(3)
///     .with_max_retry_wait_time_secs(5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Retries allowed for throttled (429) requests
    pub max_retry_attempts_on_throttled_requests: u32,
    /// Cumulative throttle wait after which retrying stops
    pub max_retry_wait_time_secs: u64,
    /// Throttle delay used when the service sends no retry-after
    pub default_throttle_retry_after_ms: u64,
    /// Retries allowed after the write region moved
    pub max_endpoint_discovery_retries: u32,
    /// Delay between endpoint discovery retries
    pub endpoint_discovery_retry_interval_ms: u64,
    /// Retries allowed when a read region lags the session token
    pub max_session_read_retries: u32,
    /// Retries allowed after a partition key definition refresh
    pub max_partition_key_mismatch_retries: u32,
    /// First non-zero gone/retry-with backoff
    pub gone_initial_backoff_secs: u64,
    /// Growth factor of the gone/retry-with backoff
    pub gone_backoff_multiplier: u32,
    /// Cumulative gone/retry-with backoff after which retrying stops
    pub gone_max_wait_time_secs: u64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retry_attempts_on_throttled_requests: 9,
            max_retry_wait_time_secs: 30,
            default_throttle_retry_after_ms: 5_000,
            max_endpoint_discovery_retries: 120,
            endpoint_discovery_retry_interval_ms: 1_000,
            max_session_read_retries: 1,
            max_partition_key_mismatch_retries: 1,
            gone_initial_backoff_secs: 1,
            gone_backoff_multiplier: 2,
            gone_max_wait_time_secs: 30,
        }
    }
}

impl RetryOptions {
    /// Options with the default bounds
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that never retry
    pub fn no_retry() -> Self {
        Self {
            max_retry_attempts_on_throttled_requests: 0,
            max_endpoint_discovery_retries: 0,
            max_session_read_retries: 0,
            max_partition_key_mismatch_retries: 0,
            gone_max_wait_time_secs: 0,
            ..Default::default()
        }
    }

    /// Set the throttle retry count
    pub fn with_max_retry_attempts_on_throttled_requests(mut self, attempts: u32) -> Self {
        self.max_retry_attempts_on_throttled_requests = attempts;
        self
    }

    /// Set the cumulative throttle wait bound
    pub fn with_max_retry_wait_time_secs(mut self, secs: u64) -> Self {
        self.max_retry_wait_time_secs = secs;
        self
    }

    /// Set the throttle delay used without a server hint
    pub fn with_default_throttle_retry_after_ms(mut self, ms: u64) -> Self {
        self.default_throttle_retry_after_ms = ms;
        self
    }

    /// Set the endpoint discovery retry count
    pub fn with_max_endpoint_discovery_retries(mut self, retries: u32) -> Self {
        self.max_endpoint_discovery_retries = retries;
        self
    }

    /// Set the endpoint discovery delay
    pub fn with_endpoint_discovery_retry_interval_ms(mut self, ms: u64) -> Self {
        self.endpoint_discovery_retry_interval_ms = ms;
        self
    }

    /// Set the gone/retry-with backoff schedule
    pub fn with_gone_backoff(mut self, initial_secs: u64, multiplier: u32, max_wait_secs: u64) -> Self {
        self.gone_initial_backoff_secs = initial_secs;
        self.gone_backoff_multiplier = multiplier;
        self.gone_max_wait_time_secs = max_wait_secs;
        self
    }

    /// Cumulative throttle wait bound
    pub fn max_retry_wait_time(&self) -> Duration {
        Duration::from_secs(self.max_retry_wait_time_secs)
    }

    /// Throttle delay used without a server hint
    pub fn default_throttle_retry_after(&self) -> Duration {
        Duration::from_millis(self.default_throttle_retry_after_ms)
    }

    /// Endpoint discovery delay
    pub fn endpoint_discovery_retry_interval(&self) -> Duration {
        Duration::from_millis(self.endpoint_discovery_retry_interval_ms)
    }

    /// Reject bounds that cannot work
    ///
    /// # Errors
    ///
    /// Returns `Config` when the gone backoff multiplier is zero.
    pub fn validate(&self) -> DocDbResult<()> {
        if self.gone_backoff_multiplier == 0 {
            return Err(DocDbError::config(
                "retry.gone_backoff_multiplier must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RetryOptions::default();
        assert_eq!(options.max_retry_attempts_on_throttled_requests, 9);
        assert_eq!(options.max_retry_wait_time(), Duration::from_secs(30));
        assert_eq!(options.default_throttle_retry_after(), Duration::from_secs(5));
        assert_eq!(options.max_endpoint_discovery_retries, 120);
        assert_eq!(options.endpoint_discovery_retry_interval(), Duration::from_secs(1));
        assert_eq!(options.max_session_read_retries, 1);
        assert_eq!(options.max_partition_key_mismatch_retries, 1);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let options = RetryOptions::new()
            .with_max_retry_attempts_on_throttled_requests(3)
            .with_max_retry_wait_time_secs(5)
            .with_gone_backoff(2, 3, 10);
        assert_eq!(options.max_retry_attempts_on_throttled_requests, 3);
        assert_eq!(options.max_retry_wait_time_secs, 5);
        assert_eq!(options.gone_initial_backoff_secs, 2);
        assert_eq!(options.gone_backoff_multiplier, 3);
        assert_eq!(options.gone_max_wait_time_secs, 10);
    }

    #[test]
    fn test_no_retry() {
        let options = RetryOptions::no_retry();
        assert_eq!(options.max_retry_attempts_on_throttled_requests, 0);
        assert_eq!(options.max_endpoint_discovery_retries, 0);
    }

    #[test]
    fn test_partial_deserialization_keeps_defaults() {
        let options: RetryOptions =
            serde_json::from_str(r#"{"max_retry_attempts_on_throttled_requests": 2}"#).unwrap();
        assert_eq!(options.max_retry_attempts_on_throttled_requests, 2);
        assert_eq!(options.max_retry_wait_time_secs, 30);
    }

    #[test]
    fn test_validate_rejects_zero_multiplier() {
        let options = RetryOptions::default().with_gone_backoff(1, 0, 30);
        assert!(matches!(options.validate(), Err(DocDbError::Config(_))));
    }
}
