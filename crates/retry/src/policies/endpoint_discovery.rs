use docdb_core::{DocumentServiceRequest, EndpointProvider, ServiceError};
use std::sync::Arc;
use std::time::Duration;

use super::{RetryDecision, RetryPolicy};
use crate::options::RetryOptions;

/// Refreshes the account topology after a write-forbidden response
pub struct EndpointDiscoveryRetryPolicy {
    endpoints: Arc<dyn EndpointProvider>,
    enabled: bool,
    max_retries: u32,
    interval: Duration,
    attempts: u32,
}

impl EndpointDiscoveryRetryPolicy {
    /// Policy refreshing `endpoints`; never retries when `enabled` is false
    pub fn new(endpoints: Arc<dyn EndpointProvider>, enabled: bool, options: &RetryOptions) -> Self {
        Self {
            endpoints,
            enabled,
            max_retries: options.max_endpoint_discovery_retries,
            interval: options.endpoint_discovery_retry_interval(),
            attempts: 0,
        }
    }
}

impl RetryPolicy for EndpointDiscoveryRetryPolicy {
    fn should_retry(
        &mut self,
        _error: &ServiceError,
        _request: &mut DocumentServiceRequest,
    ) -> RetryDecision {
        if !self.enabled || self.attempts >= self.max_retries {
            return RetryDecision::Stop;
        }

        tracing::info!(
            target: "docdb::retry",
            delay_ms = self.interval.as_millis() as u64,
            "Write region changed, refreshing endpoint list"
        );
        self.endpoints.refresh_endpoint_list();
        self.attempts += 1;
        RetryDecision::Retry {
            after: self.interval,
        }
    }

    fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docdb_core::{OperationType, ResourceType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingEndpoints {
        refreshes: AtomicUsize,
    }

    impl EndpointProvider for CountingEndpoints {
        fn read_endpoint(&self) -> String {
            "https://east.example".into()
        }
        fn write_endpoint(&self) -> String {
            "https://east.example".into()
        }
        fn refresh_endpoint_list(&self) {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn write_request() -> DocumentServiceRequest {
        DocumentServiceRequest::new(OperationType::Create, ResourceType::Document, "dbs/a/colls/b/docs")
    }

    #[test]
    fn test_refreshes_and_waits() {
        let endpoints = Arc::new(CountingEndpoints::default());
        let mut policy = EndpointDiscoveryRetryPolicy::new(endpoints.clone(), true, &RetryOptions::default());
        let error = ServiceError::new(403, "write forbidden").with_sub_status(3);

        assert_eq!(
            policy.should_retry(&error, &mut write_request()),
            RetryDecision::Retry {
                after: Duration::from_secs(1)
            }
        );
        assert_eq!(endpoints.refreshes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bounded_by_max_retries() {
        let endpoints = Arc::new(CountingEndpoints::default());
        let options = RetryOptions::default().with_max_endpoint_discovery_retries(2);
        let mut policy = EndpointDiscoveryRetryPolicy::new(endpoints.clone(), true, &options);
        let error = ServiceError::new(403, "write forbidden").with_sub_status(3);

        assert!(policy.should_retry(&error, &mut write_request()).is_retry());
        assert!(policy.should_retry(&error, &mut write_request()).is_retry());
        assert_eq!(policy.should_retry(&error, &mut write_request()), RetryDecision::Stop);
        assert_eq!(endpoints.refreshes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_disabled_discovery_never_retries() {
        let endpoints = Arc::new(CountingEndpoints::default());
        let mut policy = EndpointDiscoveryRetryPolicy::new(endpoints.clone(), false, &RetryOptions::default());
        let error = ServiceError::new(403, "write forbidden").with_sub_status(3);

        assert_eq!(policy.should_retry(&error, &mut write_request()), RetryDecision::Stop);
        assert_eq!(endpoints.refreshes.load(Ordering::SeqCst), 0);
    }
}
