use docdb_core::{paths, DocumentServiceRequest, PartitionKeyDefinitionCache, ServiceError};
use std::sync::Arc;

use super::{RetryDecision, RetryPolicy};
use crate::options::RetryOptions;

/// Refreshes a stale partition key definition and retries once
pub struct PartitionKeyMismatchRetryPolicy {
    cache: Option<Arc<dyn PartitionKeyDefinitionCache>>,
    max_retries: u32,
    attempts: u32,
}

impl PartitionKeyMismatchRetryPolicy {
    /// Policy refreshing entries of `cache`; never retries without one
    pub fn new(cache: Option<Arc<dyn PartitionKeyDefinitionCache>>, options: &RetryOptions) -> Self {
        Self {
            cache,
            max_retries: options.max_partition_key_mismatch_retries,
            attempts: 0,
        }
    }
}

impl RetryPolicy for PartitionKeyMismatchRetryPolicy {
    fn should_retry(
        &mut self,
        _error: &ServiceError,
        request: &mut DocumentServiceRequest,
    ) -> RetryDecision {
        if self.attempts >= self.max_retries {
            return RetryDecision::Stop;
        }
        let Some(cache) = &self.cache else {
            return RetryDecision::Stop;
        };
        let Some(collection_link) = paths::collection_path(request.path()) else {
            return RetryDecision::Stop;
        };

        if let Err(e) = cache.refresh(collection_link) {
            tracing::warn!(
                target: "docdb::retry",
                collection = collection_link,
                error = %e,
                "Partition key definition refresh failed"
            );
            return RetryDecision::Stop;
        }

        tracing::info!(
            target: "docdb::retry",
            collection = collection_link,
            "Partition key definition changed, refreshed and retrying"
        );
        self.attempts += 1;
        RetryDecision::immediately()
    }

    fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docdb_core::{DocDbError, DocDbResult, OperationType, PartitionKeyDefinition, ResourceType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingCache {
        refreshed: parking_lot::Mutex<Vec<String>>,
        fail: bool,
        gets: AtomicUsize,
    }

    impl PartitionKeyDefinitionCache for CountingCache {
        fn get(&self, _collection_link: &str) -> DocDbResult<PartitionKeyDefinition> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            Ok(PartitionKeyDefinition::hash(["/pk"]))
        }
        fn refresh(&self, collection_link: &str) -> DocDbResult<()> {
            if self.fail {
                return Err(DocDbError::transport("unreachable"));
            }
            self.refreshed.lock().push(collection_link.to_owned());
            Ok(())
        }
    }

    fn mismatch() -> ServiceError {
        ServiceError::new(400, "partition key mismatch").with_sub_status(1001)
    }

    fn create_request() -> DocumentServiceRequest {
        DocumentServiceRequest::new(OperationType::Create, ResourceType::Document, "/dbs/shop/colls/orders/docs/")
    }

    #[test]
    fn test_refreshes_collection_once() {
        let cache = Arc::new(CountingCache::default());
        let mut policy = PartitionKeyMismatchRetryPolicy::new(Some(cache.clone()), &RetryOptions::default());

        assert_eq!(policy.should_retry(&mismatch(), &mut create_request()), RetryDecision::immediately());
        assert_eq!(policy.should_retry(&mismatch(), &mut create_request()), RetryDecision::Stop);
        assert_eq!(*cache.refreshed.lock(), vec!["dbs/shop/colls/orders".to_owned()]);
    }

    #[test]
    fn test_failed_refresh_stops() {
        let cache = Arc::new(CountingCache {
            fail: true,
            ..Default::default()
        });
        let mut policy = PartitionKeyMismatchRetryPolicy::new(Some(cache), &RetryOptions::default());
        assert_eq!(policy.should_retry(&mismatch(), &mut create_request()), RetryDecision::Stop);
        assert_eq!(policy.attempts(), 0);
    }

    #[test]
    fn test_without_cache_stops() {
        let mut policy = PartitionKeyMismatchRetryPolicy::new(None, &RetryOptions::default());
        assert_eq!(policy.should_retry(&mismatch(), &mut create_request()), RetryDecision::Stop);
    }
}
