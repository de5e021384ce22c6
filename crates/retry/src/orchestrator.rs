//! Retry orchestration
//!
//! Runs one logical operation to completion: attempt, classify the failure,
//! consult the responsible policy, wait, attempt again. Policies are created
//! lazily on the first failure of their kind and live for the whole
//! operation, each with its own budget.
//!
//! ```text
//! Attempt ─ok──────────────────────────────► Success
//!    │ err
//!    ▼
//! Classify ─terminal─────────────────────────► Fail (error as-is)
//!    │ policy
//!    ▼
//! should_retry ─stop─────────────────────────► Fail (last error as-is)
//!    │ retry(after)
//!    ▼
//! Sleeper::sleep(after) ─► Attempt
//! ```

use docdb_core::{
    DocDbResult, DocumentServiceRequest, EndpointProvider, PartitionKeyDefinitionCache,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::classify::{classify, RetryClass};
use crate::options::RetryOptions;
use crate::policies::{
    EndpointDiscoveryRetryPolicy, GoneAndRetryWithRetryPolicy, PartitionKeyMismatchRetryPolicy,
    RetryDecision, RetryPolicy, SessionReadRetryPolicy, ThrottleRetryPolicy,
};

/// Blocks the calling thread between attempts
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Per-operation policy instances, created on first use
#[derive(Default)]
struct PolicySet {
    endpoint_discovery: Option<EndpointDiscoveryRetryPolicy>,
    throttle: Option<ThrottleRetryPolicy>,
    session_read: Option<SessionReadRetryPolicy>,
    partition_key_mismatch: Option<PartitionKeyMismatchRetryPolicy>,
    gone: Option<GoneAndRetryWithRetryPolicy>,
}

impl PolicySet {
    fn policy_for(
        &mut self,
        class: RetryClass,
        orchestrator: &RetryOrchestrator,
    ) -> Option<&mut dyn RetryPolicy> {
        let options = &orchestrator.options;
        let policy: &mut dyn RetryPolicy = match class {
            RetryClass::EndpointDiscovery => self.endpoint_discovery.get_or_insert_with(|| {
                EndpointDiscoveryRetryPolicy::new(
                    Arc::clone(&orchestrator.endpoints),
                    orchestrator.endpoint_discovery_enabled,
                    options,
                )
            }),
            RetryClass::Throttle => self
                .throttle
                .get_or_insert_with(|| ThrottleRetryPolicy::new(options)),
            RetryClass::SessionRead => self.session_read.get_or_insert_with(|| {
                SessionReadRetryPolicy::new(Arc::clone(&orchestrator.endpoints), options)
            }),
            RetryClass::PartitionKeyMismatch => {
                self.partition_key_mismatch.get_or_insert_with(|| {
                    PartitionKeyMismatchRetryPolicy::new(
                        orchestrator.partition_key_cache.clone(),
                        options,
                    )
                })
            }
            RetryClass::GoneOrRetryWith => self
                .gone
                .get_or_insert_with(|| GoneAndRetryWithRetryPolicy::new(options)),
            RetryClass::Terminal => return None,
        };
        Some(policy)
    }
}

/// Drives an operation through the retry policies
///
/// Thread safety: one orchestrator is shared by all operations of a client;
/// per-operation state lives on the stack of [`RetryOrchestrator::execute`].
pub struct RetryOrchestrator {
    options: RetryOptions,
    endpoints: Arc<dyn EndpointProvider>,
    endpoint_discovery_enabled: bool,
    partition_key_cache: Option<Arc<dyn PartitionKeyDefinitionCache>>,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryOrchestrator {
    /// Orchestrator with endpoint discovery on, no partition key cache and
    /// real sleeps
    pub fn new(options: RetryOptions, endpoints: Arc<dyn EndpointProvider>) -> Self {
        Self {
            options,
            endpoints,
            endpoint_discovery_enabled: true,
            partition_key_cache: None,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Turn endpoint discovery retries on or off
    pub fn with_endpoint_discovery(mut self, enabled: bool) -> Self {
        self.endpoint_discovery_enabled = enabled;
        self
    }

    /// Cache refreshed on partition-key-mismatch failures
    pub fn with_partition_key_cache(mut self, cache: Arc<dyn PartitionKeyDefinitionCache>) -> Self {
        self.partition_key_cache = Some(cache);
        self
    }

    /// Replace the sleeper (tests use a recording one)
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Bounds in use
    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    /// Endpoint provider consulted by the policies
    pub fn endpoints(&self) -> &Arc<dyn EndpointProvider> {
        &self.endpoints
    }

    /// Run `attempt` until it succeeds, fails terminally, or its policy gives up
    ///
    /// The same `request` is handed to every attempt; policies may adjust it
    /// in between.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt unchanged.
    pub fn execute<T, F>(&self, request: &mut DocumentServiceRequest, mut attempt: F) -> DocDbResult<T>
    where
        F: FnMut(&mut DocumentServiceRequest) -> DocDbResult<T>,
    {
        let mut policies = PolicySet::default();
        let mut attempt_number: u32 = 1;

        loop {
            let error = match attempt(request) {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            let Some(service_error) = error.service_error() else {
                return Err(error);
            };

            let class = classify(service_error.status, service_error.sub_status);
            let Some(policy) = policies.policy_for(class, self) else {
                return Err(error);
            };

            match policy.should_retry(service_error, request) {
                RetryDecision::Retry { after } => {
                    tracing::info!(
                        target: "docdb::retry",
                        policy = %class,
                        status = service_error.status,
                        sub_status = ?service_error.sub_status,
                        attempt = attempt_number,
                        delay_ms = after.as_millis() as u64,
                        activity_id = request.activity_id(),
                        "Retrying request"
                    );
                    self.sleeper.sleep(after);
                    attempt_number += 1;
                }
                RetryDecision::Stop => {
                    tracing::warn!(
                        target: "docdb::retry",
                        policy = %class,
                        status = service_error.status,
                        sub_status = ?service_error.sub_status,
                        attempts = attempt_number,
                        retries = policy.attempts(),
                        activity_id = request.activity_id(),
                        "Request will not be retried"
                    );
                    return Err(error);
                }
            }
        }
    }
}

impl fmt::Debug for RetryOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOrchestrator")
            .field("options", &self.options)
            .field("endpoint_discovery_enabled", &self.endpoint_discovery_enabled)
            .field("partition_key_cache", &self.partition_key_cache.is_some())
            .finish()
    }
}
