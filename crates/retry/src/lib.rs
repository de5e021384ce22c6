//! Bounded retries for docdb
//!
//! Transient service failures (throttling, moved regions, moved replicas,
//! lagging read regions, stale partition metadata) are retried here and only
//! surface once their policy's bound is exhausted. Everything else propagates
//! unchanged on the first failure.
//!
//! - [`classify`]: (status, sub-status) → responsible policy
//! - [`policies`]: the five policies and the [`RetryPolicy`] trait
//! - [`options`]: retry bounds, loadable from configuration
//! - [`orchestrator`]: the attempt loop

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod options;
pub mod orchestrator;
pub mod policies;

pub use classify::{classify, classify_error, RetryClass};
pub use options::RetryOptions;
pub use orchestrator::{RetryOrchestrator, Sleeper, ThreadSleeper};
pub use policies::{
    EndpointDiscoveryRetryPolicy, GoneAndRetryWithRetryPolicy, PartitionKeyMismatchRetryPolicy,
    RetryDecision, RetryPolicy, SessionReadRetryPolicy, ThrottleRetryPolicy,
};
