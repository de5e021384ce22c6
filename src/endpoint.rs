//! Regional endpoint selection
//!
//! A geo-replicated account has one write region and any number of read
//! regions. [`GlobalEndpointManager`] reads the account topology, writes to
//! the first writable region, and reads from the first preferred location the
//! account offers. It falls back to the configured account endpoint whenever
//! the topology names nothing better.
//!
//! The topology is read lazily on first use and again whenever the endpoint
//! discovery retry policy reports that the write region moved. Concurrent
//! refresh requests collapse into one.

use docdb_core::{
    DocDbResult, DocumentServiceRequest, EndpointProvider, OperationType, ResourceType, Transport,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A named region and its endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseAccountLocation {
    /// Region name, e.g. "West US"
    pub name: String,
    /// Regional endpoint
    #[serde(rename = "databaseAccountEndpoint")]
    pub endpoint: String,
}

impl DatabaseAccountLocation {
    /// Location `name` served at `endpoint`
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Account topology: where writes and reads may go
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseAccount {
    /// Regions accepting writes, in service order
    #[serde(default)]
    pub writable_locations: Vec<DatabaseAccountLocation>,
    /// Regions accepting reads, in service order
    #[serde(default)]
    pub readable_locations: Vec<DatabaseAccountLocation>,
}

/// Source of account topology
pub trait TopologyReader: Send + Sync {
    /// Read the account topology through `endpoint`
    ///
    /// # Errors
    ///
    /// Returns the transport or service failure; the manager then tries the
    /// next candidate endpoint.
    fn read_account(&self, endpoint: &str) -> DocDbResult<DatabaseAccount>;
}

/// Reads the topology with a `GET` on the account root
pub struct TransportTopologyReader {
    transport: Arc<dyn Transport>,
}

impl TransportTopologyReader {
    /// Reader issuing requests through `transport`
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl TopologyReader for TransportTopologyReader {
    fn read_account(&self, endpoint: &str) -> DocDbResult<DatabaseAccount> {
        let request =
            DocumentServiceRequest::new(OperationType::Read, ResourceType::DatabaseAccount, "");
        self.transport.execute(&request, endpoint)?.json()
    }
}

/// Endpoint of the account replica in `region`
///
/// Regional endpoints insert the region name, without spaces, after the
/// account name: `https://acct.example.com/` becomes
/// `https://acct-WestUS.example.com/` for "West US". Returns `None` when
/// `default_endpoint` has no host or `region` is empty.
pub fn regional_endpoint(default_endpoint: &str, region: &str) -> Option<String> {
    if region.trim().is_empty() {
        return None;
    }
    let (scheme, rest) = match default_endpoint.find("://") {
        Some(idx) => default_endpoint.split_at(idx + 3),
        None => ("", default_endpoint),
    };
    let host_end = rest.find(|c| c == ':' || c == '/').unwrap_or(rest.len());
    let host = &rest[..host_end];
    if host.is_empty() {
        return None;
    }
    let account_end = host.find('.').unwrap_or(host.len());
    let region: String = region.chars().filter(|c| !c.is_whitespace()).collect();
    Some(format!(
        "{}{}-{}{}",
        scheme,
        &host[..account_end],
        region,
        &rest[account_end..]
    ))
}

fn endpoint_of(locations: &[DatabaseAccountLocation], region: &str) -> Option<String> {
    locations
        .iter()
        .find(|l| l.name == region)
        .map(|l| l.endpoint.clone())
}

#[derive(Debug, Default)]
struct EndpointState {
    initialized: bool,
    write_endpoint: Option<String>,
    read_endpoint: Option<String>,
    account: DatabaseAccount,
}

/// Topology-aware [`EndpointProvider`]
pub struct GlobalEndpointManager {
    default_endpoint: String,
    preferred_locations: Vec<String>,
    enable_endpoint_discovery: bool,
    reader: Arc<dyn TopologyReader>,
    state: RwLock<EndpointState>,
    refreshing: AtomicBool,
}

/// Clears the refresh flag when the refresh ends, even by panic
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl GlobalEndpointManager {
    /// Manager for the account at `default_endpoint`
    pub fn new(
        default_endpoint: impl Into<String>,
        preferred_locations: Vec<String>,
        enable_endpoint_discovery: bool,
        reader: Arc<dyn TopologyReader>,
    ) -> Self {
        Self {
            default_endpoint: default_endpoint.into(),
            preferred_locations,
            enable_endpoint_discovery,
            reader,
            state: RwLock::new(EndpointState::default()),
            refreshing: AtomicBool::new(false),
        }
    }

    /// Configured account endpoint
    pub fn default_endpoint(&self) -> &str {
        &self.default_endpoint
    }

    /// Topology seen by the last refresh
    pub fn account(&self) -> DatabaseAccount {
        self.ensure_initialized();
        self.state.read().account.clone()
    }

    fn ensure_initialized(&self) {
        if !self.state.read().initialized {
            self.refresh_endpoint_list();
        }
    }

    /// Topology through the account endpoint, else through the regional
    /// endpoint of each preferred location in turn
    fn read_account_from_any_endpoint(&self) -> Option<DatabaseAccount> {
        let candidates = std::iter::once(self.default_endpoint.clone()).chain(
            self.preferred_locations
                .iter()
                .filter_map(|region| regional_endpoint(&self.default_endpoint, region)),
        );
        for endpoint in candidates {
            match self.reader.read_account(&endpoint) {
                Ok(account) => return Some(account),
                Err(e) => {
                    tracing::warn!(
                        target: "docdb::endpoint",
                        endpoint = %endpoint,
                        error = %e,
                        "Failed to read account topology"
                    );
                }
            }
        }
        None
    }

    /// Pick endpoints for `account`
    fn select(&self, account: &DatabaseAccount) -> (String, String) {
        if !self.enable_endpoint_discovery {
            return (self.default_endpoint.clone(), self.default_endpoint.clone());
        }

        let write = account
            .writable_locations
            .iter()
            .find(|l| !l.name.is_empty())
            .map(|l| l.endpoint.clone())
            .unwrap_or_else(|| self.default_endpoint.clone());

        // Reads follow writes unless a preferred location is available
        let preferred_read = if account.readable_locations.is_empty() {
            None
        } else {
            self.preferred_locations
                .iter()
                .filter(|region| !region.is_empty())
                .find_map(|region| {
                    endpoint_of(&account.readable_locations, region)
                        .or_else(|| endpoint_of(&account.writable_locations, region))
                })
        };
        let read = preferred_read.unwrap_or_else(|| write.clone());

        (write, read)
    }
}

impl EndpointProvider for GlobalEndpointManager {
    fn resolve_endpoint(&self, operation: OperationType) -> String {
        let endpoint = if operation.is_write() {
            self.write_endpoint()
        } else {
            self.read_endpoint()
        };
        if endpoint.is_empty() {
            self.default_endpoint.clone()
        } else {
            endpoint
        }
    }

    fn read_endpoint(&self) -> String {
        self.ensure_initialized();
        self.state
            .read()
            .read_endpoint
            .clone()
            .unwrap_or_else(|| self.default_endpoint.clone())
    }

    fn write_endpoint(&self) -> String {
        self.ensure_initialized();
        self.state
            .read()
            .write_endpoint
            .clone()
            .unwrap_or_else(|| self.default_endpoint.clone())
    }

    fn refresh_endpoint_list(&self) {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(target: "docdb::endpoint", "Topology refresh already running");
            return;
        }
        let _guard = RefreshGuard(&self.refreshing);

        let account = if self.enable_endpoint_discovery {
            self.read_account_from_any_endpoint().unwrap_or_default()
        } else {
            DatabaseAccount::default()
        };
        let (write, read) = self.select(&account);

        let mut state = self.state.write();
        if state.write_endpoint.as_deref() != Some(write.as_str())
            || state.read_endpoint.as_deref() != Some(read.as_str())
        {
            tracing::info!(
                target: "docdb::endpoint",
                write_endpoint = %write,
                read_endpoint = %read,
                "Selected endpoints"
            );
        }
        state.initialized = true;
        state.write_endpoint = Some(write);
        state.read_endpoint = Some(read);
        state.account = account;
    }
}

/// Single-region [`EndpointProvider`]: every operation goes to one endpoint
#[derive(Debug, Clone)]
pub struct StaticEndpointProvider {
    endpoint: String,
}

impl StaticEndpointProvider {
    /// Provider that always answers `endpoint`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl EndpointProvider for StaticEndpointProvider {
    fn read_endpoint(&self) -> String {
        self.endpoint.clone()
    }

    fn write_endpoint(&self) -> String {
        self.endpoint.clone()
    }

    fn refresh_endpoint_list(&self) {}
}
