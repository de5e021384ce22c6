//! Client configuration via `docdb.toml`
//!
//! Everything has a default except the service endpoint. A file only needs
//! the settings it changes; the `[retry]` table likewise.

use docdb_core::{DocDbError, DocDbResult};
use docdb_retry::RetryOptions;
use docdb_routing::DEFAULT_VIRTUAL_NODES_PER_COLLECTION;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "docdb.toml";

/// Consistency level the account is read at.
///
/// Session tokens are only sent under `Session`, which is also the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    /// Linearizable reads
    Strong,
    /// Reads lag writes by a bounded window
    BoundedStaleness,
    /// Read-your-own-writes within a client
    #[default]
    Session,
    /// Reads never see out-of-order writes
    ConsistentPrefix,
    /// No ordering guarantee
    Eventual,
}

impl ConsistencyLevel {
    /// Wire name, as sent in `x-ms-consistency-level`
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLevel::Strong => "Strong",
            ConsistencyLevel::BoundedStaleness => "BoundedStaleness",
            ConsistencyLevel::Session => "Session",
            ConsistencyLevel::ConsistentPrefix => "ConsistentPrefix",
            ConsistencyLevel::Eventual => "Eventual",
        }
    }
}

/// Client configuration loaded from `docdb.toml`.
///
/// # Example
///
/// ```toml
/// service_endpoint = "https://myaccount.documents.example.com:443/"
/// preferred_locations = ["West US", "East US"]
///
/// [retry]
/// max_retry_attempts_on_throttled_requests = 3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Account endpoint; also the fallback for reads and writes.
    pub service_endpoint: String,
    /// Follow the write region when it moves (default: true).
    #[serde(default = "default_enable_endpoint_discovery")]
    pub enable_endpoint_discovery: bool,
    /// Regions to read from, most preferred first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_locations: Vec<String>,
    /// Transport timeout per attempt in seconds (default: 60).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Consistency level requests are served at (default: "Session").
    #[serde(default)]
    pub consistency_level: ConsistencyLevel,
    /// Virtual nodes per collection in hash partition resolvers (default: 128).
    #[serde(default = "default_virtual_nodes_per_collection")]
    pub virtual_nodes_per_collection: usize,
    /// Retry bounds.
    #[serde(default)]
    pub retry: RetryOptions,
}

fn default_enable_endpoint_discovery() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_virtual_nodes_per_collection() -> usize {
    DEFAULT_VIRTUAL_NODES_PER_COLLECTION
}

impl ClientConfig {
    /// Configuration for `service_endpoint` with every other setting defaulted.
    pub fn new(service_endpoint: impl Into<String>) -> Self {
        Self {
            service_endpoint: service_endpoint.into(),
            enable_endpoint_discovery: default_enable_endpoint_discovery(),
            preferred_locations: Vec::new(),
            request_timeout_secs: default_request_timeout_secs(),
            consistency_level: ConsistencyLevel::default(),
            virtual_nodes_per_collection: default_virtual_nodes_per_collection(),
            retry: RetryOptions::default(),
        }
    }

    /// Enable or disable endpoint discovery.
    pub fn with_endpoint_discovery(mut self, enabled: bool) -> Self {
        self.enable_endpoint_discovery = enabled;
        self
    }

    /// Set the preferred read locations.
    pub fn with_preferred_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_locations = locations.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-attempt transport timeout.
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Set the consistency level.
    pub fn with_consistency_level(mut self, level: ConsistencyLevel) -> Self {
        self.consistency_level = level;
        self
    }

    /// Set the virtual node count used by hash partition resolvers.
    pub fn with_virtual_nodes_per_collection(mut self, nodes: usize) -> Self {
        self.virtual_nodes_per_collection = nodes;
        self
    }

    /// Replace the retry bounds.
    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    /// Per-attempt transport timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reject settings the client cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an empty endpoint, a zero timeout, zero virtual
    /// nodes, or invalid retry bounds.
    pub fn validate(&self) -> DocDbResult<()> {
        if self.service_endpoint.trim().is_empty() {
            return Err(DocDbError::config("service_endpoint must not be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(DocDbError::config("request_timeout_secs must be at least 1"));
        }
        if self.virtual_nodes_per_collection == 0 {
            return Err(DocDbError::config(
                "virtual_nodes_per_collection must be at least 1",
            ));
        }
        self.retry.validate()
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# docdb client configuration
#
# Account endpoint. Reads and writes fall back to it when the account
# topology names no better region.
service_endpoint = "https://localhost:8081/"

# Follow the write region when it moves (default: true)
enable_endpoint_discovery = true

# Regions to read from, most preferred first
# preferred_locations = ["West US", "East US"]

# Transport timeout per attempt, in seconds (default: 60)
request_timeout_secs = 60

# Consistency level: "Strong", "BoundedStaleness", "Session" (default),
# "ConsistentPrefix" or "Eventual". Session tokens are only sent under "Session".
consistency_level = "Session"

# Virtual nodes per collection for hash partition resolvers (default: 128)
virtual_nodes_per_collection = 128

# Retry bounds. Every key is optional.
[retry]
max_retry_attempts_on_throttled_requests = 9
max_retry_wait_time_secs = 30
# default_throttle_retry_after_ms = 5000
# max_endpoint_discovery_retries = 120
# endpoint_discovery_retry_interval_ms = 1000
# max_session_read_retries = 1
# max_partition_key_mismatch_retries = 1
# gone_initial_backoff_secs = 1
# gone_backoff_multiplier = 2
# gone_max_wait_time_secs = 30
"#
    }

    /// Parse and validate config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the text does not parse or fails validation.
    pub fn from_toml_str(content: &str) -> DocDbResult<Self> {
        let config: ClientConfig = toml::from_str(content)
            .map_err(|e| DocDbError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> DocDbResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DocDbError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            DocDbError::Config(msg) => {
                DocDbError::config(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> DocDbResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                DocDbError::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> DocDbResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DocDbError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            DocDbError::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
