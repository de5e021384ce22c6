//! Client facade
//!
//! [`DocumentClient`] wires the layers together. Every operation goes
//! through the same pipeline:
//!
//! ```text
//! apply ambient session token
//!   → retry orchestrator
//!       → endpoint (override or resolved) → transport
//!   → capture session token (or clear it after a collection delete)
//! ```
//!
//! Feeds and queries wrap that pipeline once per page in a [`QueryCursor`].

use docdb_core::constants::headers;
use docdb_core::types::is_reading_from_master;
use docdb_core::{
    paths, DocDbError, DocDbResult, DocumentServiceRequest, DocumentServiceResponse,
    EndpointProvider, OperationType, PartitionKeyDefinitionCache, ResourceType, Transport,
};
use docdb_query::{FeedOptions, FeedPage, MultiCollectionCursor, QueryCursor};
use docdb_retry::{RetryOrchestrator, Sleeper, ThreadSleeper};
use docdb_routing::{DocumentRouter, HashPartitionResolver, MurmurHash3, PartitionKeyExtractor};
use docdb_session::SessionContainer;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::{ClientConfig, ConsistencyLevel};
use crate::endpoint::{GlobalEndpointManager, TransportTopologyReader};

/// Session-consistent, retrying client over a [`Transport`]
///
/// Thread safety: share one client between threads with `Arc`; every
/// operation runs on its caller's thread.
pub struct DocumentClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    endpoints: Arc<dyn EndpointProvider>,
    session: Arc<SessionContainer>,
    partition_key_cache: Option<Arc<dyn PartitionKeyDefinitionCache>>,
    sleeper: Arc<dyn Sleeper>,
    retry: RetryOrchestrator,
    resolvers: RwLock<HashMap<String, Arc<dyn DocumentRouter>>>,
}

impl DocumentClient {
    /// Client for the account in `config`, sending requests through `transport`
    ///
    /// Endpoints come from a [`GlobalEndpointManager`] that reads the account
    /// topology through the same transport.
    ///
    /// # Errors
    ///
    /// Returns `Config` when `config` fails validation.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> DocDbResult<Self> {
        config.validate()?;
        let endpoints: Arc<dyn EndpointProvider> = Arc::new(GlobalEndpointManager::new(
            config.service_endpoint.clone(),
            config.preferred_locations.clone(),
            config.enable_endpoint_discovery,
            Arc::new(TransportTopologyReader::new(Arc::clone(&transport))),
        ));
        let session = Arc::new(SessionContainer::new());
        let sleeper: Arc<dyn Sleeper> = Arc::new(ThreadSleeper);
        let retry = build_orchestrator(&config, &endpoints, None, &sleeper);

        tracing::info!(
            target: "docdb::client",
            endpoint = %config.service_endpoint,
            consistency = config.consistency_level.as_str(),
            endpoint_discovery = config.enable_endpoint_discovery,
            "Client created"
        );

        Ok(Self {
            config,
            transport,
            endpoints,
            session,
            partition_key_cache: None,
            sleeper,
            retry,
            resolvers: RwLock::new(HashMap::new()),
        })
    }

    /// Client sending requests over HTTPS
    ///
    /// # Errors
    ///
    /// Returns `Config` when `config` fails validation.
    #[cfg(feature = "http")]
    pub fn with_http(config: ClientConfig) -> DocDbResult<Self> {
        let transport = Arc::new(crate::http::HttpTransport::new(config.request_timeout()));
        Self::new(config, transport)
    }

    /// Replace the endpoint provider
    pub fn with_endpoint_provider(mut self, endpoints: Arc<dyn EndpointProvider>) -> Self {
        self.endpoints = endpoints;
        self.rebuild_orchestrator();
        self
    }

    /// Refresh partition key definitions through `cache` on key mismatches
    pub fn with_partition_key_cache(mut self, cache: Arc<dyn PartitionKeyDefinitionCache>) -> Self {
        self.partition_key_cache = Some(cache);
        self.rebuild_orchestrator();
        self
    }

    /// Wait between retries with `sleeper`
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self.rebuild_orchestrator();
        self
    }

    fn rebuild_orchestrator(&mut self) {
        self.retry = build_orchestrator(
            &self.config,
            &self.endpoints,
            self.partition_key_cache.clone(),
            &self.sleeper,
        );
    }

    /// Configuration the client was created with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Session token store
    pub fn session(&self) -> &Arc<SessionContainer> {
        &self.session
    }

    /// Endpoint provider
    pub fn endpoints(&self) -> &Arc<dyn EndpointProvider> {
        &self.endpoints
    }

    // ========================================================================
    // Session tokens
    // ========================================================================

    /// Attach the stored session token for the addressed collection
    ///
    /// Leaves the request alone when it already carries a session token, when
    /// neither the client nor the request asks for session consistency, and
    /// for master operations.
    pub fn apply_ambient_session_token(&self, request: &mut DocumentServiceRequest) {
        if request
            .header(headers::SESSION_TOKEN)
            .is_some_and(|token| !token.is_empty())
        {
            return;
        }

        let session_consistency = match request.header(headers::CONSISTENCY_LEVEL) {
            Some(level) => level.eq_ignore_ascii_case(ConsistencyLevel::Session.as_str()),
            None => self.config.consistency_level == ConsistencyLevel::Session,
        };
        if !session_consistency
            || is_reading_from_master(request.resource_type(), request.operation_type())
        {
            return;
        }

        if let Some(token) = self.session.resolve_session_token(request) {
            request.set_header(headers::SESSION_TOKEN, token);
        }
    }

    /// Record the session token of a successful response
    pub fn capture_session_token(
        &self,
        request: &DocumentServiceRequest,
        response: &DocumentServiceResponse,
    ) {
        self.session.set_session_token(request, response);
    }

    /// Forget the session tokens of the collection `request` addresses
    pub fn clear_session_token(&self, request: &DocumentServiceRequest) {
        self.session.clear_token(request);
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Run `request` through the session and retry pipeline
    ///
    /// # Errors
    ///
    /// Returns the last failure once retrying stops; terminal failures on the
    /// first attempt.
    pub fn execute(&self, mut request: DocumentServiceRequest) -> DocDbResult<DocumentServiceResponse> {
        self.apply_ambient_session_token(&mut request);

        let response = self.retry.execute(&mut request, |attempt| self.send(attempt))?;

        if request.operation_type() == OperationType::Delete
            && request.resource_type() == ResourceType::DocumentCollection
        {
            self.clear_session_token(&request);
        } else {
            self.capture_session_token(&request, &response);
        }
        Ok(response)
    }

    /// One attempt: resolve the endpoint and hand the request to the transport
    fn send(&self, request: &mut DocumentServiceRequest) -> DocDbResult<DocumentServiceResponse> {
        let endpoint = match request.endpoint_override() {
            Some(endpoint) => endpoint.to_owned(),
            None => self.endpoints.resolve_endpoint(request.operation_type()),
        };
        tracing::trace!(
            target: "docdb::client",
            operation = ?request.operation_type(),
            path = request.path(),
            endpoint = %endpoint,
            "Sending attempt"
        );
        self.transport.execute(request, &endpoint)
    }

    // ========================================================================
    // Feeds and queries
    // ========================================================================

    /// Lazy cursor over the feed or query addressed by `request`
    ///
    /// Each page runs through [`DocumentClient::execute`]; items are decoded
    /// from the feed property of the request's resource type.
    pub fn open_cursor<'a, T>(
        &'a self,
        request: DocumentServiceRequest,
        options: &FeedOptions,
    ) -> QueryCursor<'a, T>
    where
        T: DeserializeOwned + Send + 'a,
    {
        QueryCursor::new(request, options, move |template: &mut DocumentServiceRequest| {
            let resource_type = template.resource_type();
            let response = self.execute(template.clone())?;
            FeedPage::from_response(&response, resource_type)
        })
    }

    /// Cursor over the documents of one collection
    pub fn read_documents<'a, T>(&'a self, collection_link: &str, options: &FeedOptions) -> QueryCursor<'a, T>
    where
        T: DeserializeOwned + Send + 'a,
    {
        let request = DocumentServiceRequest::new(
            OperationType::ReadFeed,
            ResourceType::Document,
            documents_link(collection_link),
        );
        self.open_cursor(request, options)
    }

    /// Cursor over the results of a SQL query against one collection
    ///
    /// # Errors
    ///
    /// Returns `Serialization` when `parameters` cannot be encoded.
    pub fn query_documents<'a, T>(
        &'a self,
        collection_link: &str,
        query: &str,
        parameters: &[(&str, Value)],
        options: &FeedOptions,
    ) -> DocDbResult<QueryCursor<'a, T>>
    where
        T: DeserializeOwned + Send + 'a,
    {
        let request = query_request(collection_link, query, parameters)?;
        Ok(self.open_cursor(request, options))
    }

    // ========================================================================
    // Client-side partitioning
    // ========================================================================

    /// Route documents of `database_link` through `resolver`
    ///
    /// Replaces any resolver registered earlier for the same database.
    pub fn register_partition_resolver(&self, database_link: &str, resolver: Arc<dyn DocumentRouter>) {
        let key = paths::trim_slashes(database_link).to_owned();
        tracing::debug!(target: "docdb::client", database = %key, "Registered partition resolver");
        self.resolvers.write().insert(key, resolver);
    }

    /// Shard `database_link` over `collection_links` with a consistent hash ring
    ///
    /// Each collection gets the configured `virtual_nodes_per_collection`
    /// points on the ring. The resolver is registered for the database and
    /// also returned.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `collection_links` is empty.
    pub fn register_hash_partition_resolver<E, I, S>(
        &self,
        database_link: &str,
        extractor: E,
        collection_links: I,
    ) -> DocDbResult<Arc<HashPartitionResolver>>
    where
        E: PartitionKeyExtractor<String> + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let resolver = Arc::new(HashPartitionResolver::with_options(
            extractor,
            collection_links,
            self.config.virtual_nodes_per_collection,
            Arc::new(MurmurHash3::default()),
        )?);
        self.register_partition_resolver(database_link, resolver.clone());
        Ok(resolver)
    }

    /// Resolver registered for `database_link`
    pub fn partition_resolver(&self, database_link: &str) -> Option<Arc<dyn DocumentRouter>> {
        self.resolvers
            .read()
            .get(paths::trim_slashes(database_link))
            .cloned()
    }

    fn require_resolver(&self, database_link: &str) -> DocDbResult<Arc<dyn DocumentRouter>> {
        self.partition_resolver(database_link).ok_or_else(|| {
            DocDbError::invalid_input(format!(
                "no partition resolver registered for '{}'",
                database_link
            ))
        })
    }

    /// Create `document` in the collection the database's resolver picks
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when no resolver is registered for
    /// `database_link` or the resolver rejects the document, else the failure
    /// of the create itself.
    pub fn create_document(&self, database_link: &str, document: &Value) -> DocDbResult<DocumentServiceResponse> {
        let collection = self.require_resolver(database_link)?.route_create(document)?;
        self.create_document_in(&collection, document)
    }

    /// Create `document` in `collection_link`
    ///
    /// # Errors
    ///
    /// Returns the failure of the create.
    pub fn create_document_in(&self, collection_link: &str, document: &Value) -> DocDbResult<DocumentServiceResponse> {
        let request = DocumentServiceRequest::new(
            OperationType::Create,
            ResourceType::Document,
            documents_link(collection_link),
        )
        .with_body(serde_json::to_vec(document)?);
        self.execute(request)
    }

    /// Cursor over the documents of every collection of a partitioned database
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when no resolver is registered for `database_link`.
    pub fn read_documents_across<'a, T>(
        &'a self,
        database_link: &str,
        options: &FeedOptions,
    ) -> DocDbResult<MultiCollectionCursor<'a, T>>
    where
        T: DeserializeOwned + Send + 'a,
    {
        let collections = self.require_resolver(database_link)?.all_collections()?;
        let cursors = collections
            .iter()
            .map(|collection| self.read_documents(collection, options))
            .collect();
        Ok(MultiCollectionCursor::new(cursors))
    }

    /// Run a SQL query against every collection of a partitioned database
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when no resolver is registered for
    /// `database_link`, `Serialization` when `parameters` cannot be encoded.
    pub fn query_documents_across<'a, T>(
        &'a self,
        database_link: &str,
        query: &str,
        parameters: &[(&str, Value)],
        options: &FeedOptions,
    ) -> DocDbResult<MultiCollectionCursor<'a, T>>
    where
        T: DeserializeOwned + Send + 'a,
    {
        let collections = self.require_resolver(database_link)?.all_collections()?;
        let mut cursors = Vec::with_capacity(collections.len());
        for collection in &collections {
            cursors.push(self.query_documents(collection, query, parameters, options)?);
        }
        Ok(MultiCollectionCursor::new(cursors))
    }
}

impl fmt::Debug for DocumentClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentClient")
            .field("endpoint", &self.config.service_endpoint)
            .field("consistency_level", &self.config.consistency_level)
            .field("collections_with_tokens", &self.session.collection_count())
            .field("partitioned_databases", &self.resolvers.read().len())
            .finish()
    }
}

fn build_orchestrator(
    config: &ClientConfig,
    endpoints: &Arc<dyn EndpointProvider>,
    partition_key_cache: Option<Arc<dyn PartitionKeyDefinitionCache>>,
    sleeper: &Arc<dyn Sleeper>,
) -> RetryOrchestrator {
    let mut orchestrator = RetryOrchestrator::new(config.retry.clone(), Arc::clone(endpoints))
        .with_endpoint_discovery(config.enable_endpoint_discovery)
        .with_sleeper(Arc::clone(sleeper));
    if let Some(cache) = partition_key_cache {
        orchestrator = orchestrator.with_partition_key_cache(cache);
    }
    orchestrator
}

/// `<collection>/docs`
fn documents_link(collection_link: &str) -> String {
    format!("{}/docs", paths::trim_slashes(collection_link))
}

/// POST body and headers of a SQL query
fn query_request(
    collection_link: &str,
    query: &str,
    parameters: &[(&str, Value)],
) -> DocDbResult<DocumentServiceRequest> {
    let parameters: Vec<Value> = parameters
        .iter()
        .map(|(name, value)| serde_json::json!({ "name": name, "value": value }))
        .collect();
    let body = serde_json::json!({ "query": query, "parameters": parameters });
    Ok(DocumentServiceRequest::new(
        OperationType::Query,
        ResourceType::Document,
        documents_link(collection_link),
    )
    .with_header(headers::IS_QUERY, "true")
    .with_body(serde_json::to_vec(&body)?))
}
