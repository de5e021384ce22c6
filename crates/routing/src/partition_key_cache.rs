//! In-memory partition key definition cache
//!
//! Definitions are loaded lazily through a caller-supplied loader (normally a
//! collection read) and kept until a partition-key-mismatch response forces a
//! refresh. Loads run outside of any map lock; two threads missing the same
//! link at once may both load, and the first insert wins.

use dashmap::DashMap;
use docdb_core::{paths, DocDbResult, PartitionKeyDefinition, PartitionKeyDefinitionCache};
use std::fmt;

type Loader = dyn Fn(&str) -> DocDbResult<PartitionKeyDefinition> + Send + Sync;

/// `DashMap`-backed [`PartitionKeyDefinitionCache`]
pub struct InMemoryPartitionKeyDefinitionCache {
    entries: DashMap<String, PartitionKeyDefinition>,
    loader: Box<Loader>,
}

impl InMemoryPartitionKeyDefinitionCache {
    /// Empty cache that fills itself through `loader`
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn(&str) -> DocDbResult<PartitionKeyDefinition> + Send + Sync + 'static,
    {
        Self {
            entries: DashMap::new(),
            loader: Box::new(loader),
        }
    }

    /// Seed an entry without calling the loader
    pub fn insert(&self, collection_link: &str, definition: PartitionKeyDefinition) {
        self.entries.insert(cache_key(collection_link), definition);
    }

    /// Drop an entry; the next `get` reloads it
    pub fn invalidate(&self, collection_link: &str) {
        self.entries.remove(&cache_key(collection_link));
    }

    /// Cached definition, without loading
    pub fn peek(&self, collection_link: &str) -> Option<PartitionKeyDefinition> {
        self.entries
            .get(&cache_key(collection_link))
            .map(|entry| entry.value().clone())
    }

    /// Number of cached definitions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartitionKeyDefinitionCache for InMemoryPartitionKeyDefinitionCache {
    fn get(&self, collection_link: &str) -> DocDbResult<PartitionKeyDefinition> {
        let key = cache_key(collection_link);
        if let Some(entry) = self.entries.get(&key) {
            return Ok(entry.value().clone());
        }

        let loaded = (self.loader)(&key)?;
        let entry = self.entries.entry(key).or_insert(loaded);
        Ok(entry.value().clone())
    }

    fn refresh(&self, collection_link: &str) -> DocDbResult<()> {
        let key = cache_key(collection_link);
        self.entries.remove(&key);
        let loaded = (self.loader)(&key)?;
        tracing::info!(
            target: "docdb::routing",
            collection = %key,
            paths = ?loaded.paths,
            "Refreshed partition key definition"
        );
        self.entries.insert(key, loaded);
        Ok(())
    }
}

impl fmt::Debug for InMemoryPartitionKeyDefinitionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryPartitionKeyDefinitionCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Links are cached by their collection prefix without surrounding slashes
fn cache_key(collection_link: &str) -> String {
    paths::collection_path(collection_link)
        .unwrap_or_else(|| paths::trim_slashes(collection_link))
        .to_owned()
}
