//! Client-side partition resolvers
//!
//! A resolver spreads documents over a fixed set of collections:
//! - [`HashPartitionResolver`]: consistent hashing of a string key
//! - [`RangePartitionResolver`]: ordered key ranges mapped to collections
//!
//! Both pull the partition key out of a document through a
//! [`PartitionKeyExtractor`]. The client stores resolvers behind the
//! object-safe [`DocumentRouter`] view, which every resolver gets for free.

use docdb_core::{DocDbError, DocDbResult};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::hash::{HashGenerator, MurmurHash3};
use crate::ring::ConsistentHashRing;

/// Virtual nodes per collection when none is configured
pub const DEFAULT_VIRTUAL_NODES_PER_COLLECTION: usize = 128;

/// Pulls the partition key out of a document
pub trait PartitionKeyExtractor<K>: Send + Sync {
    /// Partition key of `document`
    fn extract(&self, document: &Value) -> DocDbResult<K>;
}

impl<K, F> PartitionKeyExtractor<K> for F
where
    F: Fn(&Value) -> DocDbResult<K> + Send + Sync,
{
    fn extract(&self, document: &Value) -> DocDbResult<K> {
        self(document)
    }
}

/// Reads a string property addressed by a JSON pointer (`/tenant/id`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyExtractor {
    pointer: String,
}

impl PropertyExtractor {
    /// Extract the value at `pointer`; a bare name is treated as a top-level property
    pub fn new(pointer: impl Into<String>) -> Self {
        let pointer = pointer.into();
        let pointer = if pointer.starts_with('/') {
            pointer
        } else {
            format!("/{}", pointer)
        };
        Self { pointer }
    }

    /// JSON pointer read by this extractor
    pub fn pointer(&self) -> &str {
        &self.pointer
    }
}

impl PartitionKeyExtractor<String> for PropertyExtractor {
    fn extract(&self, document: &Value) -> DocDbResult<String> {
        match document.pointer(&self.pointer) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(DocDbError::invalid_input(format!(
                "partition key at '{}' must be a string, found {}",
                self.pointer, other
            ))),
            None => Err(DocDbError::invalid_input(format!(
                "document has no partition key at '{}'",
                self.pointer
            ))),
        }
    }
}

/// Maps documents and partition keys to collection links
pub trait PartitionResolver: Send + Sync {
    /// Key type accepted for reads
    type Key: ?Sized;

    /// Collection a new document must be created in
    fn resolve_for_create(&self, document: &Value) -> DocDbResult<String>;

    /// Collections that may hold documents for `key`; every collection when `None`
    fn resolve_for_read(&self, key: Option<&Self::Key>) -> DocDbResult<Vec<String>>;
}

/// Object-safe view of a resolver used by the client
pub trait DocumentRouter: Send + Sync {
    /// Collection a new document must be created in
    fn route_create(&self, document: &Value) -> DocDbResult<String>;

    /// Every collection managed by the resolver
    fn all_collections(&self) -> DocDbResult<Vec<String>>;
}

impl<R: PartitionResolver> DocumentRouter for R {
    fn route_create(&self, document: &Value) -> DocDbResult<String> {
        self.resolve_for_create(document)
    }

    fn all_collections(&self) -> DocDbResult<Vec<String>> {
        self.resolve_for_read(None)
    }
}

// ============================================================================
// Hash partitioning
// ============================================================================

/// Consistent-hash resolver over a fixed collection set
pub struct HashPartitionResolver {
    extractor: Box<dyn PartitionKeyExtractor<String>>,
    ring: ConsistentHashRing,
}

impl HashPartitionResolver {
    /// Resolver with 128 virtual nodes per collection and MurmurHash3
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `collection_links` is empty.
    pub fn new<E, I, S>(extractor: E, collection_links: I) -> DocDbResult<Self>
    where
        E: PartitionKeyExtractor<String> + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_options(
            extractor,
            collection_links,
            DEFAULT_VIRTUAL_NODES_PER_COLLECTION,
            Arc::new(MurmurHash3::default()),
        )
    }

    /// Resolver with explicit ring parameters
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `virtual_nodes` is zero or
    /// `collection_links` is empty.
    pub fn with_options<E, I, S>(
        extractor: E,
        collection_links: I,
        virtual_nodes: usize,
        hasher: Arc<dyn HashGenerator>,
    ) -> DocDbResult<Self>
    where
        E: PartitionKeyExtractor<String> + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ring = ConsistentHashRing::with_hasher(collection_links, virtual_nodes, hasher)?;
        Ok(Self {
            extractor: Box::new(extractor),
            ring,
        })
    }

    /// Underlying ring
    pub fn ring(&self) -> &ConsistentHashRing {
        &self.ring
    }

    /// Collections in registration order
    pub fn collection_links(&self) -> &[String] {
        self.ring.partitions()
    }
}

impl PartitionResolver for HashPartitionResolver {
    type Key = str;

    fn resolve_for_create(&self, document: &Value) -> DocDbResult<String> {
        let key = self.extractor.extract(document)?;
        Ok(self.ring.lookup(&key).to_owned())
    }

    fn resolve_for_read(&self, key: Option<&str>) -> DocDbResult<Vec<String>> {
        Ok(match key {
            Some(key) => vec![self.ring.lookup(key).to_owned()],
            None => self.ring.partitions().to_vec(),
        })
    }
}

impl fmt::Debug for HashPartitionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashPartitionResolver")
            .field("ring", &self.ring)
            .finish()
    }
}

// ============================================================================
// Range partitioning
// ============================================================================

/// Closed interval `[low, high]` of partition keys
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyRange<T> {
    low: T,
    high: T,
}

impl<T: Ord> KeyRange<T> {
    /// Range from `low` to `high`, both inclusive
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `low > high`.
    pub fn new(low: T, high: T) -> DocDbResult<Self> {
        if low > high {
            return Err(DocDbError::invalid_input(
                "range low value must be less than or equal to the high value",
            ));
        }
        Ok(Self { low, high })
    }

    /// Lower bound
    pub fn low(&self) -> &T {
        &self.low
    }

    /// Upper bound
    pub fn high(&self) -> &T {
        &self.high
    }

    /// True when `value` lies in the range
    pub fn contains(&self, value: &T) -> bool {
        &self.low <= value && value <= &self.high
    }

    /// True when `other` lies entirely in the range
    pub fn contains_range(&self, other: &KeyRange<T>) -> bool {
        other.low >= self.low && other.high <= self.high
    }

    /// True when the two ranges share at least one point
    pub fn intersects(&self, other: &KeyRange<T>) -> bool {
        let max_low = std::cmp::max(&self.low, &other.low);
        let min_high = std::cmp::min(&self.high, &other.high);
        max_low <= min_high
    }
}

impl<T: Clone> KeyRange<T> {
    /// Single-point range
    pub fn point(value: T) -> Self {
        Self {
            low: value.clone(),
            high: value,
        }
    }
}

/// Read-side selector for [`RangePartitionResolver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeQuery<T> {
    /// One key
    Point(T),
    /// Any of several keys
    Points(Vec<T>),
    /// Every key in a range
    Range(KeyRange<T>),
}

/// Resolver mapping key ranges to collections
pub struct RangePartitionResolver<T> {
    extractor: Box<dyn PartitionKeyExtractor<T>>,
    partition_map: Vec<(KeyRange<T>, String)>,
}

impl<T> RangePartitionResolver<T>
where
    T: Ord + Clone + fmt::Debug + Send + Sync,
{
    /// Resolver over `partition_map`, searched in the given order
    pub fn new<E, I, S>(extractor: E, partition_map: I) -> Self
    where
        E: PartitionKeyExtractor<T> + 'static,
        I: IntoIterator<Item = (KeyRange<T>, S)>,
        S: Into<String>,
    {
        Self {
            extractor: Box::new(extractor),
            partition_map: partition_map
                .into_iter()
                .map(|(range, link)| (range, link.into()))
                .collect(),
        }
    }

    /// The range → collection map
    pub fn partition_map(&self) -> &[(KeyRange<T>, String)] {
        &self.partition_map
    }

    fn intersecting(&self, probes: &[KeyRange<T>]) -> Vec<String> {
        self.partition_map
            .iter()
            .filter(|(range, _)| probes.iter().any(|probe| range.intersects(probe)))
            .map(|(_, link)| link.clone())
            .collect()
    }
}

impl<T> PartitionResolver for RangePartitionResolver<T>
where
    T: Ord + Clone + fmt::Debug + Send + Sync,
{
    type Key = RangeQuery<T>;

    fn resolve_for_create(&self, document: &Value) -> DocDbResult<String> {
        let key = self.extractor.extract(document)?;
        self.partition_map
            .iter()
            .find(|(range, _)| range.contains(&key))
            .map(|(_, link)| link.clone())
            .ok_or_else(|| {
                DocDbError::invalid_input(format!(
                    "no range in the partition map contains {:?}",
                    key
                ))
            })
    }

    fn resolve_for_read(&self, key: Option<&RangeQuery<T>>) -> DocDbResult<Vec<String>> {
        let probes = match key {
            None => {
                return Ok(self
                    .partition_map
                    .iter()
                    .map(|(_, link)| link.clone())
                    .collect())
            }
            Some(RangeQuery::Point(point)) => vec![KeyRange::point(point.clone())],
            Some(RangeQuery::Points(points)) => {
                points.iter().cloned().map(KeyRange::point).collect()
            }
            Some(RangeQuery::Range(range)) => vec![range.clone()],
        };
        Ok(self.intersecting(&probes))
    }
}

impl<T: fmt::Debug> fmt::Debug for RangePartitionResolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangePartitionResolver")
            .field("partition_map", &self.partition_map)
            .finish()
    }
}
