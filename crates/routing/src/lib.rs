//! Client-side partitioning for docdb
//!
//! - [`hash`]: hash functions for ring placement (MurmurHash3, xxh3)
//! - [`ring`]: the consistent hash ring primitive
//! - [`resolver`]: hash and range partition resolvers over collection links
//! - [`partition_key_cache`]: lazily loaded partition key definitions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod hash;
pub mod partition_key_cache;
pub mod resolver;
pub mod ring;

pub use hash::{HashGenerator, MurmurHash3, Xxh3Hash};
pub use partition_key_cache::InMemoryPartitionKeyDefinitionCache;
pub use resolver::{
    DocumentRouter, HashPartitionResolver, KeyRange, PartitionKeyExtractor, PartitionResolver,
    PropertyExtractor, RangePartitionResolver, RangeQuery, DEFAULT_VIRTUAL_NODES_PER_COLLECTION,
};
pub use ring::{ConsistentHashRing, RingEntry};
