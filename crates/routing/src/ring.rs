//! Consistent hash ring
//!
//! Each partition (a collection link) is placed on a 32-bit ring at
//! `virtual_nodes` points. The first point is the hash of the partition name;
//! every following point is the hash of the previous point's 4 little-endian
//! bytes. Points are ordered most significant byte first, which for those
//! little-endian bytes is plain `u32` order. A key belongs to the first point
//! at or after its own hash, wrapping past the top of the ring to the first
//! point.
//!
//! Adding a partition moves only the keys that land on its new points, which
//! is what makes client-side sharding over a growing collection set workable.

use docdb_core::{DocDbError, DocDbResult};
use std::fmt;
use std::sync::Arc;

use crate::hash::{HashGenerator, MurmurHash3};

/// One point on the ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingEntry {
    /// Position on the ring
    pub hash: u32,
    /// Index into [`ConsistentHashRing::partitions`]
    pub partition: usize,
}

/// Immutable consistent hash ring
#[derive(Clone)]
pub struct ConsistentHashRing {
    entries: Vec<RingEntry>,
    partitions: Vec<String>,
    hasher: Arc<dyn HashGenerator>,
}

impl ConsistentHashRing {
    /// Build a ring using MurmurHash3
    ///
    /// # Errors
    ///
    /// See [`ConsistentHashRing::with_hasher`].
    pub fn new<I, S>(partitions: I, virtual_nodes: usize) -> DocDbResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_hasher(partitions, virtual_nodes, Arc::new(MurmurHash3::default()))
    }

    /// Build a ring with an explicit hash function
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `virtual_nodes` is zero or no partition is
    /// given.
    pub fn with_hasher<I, S>(
        partitions: I,
        virtual_nodes: usize,
        hasher: Arc<dyn HashGenerator>,
    ) -> DocDbResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if virtual_nodes == 0 {
            return Err(DocDbError::invalid_input(
                "the number of virtual nodes per partition must be greater than 0",
            ));
        }
        let partitions: Vec<String> = partitions.into_iter().map(Into::into).collect();
        if partitions.is_empty() {
            return Err(DocDbError::invalid_input(
                "a hash ring needs at least one partition",
            ));
        }

        let mut entries = Vec::with_capacity(partitions.len() * virtual_nodes);
        for (index, name) in partitions.iter().enumerate() {
            let mut hash = hasher.hash(name.as_bytes());
            for _ in 0..virtual_nodes {
                entries.push(RingEntry {
                    hash,
                    partition: index,
                });
                hash = hasher.hash(&hash.to_le_bytes());
            }
        }
        // Stable: on an exact tie the partition registered first wins.
        entries.sort_by_key(|entry| entry.hash);

        tracing::debug!(
            target: "docdb::routing",
            partitions = partitions.len(),
            virtual_nodes,
            "Built consistent hash ring"
        );

        Ok(Self {
            entries,
            partitions,
            hasher,
        })
    }

    /// Partition owning `key`
    pub fn lookup(&self, key: &str) -> &str {
        let index = self.entry_index(self.hasher.hash(key.as_bytes()));
        &self.partitions[self.entries[index].partition]
    }

    /// Index of the first entry whose hash is `>= hash`, wrapping to 0
    pub fn entry_index(&self, hash: u32) -> usize {
        let index = self.entries.partition_point(|entry| entry.hash < hash);
        if index == self.entries.len() {
            0
        } else {
            index
        }
    }

    /// Ring points in ascending hash order
    pub fn entries(&self) -> &[RingEntry] {
        &self.entries
    }

    /// Number of ring points
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: construction rejects empty rings
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Partitions in registration order
    pub fn partitions(&self) -> &[String] {
        &self.partitions
    }

    /// `(partition, hash)` pairs in ring order
    pub fn serialized_entries(&self) -> Vec<(&str, u32)> {
        self.entries
            .iter()
            .map(|entry| (self.partitions[entry.partition].as_str(), entry.hash))
            .collect()
    }
}

impl fmt::Debug for ConsistentHashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsistentHashRing")
            .field("partitions", &self.partitions)
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Identity-ish hash that makes ring positions predictable
    struct FixedHash;

    impl HashGenerator for FixedHash {
        fn hash(&self, data: &[u8]) -> u32 {
            match data {
                b"a" => 100,
                b"b" => 200,
                b"c" => 300,
                _ if data.len() == 4 => u32::from_le_bytes([data[0], data[1], data[2], data[3]]) + 1000,
                _ => data.iter().map(|b| u32::from(*b)).sum(),
            }
        }
    }

    fn fixed_ring() -> ConsistentHashRing {
        ConsistentHashRing::with_hasher(["a", "b", "c"], 1, Arc::new(FixedHash)).unwrap()
    }

    #[test]
    fn test_rejects_zero_virtual_nodes() {
        assert!(ConsistentHashRing::new(["a"], 0).is_err());
    }

    #[test]
    fn test_rejects_empty_partition_set() {
        assert!(ConsistentHashRing::new(Vec::<String>::new(), 4).is_err());
    }

    #[test]
    fn test_first_entry_at_or_after_key_hash() {
        let ring = fixed_ring();
        assert_eq!(ring.entry_index(0), 0);
        assert_eq!(ring.entry_index(100), 0);
        assert_eq!(ring.entry_index(101), 1);
        assert_eq!(ring.entry_index(200), 1);
        assert_eq!(ring.entry_index(250), 2);
    }

    #[test]
    fn test_wraps_past_last_entry() {
        let ring = fixed_ring();
        assert_eq!(ring.entry_index(301), 0);
        assert_eq!(ring.entry_index(u32::MAX), 0);
    }

    #[test]
    fn test_virtual_nodes_chain_previous_hash() {
        let ring = ConsistentHashRing::with_hasher(["a"], 3, Arc::new(FixedHash)).unwrap();
        let hashes: Vec<u32> = ring.entries().iter().map(|e| e.hash).collect();
        assert_eq!(hashes, vec![100, 1100, 2100]);
    }

    #[test]
    fn test_ties_keep_registration_order() {
        struct ConstHash;
        impl HashGenerator for ConstHash {
            fn hash(&self, _data: &[u8]) -> u32 {
                7
            }
        }
        let ring = ConsistentHashRing::with_hasher(["first", "second"], 2, Arc::new(ConstHash)).unwrap();
        assert_eq!(ring.lookup("anything"), "first");
    }

    #[test]
    fn test_lookup_uses_key_hash() {
        let ring = fixed_ring();
        // "a" hashes to 100 which is exactly partition a's point
        assert_eq!(ring.lookup("a"), "a");
        assert_eq!(ring.lookup("b"), "b");
        assert_eq!(ring.lookup("c"), "c");
    }

    #[test]
    fn test_most_significant_byte_orders_points() {
        // 0x01FF is FF 01 00 00 on the wire and 0x0200 is 00 02 00 00
        struct SplitBytes;
        impl HashGenerator for SplitBytes {
            fn hash(&self, data: &[u8]) -> u32 {
                match data {
                    b"lo" => 0x0000_01FF,
                    b"hi" => 0x0000_0200,
                    _ => 0x0000_0200,
                }
            }
        }
        let ring = ConsistentHashRing::with_hasher(["hi", "lo"], 1, Arc::new(SplitBytes)).unwrap();
        assert_eq!(
            ring.serialized_entries(),
            vec![("lo", 0x0000_01FF), ("hi", 0x0000_0200)]
        );
        assert_eq!(ring.entry_index(0x0000_0100), 0);
        assert_eq!(ring.entry_index(0x0000_01FF), 0);
        assert_eq!(ring.entry_index(0x0000_0200), 1);
        assert_eq!(ring.entry_index(0x0001_0000), 0);
    }

    #[test]
    fn test_serialized_entries_follow_ring_order() {
        let ring = fixed_ring();
        assert_eq!(
            ring.serialized_entries(),
            vec![("a", 100), ("b", 200), ("c", 300)]
        );
    }
}
