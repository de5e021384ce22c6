//! Hash functions for ring placement
//!
//! Ring placement must agree with every other client writing to the same
//! collections, so the default is MurmurHash3 x86 32-bit with seed 0. Its
//! 4-byte little-endian output is also what gets re-hashed to place the
//! following virtual nodes of a partition.

use xxhash_rust::xxh3::xxh3_64;

/// A 32-bit hash over raw bytes
pub trait HashGenerator: Send + Sync {
    /// Hash `data`
    fn hash(&self, data: &[u8]) -> u32;
}

/// MurmurHash3, x86 32-bit variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MurmurHash3 {
    seed: u32,
}

impl MurmurHash3 {
    /// Hash with an explicit seed
    pub fn with_seed(seed: u32) -> Self {
        Self { seed }
    }
}

impl HashGenerator for MurmurHash3 {
    fn hash(&self, data: &[u8]) -> u32 {
        murmur3_x86_32(data, self.seed)
    }
}

/// xxh3 truncated to its low 32 bits
///
/// Faster than murmur on long keys but places partitions differently, so
/// every client of a collection set must agree to use it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Xxh3Hash;

impl HashGenerator for Xxh3Hash {
    fn hash(&self, data: &[u8]) -> u32 {
        xxh3_64(data) as u32
    }
}

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

fn mix_block(mut k: u32) -> u32 {
    k = k.wrapping_mul(C1);
    k = k.rotate_left(15);
    k.wrapping_mul(C2)
}

fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^ (h >> 16)
}

/// MurmurHash3 x86 32-bit over `data`
pub fn murmur3_x86_32(data: &[u8], seed: u32) -> u32 {
    let mut h = seed;

    let blocks = data.chunks_exact(4);
    let tail = blocks.remainder();
    for block in blocks {
        let k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        h ^= mix_block(k);
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    if !tail.is_empty() {
        let k = tail
            .iter()
            .enumerate()
            .fold(0u32, |k, (i, b)| k | (u32::from(*b) << (8 * i)));
        h ^= mix_block(k);
    }

    h ^= data.len() as u32;
    fmix32(h)
}
