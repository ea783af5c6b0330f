//! Shard selection hashing
//!
//! FNV-1a over the key bytes. The hash is pure, so a key maps to the same
//! shard for the lifetime of the process.

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a
#[inline]
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Keys that can be routed to a shard.
pub trait ShardHash {
    fn shard_hash(&self) -> u64;

    /// Shard index in `0..shard_count`
    #[inline]
    fn shard_index(&self, shard_count: usize) -> usize {
        (self.shard_hash() % shard_count as u64) as usize
    }
}

impl ShardHash for String {
    #[inline]
    fn shard_hash(&self) -> u64 {
        fnv1a(self.as_bytes())
    }
}

impl ShardHash for str {
    #[inline]
    fn shard_hash(&self) -> u64 {
        fnv1a(self.as_bytes())
    }
}

impl ShardHash for u64 {
    #[inline]
    fn shard_hash(&self) -> u64 {
        fnv1a(&self.to_le_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a(b"a"), 0xaf63dc4c8601ec8c);
        assert_eq!(fnv1a(b"foobar"), 0x85944171f73967e8);
    }

    #[test]
    fn test_shard_index_is_stable() {
        let key = "USER_INFO:u1".to_string();
        let first = key.shard_index(500);
        for _ in 0..10 {
            assert_eq!(key.shard_index(500), first);
        }
        assert_eq!(key.as_str().shard_index(500), first);
        assert!(first < 500);
    }

    #[test]
    fn test_shard_distribution() {
        let mut counts = [0usize; 16];
        for i in 0..1600 {
            counts[format!("key-{}", i).shard_index(16)] += 1;
        }
        assert!(counts.iter().all(|&c| c > 50), "uneven: {:?}", counts);
    }
}
