//! Sharded LRU Engine
//!
//! Fixed set of independent LRU shards selected by FNV-1a hash of the key.
//!
//! # Design
//!
//! - Each shard has its own structural lock, held only to look up or insert
//!   an entry and never across an `.await`
//! - Each entry has its own async lock, held across the fetch: concurrent
//!   gets for one key wait on it and then read the stored result
//! - Gets for different keys never wait on each other, even in one shard
//! - Successes expire after `success_ttl`, failures after `failed_ttl`

use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::sync::Mutex as EntryLock;
use tokio::time::Instant;

use super::entry::CacheEntry;
use super::hash::ShardHash;
use super::target::Target;
use crate::error::Result;

/// Called for every removed entry, with its last successful value if any.
///
/// Runs after the shard lock is released, so it may call back into the LRU.
pub type EvictCallback<K, V> = Arc<dyn Fn(&K, Option<&V>) + Send + Sync>;

type EntryRef<V> = Arc<EntryLock<CacheEntry<V>>>;

/// Sharded LRU configuration
#[derive(Debug, Clone)]
pub struct LruConfig {
    /// Number of shards
    pub shard_count: usize,
    /// Maximum entries per shard
    pub shard_capacity: usize,
    /// Lifetime of a successful fetch
    pub success_ttl: Duration,
    /// Lifetime of a failed fetch
    pub failed_ttl: Duration,
}

impl Default for LruConfig {
    fn default() -> Self {
        Self {
            shard_count: 500,
            shard_capacity: 20_000,
            success_ttl: Duration::from_secs(60),
            failed_ttl: Duration::from_secs(5),
        }
    }
}

/// Single LRU shard with fetch coalescing
pub struct Shard<K, V> {
    core: Mutex<LruCache<K, EntryRef<V>>>,
    success_ttl: Duration,
    failed_ttl: Duration,
    target: Arc<dyn Target>,
    on_evict: Option<EvictCallback<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> Shard<K, V> {
    /// Create a shard holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0
    pub fn new(
        capacity: usize,
        success_ttl: Duration,
        failed_ttl: Duration,
        target: Arc<dyn Target>,
        on_evict: Option<EvictCallback<K, V>>,
    ) -> Self {
        let capacity = match NonZeroUsize::new(capacity) {
            Some(capacity) => capacity,
            None => panic!("shard capacity must be greater than 0"),
        };
        Self {
            core: Mutex::new(LruCache::new(capacity)),
            success_ttl,
            failed_ttl,
            target,
            on_evict,
        }
    }

    /// Get the cached result for `key`, running `fetch` if absent or stale.
    pub async fn get<F, Fut>(&self, key: &K, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let entry = self.entry_for(key);
        let mut entry = entry.lock().await;

        if let Some(cached) = entry.fresh(Instant::now()) {
            self.target.incr_get_hit();
            return cached;
        }

        let result = fetch().await;
        let ttl = if result.is_ok() {
            self.target.incr_get_success();
            self.success_ttl
        } else {
            self.target.incr_get_failed();
            self.failed_ttl
        };
        entry.resolve(result.clone(), ttl);
        result
    }

    /// Look up or insert the entry for `key` under the structural lock
    fn entry_for(&self, key: &K) -> EntryRef<V> {
        let (entry, evicted) = {
            let mut core = self.core.lock();
            if let Some(entry) = core.get(key) {
                return Arc::clone(entry);
            }
            let entry = Arc::new(EntryLock::new(CacheEntry::pending()));
            let evicted = core.push(key.clone(), Arc::clone(&entry));
            (entry, evicted)
        };

        if let Some((evicted_key, evicted_entry)) = evicted {
            self.notify_evicted(&evicted_key, &evicted_entry);
        }
        entry
    }

    /// Store a successful value for `key`
    pub fn set(&self, key: K, value: V) {
        let entry = Arc::new(EntryLock::new(CacheEntry::resolved(
            Ok(value),
            self.success_ttl,
        )));
        let displaced = self.core.lock().push(key.clone(), entry);
        if let Some((displaced_key, displaced_entry)) = displaced {
            if displaced_key != key {
                self.notify_evicted(&displaced_key, &displaced_entry);
            }
        }
    }

    /// Overwrite `key` only if it is already cached. Returns whether it was.
    pub fn set_has(&self, key: &K, value: V) -> bool {
        let mut core = self.core.lock();
        if !core.contains(key) {
            return false;
        }
        let entry = Arc::new(EntryLock::new(CacheEntry::resolved(
            Ok(value),
            self.success_ttl,
        )));
        core.put(key.clone(), entry);
        true
    }

    /// Remove `key`. Returns whether it was present.
    pub fn del(&self, key: &K) -> bool {
        let removed = self.core.lock().pop(key);
        match removed {
            Some(entry) => {
                self.target.incr_del_hit();
                self.notify_evicted(key, &entry);
                true
            }
            None => {
                self.target.incr_del_not_found();
                false
            }
        }
    }

    /// Check presence without touching recency
    pub fn contains(&self, key: &K) -> bool {
        self.core.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.core.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn notify_evicted(&self, key: &K, entry: &EntryRef<V>) {
        let Some(on_evict) = &self.on_evict else {
            return;
        };
        // An entry still being fetched has no value to report
        match entry.try_lock() {
            Ok(entry) => on_evict(key, entry.value()),
            Err(_) => on_evict(key, None),
        }
    }
}

/// Fixed set of shards, selected by key hash
pub struct ShardedLru<K, V> {
    shards: Box<[Shard<K, V>]>,
}

impl<K, V> ShardedLru<K, V>
where
    K: ShardHash + Hash + Eq + Clone,
    V: Clone,
{
    /// Create a sharded LRU.
    ///
    /// # Panics
    ///
    /// Panics if the shard count or shard capacity is 0
    pub fn new(config: &LruConfig, target: Arc<dyn Target>) -> Self {
        Self::with_evict_callback(config, target, None)
    }

    /// Create a sharded LRU that reports removed values to `on_evict`
    pub fn with_evict_callback(
        config: &LruConfig,
        target: Arc<dyn Target>,
        on_evict: Option<EvictCallback<K, V>>,
    ) -> Self {
        assert!(config.shard_count > 0, "shard count must be greater than 0");
        let shards: Vec<Shard<K, V>> = (0..config.shard_count)
            .map(|_| {
                Shard::new(
                    config.shard_capacity,
                    config.success_ttl,
                    config.failed_ttl,
                    Arc::clone(&target),
                    on_evict.clone(),
                )
            })
            .collect();
        Self {
            shards: shards.into_boxed_slice(),
        }
    }

    #[inline]
    fn shard(&self, key: &K) -> &Shard<K, V> {
        &self.shards[key.shard_index(self.shards.len())]
    }

    /// Get the cached result for `key`, running `fetch` on miss or expiry
    pub async fn get<F, Fut>(&self, key: &K, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        self.shard(key).get(key, fetch).await
    }

    pub fn set(&self, key: K, value: V) {
        self.shard(&key).set(key, value)
    }

    pub fn set_has(&self, key: &K, value: V) -> bool {
        self.shard(key).set_has(key, value)
    }

    pub fn del(&self, key: &K) -> bool {
        self.shard(key).del(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.shard(key).contains(key)
    }

    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Total entries across all shards
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.is_empty())
    }

    /// Per-shard entry counts
    pub fn shard_lens(&self) -> Vec<usize> {
        self.shards.iter().map(|s| s.len()).collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
