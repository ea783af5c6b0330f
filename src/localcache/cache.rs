//! Read-Through Cache Facade
//!
//! The cache type callers hold. Wraps the sharded LRU engine with:
//!
//! - a pass-through mode when local caching is disabled
//! - delete-before hooks, run with the key set on every [`Cache::del`]
//!   before the local eviction (typically: publish on an invalidation topic)
//! - a local-deletion source, handed a callback at construction that evicts
//!   keys without re-running the hooks (typically: a topic subscriber)
//! - linked keys: a key fetched through [`Cache::get_link`] is evicted
//!   whenever one of its parents is

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::link::Link;
use super::shard::{EvictCallback, LruConfig, ShardedLru};
use super::target::{EmptyTarget, Target};
use crate::error::Result;

/// Hook run with the full key set before keys are deleted locally
#[async_trait]
pub trait DeleteHook: Send + Sync {
    async fn before_delete(&self, keys: &[String]);
}

/// Evicts keys from one cache without running its delete hooks
pub type LocalDeleter = Arc<dyn Fn(Vec<String>) + Send + Sync>;

/// Receives a [`LocalDeleter`] once, at cache construction
pub type LocalDeletionSource = Box<dyn FnOnce(LocalDeleter) + Send>;

/// Cache construction options
pub struct CacheOptions {
    lru: LruConfig,
    target: Arc<dyn Target>,
    local_disabled: bool,
    delete_key_before: Vec<Arc<dyn DeleteHook>>,
    delete_local: Option<LocalDeletionSource>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            lru: LruConfig::default(),
            target: Arc::new(EmptyTarget),
            local_disabled: false,
            delete_key_before: Vec::new(),
            delete_local: None,
        }
    }
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of shards
    pub fn with_slot_num(mut self, slot_num: usize) -> Self {
        self.lru.shard_count = slot_num;
        self
    }

    /// Set the capacity of each shard
    pub fn with_slot_size(mut self, slot_size: usize) -> Self {
        self.lru.shard_capacity = slot_size;
        self
    }

    pub fn with_success_ttl(mut self, ttl: Duration) -> Self {
        self.lru.success_ttl = ttl;
        self
    }

    pub fn with_failed_ttl(mut self, ttl: Duration) -> Self {
        self.lru.failed_ttl = ttl;
        self
    }

    pub fn with_target(mut self, target: Arc<dyn Target>) -> Self {
        self.target = target;
        self
    }

    /// Disable local caching: every get calls its fetch
    pub fn with_local_disabled(mut self, disabled: bool) -> Self {
        self.local_disabled = disabled;
        self
    }

    /// Add a hook run before every delete
    pub fn with_delete_key_before(mut self, hook: Arc<dyn DeleteHook>) -> Self {
        self.delete_key_before.push(hook);
        self
    }

    /// Set the source of remote deletions
    pub fn with_delete_local(mut self, source: LocalDeletionSource) -> Self {
        self.delete_local = Some(source);
        self
    }

    pub fn lru_config(&self) -> &LruConfig {
        &self.lru
    }
}

/// Read-through local cache
pub struct Cache<V> {
    local: Option<ShardedLru<String, V>>,
    link: Link,
    delete_key_before: Vec<Arc<dyn DeleteHook>>,
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Build a cache. The local-deletion source, if any, is invoked before
    /// this returns.
    ///
    /// # Panics
    ///
    /// Panics if local caching is enabled with a zero slot count or size
    pub fn new(options: CacheOptions) -> Arc<Self> {
        let local_disabled = options.local_disabled;
        let lru = options.lru;
        let target = options.target;
        let cache = Arc::new_cyclic(|weak: &Weak<Self>| {
            let local = (!local_disabled).then(|| {
                let weak = weak.clone();
                let on_evict: EvictCallback<String, V> =
                    Arc::new(move |key: &String, _: Option<&V>| {
                        if let Some(cache) = weak.upgrade() {
                            cache.unlink_evicted(key);
                        }
                    });
                ShardedLru::with_evict_callback(&lru, target, Some(on_evict))
            });
            Self {
                local,
                link: Link::new(),
                delete_key_before: options.delete_key_before,
            }
        });

        if let (Some(source), true) = (options.delete_local, cache.local.is_some()) {
            let weak = Arc::downgrade(&cache);
            source(Arc::new(move |keys: Vec<String>| {
                if let Some(cache) = weak.upgrade() {
                    cache.del_local(&keys);
                }
            }));
        }
        cache
    }

    /// Whether entries are cached locally (false in pass-through mode)
    pub fn is_local_enabled(&self) -> bool {
        self.local.is_some()
    }

    /// Get the value for `key`, fetching on miss or expiry
    pub async fn get<F, Fut>(&self, key: &str, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        self.get_link(key, &[], fetch).await
    }

    /// Like [`Cache::get`], and records `key` as dependent on `parents`
    pub async fn get_link<F, Fut>(&self, key: &str, parents: &[String], fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let Some(local) = &self.local else {
            return fetch().await;
        };
        local
            .get(&key.to_string(), || {
                self.link.link(key, parents);
                fetch()
            })
            .await
    }

    /// Run the delete hooks, then evict `keys` and their dependents locally
    pub async fn del(&self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        for hook in &self.delete_key_before {
            hook.before_delete(keys).await;
        }
        self.del_local(keys);
    }

    /// Evict `keys` and their dependents locally, without running hooks
    pub fn del_local(&self, keys: &[String]) {
        let Some(local) = &self.local else {
            return;
        };
        for key in keys {
            let dependents = self.link.del(key);
            local.del(key);
            for dependent in &dependents {
                local.del(dependent);
            }
            debug!(key = %key, cascaded = dependents.len(), "Deleted local cache key");
        }
    }

    /// Drop the link entries of a key the engine removed, along with the
    /// cached entries derived from it.
    fn unlink_evicted(&self, key: &str) {
        let Some(local) = &self.local else {
            return;
        };
        for dependent in self.link.del(key) {
            local.del(&dependent);
        }
    }

    /// Number of parent keys with linked dependents
    pub fn link_len(&self) -> usize {
        self.link.len()
    }

    /// Check whether `key` is cached locally
    pub fn contains(&self, key: &str) -> bool {
        self.local
            .as_ref()
            .is_some_and(|local| local.contains(&key.to_string()))
    }

    /// Number of locally cached entries
    pub fn len(&self) -> usize {
        self.local.as_ref().map_or(0, |local| local.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::ready;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingHook {
        calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl DeleteHook for RecordingHook {
        async fn before_delete(&self, keys: &[String]) {
            self.calls.lock().push(keys.to_vec());
        }
    }

    fn small() -> CacheOptions {
        CacheOptions::new().with_slot_num(4).with_slot_size(64)
    }

    fn one_shard_of_two() -> CacheOptions {
        CacheOptions::new().with_slot_num(1).with_slot_size(2)
    }

    fn keys(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_get_reads_through_once() {
        let cache: Arc<Cache<String>> = Cache::new(small());
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get("USER_INFO:u1", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    ready(Ok("alice".to_string()))
                })
                .await;
            assert_eq!(value, Ok("alice".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains("USER_INFO:u1"));
    }

    #[tokio::test]
    async fn test_disabled_cache_is_pass_through() {
        let cache: Arc<Cache<u32>> = Cache::new(small().with_local_disabled(true));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            cache
                .get("k", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    ready(Ok(1))
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!cache.is_local_enabled());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_del_runs_hooks_then_evicts() {
        let hook = Arc::new(RecordingHook::default());
        let cache: Arc<Cache<u32>> = Cache::new(small().with_delete_key_before(hook.clone()));

        cache.get("a", || ready(Ok(1))).await.unwrap();
        cache.del(&keys(&["a", "b"])).await;

        assert_eq!(*hook.calls.lock(), vec![keys(&["a", "b"])]);
        assert!(!cache.contains("a"));
        assert_eq!(cache.get("a", || ready(Ok(2))).await, Ok(2));
    }

    #[tokio::test]
    async fn test_del_with_no_keys_skips_hooks() {
        let hook = Arc::new(RecordingHook::default());
        let cache: Arc<Cache<u32>> = Cache::new(small().with_delete_key_before(hook.clone()));
        cache.del(&[]).await;
        assert!(hook.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_hooks_run_when_local_disabled() {
        let hook = Arc::new(RecordingHook::default());
        let cache: Arc<Cache<u32>> = Cache::new(
            small()
                .with_local_disabled(true)
                .with_delete_key_before(hook.clone()),
        );
        cache.del(&keys(&["a"])).await;
        assert_eq!(hook.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_del_local_skips_hooks() {
        let hook = Arc::new(RecordingHook::default());
        let cache: Arc<Cache<u32>> = Cache::new(small().with_delete_key_before(hook.clone()));

        cache.get("a", || ready(Ok(1))).await.unwrap();
        cache.del_local(&keys(&["a"]));

        assert!(hook.calls.lock().is_empty());
        assert!(!cache.contains("a"));
    }

    #[tokio::test]
    async fn test_parent_delete_cascades_to_linked_key() {
        let cache: Arc<Cache<bool>> = Cache::new(small());
        let parents = keys(&["FRIEND_IDS:a", "FRIEND_IDS:b"]);
        let calls = AtomicUsize::new(0);
        let fetch = || {
            calls.fetch_add(1, Ordering::SeqCst);
            ready(Ok(true))
        };

        cache.get_link("IS_FRIEND:a:b", &parents, fetch).await.unwrap();
        cache.get_link("IS_FRIEND:a:b", &parents, fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The parent itself was never cached; the cascade still applies
        cache.del(&keys(&["FRIEND_IDS:b"])).await;
        assert!(!cache.contains("IS_FRIEND:a:b"));

        cache.get_link("IS_FRIEND:a:b", &parents, fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_capacity_eviction_unlinks_dependents() {
        let cache: Arc<Cache<bool>> = Cache::new(one_shard_of_two());

        for i in 0..1000 {
            let key = format!("IS_FRIEND:{}:hub", i);
            let parents = vec![format!("FRIEND_IDS:{}", i), "FRIEND_IDS:hub".to_string()];
            cache.get_link(&key, &parents, || ready(Ok(true))).await.unwrap();
        }

        assert_eq!(cache.len(), 2);
        // Two live dependents: their own friend lists plus the shared hub
        assert!(cache.link_len() <= 3, "link index holds {} parents", cache.link_len());

        cache.del(&keys(&["FRIEND_IDS:hub"])).await;
        assert!(cache.is_empty());
        assert_eq!(cache.link_len(), 0);
    }

    #[tokio::test]
    async fn test_evicted_parent_cascades_to_dependents() {
        let cache: Arc<Cache<u32>> = Cache::new(one_shard_of_two());

        cache.get("FRIEND_IDS:a", || ready(Ok(1))).await.unwrap();
        cache
            .get_link("IS_FRIEND:a:b", &keys(&["FRIEND_IDS:a"]), || ready(Ok(2)))
            .await
            .unwrap();
        // Pushes out "FRIEND_IDS:a", which takes its dependent along
        cache.get("other", || ready(Ok(3))).await.unwrap();

        assert!(!cache.contains("FRIEND_IDS:a"));
        assert!(!cache.contains("IS_FRIEND:a:b"));
        assert!(cache.contains("other"));
        assert_eq!(cache.link_len(), 0);
    }

    #[tokio::test]
    async fn test_local_deletion_source_receives_deleter() {
        let deleter: Arc<Mutex<Option<LocalDeleter>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&deleter);
        let hook = Arc::new(RecordingHook::default());
        let cache: Arc<Cache<u32>> = Cache::new(
            small()
                .with_delete_key_before(hook.clone())
                .with_delete_local(Box::new(move |d| *slot.lock() = Some(d))),
        );

        cache.get("a", || ready(Ok(1))).await.unwrap();
        let delete = deleter.lock().clone().expect("source not invoked");
        delete(keys(&["a"]));

        assert!(!cache.contains("a"));
        assert!(hook.calls.lock().is_empty());

        // Deleter outliving the cache is a no-op
        drop(cache);
        delete(keys(&["a"]));
    }

    #[tokio::test]
    async fn test_local_deletion_source_unused_when_disabled() {
        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invoked);
        let _cache: Arc<Cache<u32>> = Cache::new(
            small()
                .with_local_disabled(true)
                .with_delete_local(Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
        );
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_default_options() {
        let options = CacheOptions::default();
        let lru = options.lru_config();
        assert_eq!(lru.shard_count, 500);
        assert_eq!(lru.shard_capacity, 20_000);
        assert!(lru.failed_ttl <= lru.success_ttl);
    }
}
