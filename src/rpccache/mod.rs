//! Domain Caches
//!
//! Typed read-through caches in front of the remote services. Each cache owns
//! one [`Cache`] over a private value enum, is built from its
//! [`LocalCacheConfig`] plus a shared [`CacheDeps`], and when enabled
//! subscribes to its invalidation topic and publishes on every `invalidate`.
//!
//! # Usage
//!
//! ```ignore
//! let deps = CacheDeps::new(pubsub).with_shutdown(shutdown.clone());
//! let users = UserLocalCache::new(user_rpc, &settings.user, &deps).await;
//! let info = users.get_user_info("u1").await?;
//!
//! // After a write to the user record
//! users.invalidate(&[keys::user_info("u1")]).await;
//! ```

mod auth;
mod conversation;
mod friend;
mod group;
pub mod keys;
mod online;
mod user;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub use auth::AuthLocalCache;
pub use conversation::ConversationLocalCache;
pub use friend::FriendLocalCache;
pub use group::GroupLocalCache;
pub use online::{format_user_online_status, parse_user_online_status, OnlineCache, OnlineMode};
pub use user::UserLocalCache;

use crate::adapters::LocalCacheMetrics;
use crate::config::LocalCacheConfig;
use crate::domain::ports::PubSub;
use crate::error::Error;
use crate::invalidation::{local_deletions, InvalidationPublisher};
use crate::localcache::{Cache, EmptyTarget, Target};

/// Shared collaborators of every domain cache
#[derive(Clone)]
pub struct CacheDeps {
    pub pubsub: Arc<dyn PubSub>,
    /// Cancelled to stop every subscriber task
    pub shutdown: CancellationToken,
    pub metrics: Option<Arc<LocalCacheMetrics>>,
}

impl std::fmt::Debug for CacheDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheDeps")
            .field("shutdown", &self.shutdown.is_cancelled())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl CacheDeps {
    pub fn new(pubsub: Arc<dyn PubSub>) -> Self {
        Self {
            pubsub,
            shutdown: CancellationToken::new(),
            metrics: None,
        }
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<LocalCacheMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn target(&self, cache: &str) -> Arc<dyn Target> {
        match &self.metrics {
            Some(metrics) => metrics.target(cache) as Arc<dyn Target>,
            None => Arc::new(EmptyTarget),
        }
    }
}

/// Build the facade for one domain cache.
///
/// A failed subscription is logged and the cache still starts: remote
/// deletions are then bounded by the success TTL.
async fn build_cache<V>(name: &str, config: &LocalCacheConfig, deps: &CacheDeps) -> Arc<Cache<V>>
where
    V: Clone + Send + Sync + 'static,
{
    info!(
        cache = name,
        enabled = config.enable(),
        topic = %config.topic,
        slot_num = config.slot_num,
        slot_size = config.slot_size,
        success_expire = config.success_expire,
        failed_expire = config.failed_expire,
        "Building local cache"
    );

    let mut options = config.cache_options().with_target(deps.target(name));
    if config.enable() {
        options = options.with_delete_key_before(Arc::new(InvalidationPublisher::new(
            Arc::clone(&deps.pubsub),
            config.topic.clone(),
        )));
        match deps.pubsub.subscribe(&config.topic).await {
            Ok(subscription) => {
                options = options.with_delete_local(local_deletions(
                    subscription,
                    config.topic.clone(),
                    deps.shutdown.child_token(),
                ));
            }
            Err(e) => error!(
                cache = name,
                topic = %config.topic,
                error = %e,
                "Failed to subscribe to invalidation topic"
            ),
        }
    }
    Cache::new(options)
}

fn unexpected_value(key: &str) -> Error {
    Error::Internal(format!("Unexpected cached value type for key {}", key))
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use futures::future::ready;

    #[tokio::test]
    async fn test_disabled_config_builds_pass_through() {
        let (pubsub, deps) = deps();
        let cache: Arc<Cache<u32>> = build_cache("user", &config(""), &deps).await;

        assert!(!cache.is_local_enabled());
        assert_eq!(pubsub.subscriber_count(""), 0);
    }

    #[tokio::test]
    async fn test_enabled_config_subscribes() {
        let (pubsub, deps) = deps();
        let cache: Arc<Cache<u32>> = build_cache("user", &config("T"), &deps).await;

        assert!(cache.is_local_enabled());
        assert_eq!(pubsub.subscriber_count("T"), 1);
        cache.get("k", || ready(Ok(1))).await.unwrap();
        assert!(cache.contains("k"));
    }

    #[tokio::test]
    async fn test_metrics_target_is_labelled() {
        let (_, deps) = deps();
        let metrics = Arc::new(LocalCacheMetrics::new().unwrap());
        let deps = deps.with_metrics(metrics.clone());
        let cache: Arc<Cache<u32>> = build_cache("group", &config("G"), &deps).await;

        cache.get("k", || ready(Ok(1))).await.unwrap();
        cache.get("k", || ready(Ok(1))).await.unwrap();

        let text = metrics.encode_text().unwrap();
        assert!(text.contains(r#"imcache_local_get_total{cache="group",result="hit"} 1"#));
        assert!(text.contains(r#"imcache_local_get_total{cache="group",result="success"} 1"#));
    }
}
