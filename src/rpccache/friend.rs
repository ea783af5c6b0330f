//! Friend and black list cache
//!
//! Relation checks are linked to the owning users' list keys, so invalidating
//! `FRIEND_IDS:<user>` or `BLACK_IDS:<user>` also drops every cached check
//! derived from that list.

use std::sync::Arc;

use tracing::debug;

use super::{build_cache, keys, CacheDeps};
use crate::config::LocalCacheConfig;
use crate::domain::ports::FriendRpc;
use crate::error::Result;
use crate::localcache::Cache;

/// Read-through cache over [`FriendRpc`]
pub struct FriendLocalCache {
    client: Arc<dyn FriendRpc>,
    local: Arc<Cache<bool>>,
}

impl FriendLocalCache {
    pub async fn new(client: Arc<dyn FriendRpc>, config: &LocalCacheConfig, deps: &CacheDeps) -> Self {
        Self {
            client,
            local: build_cache("friend", config, deps).await,
        }
    }

    /// Whether `possible_friend` is a friend of `user_id`
    pub async fn is_friend(&self, possible_friend: &str, user_id: &str) -> Result<bool> {
        let parents = [keys::friend_ids(possible_friend), keys::friend_ids(user_id)];
        let result = self
            .local
            .get_link(&keys::is_friend(possible_friend, user_id), &parents, || async {
                debug!(possible_friend = %possible_friend, user_id = %user_id, "FriendLocalCache is_friend rpc");
                self.client.is_friend(possible_friend, user_id).await
            })
            .await;
        debug!(possible_friend = %possible_friend, user_id = %user_id, result = ?result, "FriendLocalCache is_friend");
        result
    }

    /// Whether `possible_black` is in `user_id`'s black list
    pub async fn is_black(&self, possible_black: &str, user_id: &str) -> Result<bool> {
        let parents = [keys::black_ids(user_id)];
        self.local
            .get_link(&keys::is_black(possible_black, user_id), &parents, || async {
                debug!(possible_black = %possible_black, user_id = %user_id, "FriendLocalCache is_black rpc");
                self.client.is_black(possible_black, user_id).await
            })
            .await
    }

    pub async fn invalidate(&self, keys: &[String]) {
        self.local.del(keys).await;
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{config, deps, Calls};
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    #[derive(Default)]
    struct MockFriendRpc {
        friends: Mutex<HashSet<(String, String)>>,
        friend_calls: Calls,
        black_calls: Calls,
    }

    impl MockFriendRpc {
        fn befriend(&self, a: &str, b: &str) {
            let mut friends = self.friends.lock();
            friends.insert((a.to_string(), b.to_string()));
            friends.insert((b.to_string(), a.to_string()));
        }
    }

    #[async_trait]
    impl FriendRpc for MockFriendRpc {
        async fn is_friend(&self, possible_friend: &str, user_id: &str) -> Result<bool> {
            self.friend_calls.hit();
            Ok(self
                .friends
                .lock()
                .contains(&(possible_friend.to_string(), user_id.to_string())))
        }

        async fn is_black(&self, _possible_black: &str, _user_id: &str) -> Result<bool> {
            self.black_calls.hit();
            Ok(false)
        }
    }

    async fn cache() -> (Arc<MockFriendRpc>, FriendLocalCache) {
        let rpc = Arc::new(MockFriendRpc::default());
        let (_, deps) = deps();
        let cache = FriendLocalCache::new(rpc.clone(), &config("DELETE_CACHE_FRIEND"), &deps).await;
        (rpc, cache)
    }

    #[tokio::test]
    async fn test_friend_list_change_cascades() {
        let (rpc, cache) = cache().await;

        assert!(!cache.is_friend("a", "b").await.unwrap());
        rpc.befriend("a", "b");
        // Still the cached answer
        assert!(!cache.is_friend("a", "b").await.unwrap());

        // Either user's friend list invalidates the check
        cache.invalidate(&[keys::friend_ids("b")]).await;
        assert!(cache.is_friend("a", "b").await.unwrap());
        assert_eq!(rpc.friend_calls.get(), 2);

        cache.invalidate(&[keys::friend_ids("a")]).await;
        assert!(cache.is_friend("a", "b").await.unwrap());
        assert_eq!(rpc.friend_calls.get(), 3);
    }

    #[tokio::test]
    async fn test_black_check_linked_to_owner_list() {
        let (rpc, cache) = cache().await;

        cache.is_black("x", "owner").await.unwrap();
        cache.is_black("x", "owner").await.unwrap();
        assert_eq!(rpc.black_calls.get(), 1);

        // Another user's list does not touch it
        cache.invalidate(&[keys::black_ids("x")]).await;
        cache.is_black("x", "owner").await.unwrap();
        assert_eq!(rpc.black_calls.get(), 1);

        cache.invalidate(&[keys::black_ids("owner")]).await;
        cache.is_black("x", "owner").await.unwrap();
        assert_eq!(rpc.black_calls.get(), 2);
    }
}
