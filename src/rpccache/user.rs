//! User profile cache

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::{build_cache, keys, unexpected_value, CacheDeps};
use crate::config::LocalCacheConfig;
use crate::domain::model::UserInfo;
use crate::domain::ports::UserRpc;
use crate::error::Result;
use crate::localcache::Cache;

#[derive(Debug, Clone)]
enum UserValue {
    Info(UserInfo),
    GlobalRecvMsgOpt(i32),
}

/// Read-through cache over [`UserRpc`]
pub struct UserLocalCache {
    client: Arc<dyn UserRpc>,
    local: Arc<Cache<UserValue>>,
}

impl UserLocalCache {
    pub async fn new(client: Arc<dyn UserRpc>, config: &LocalCacheConfig, deps: &CacheDeps) -> Self {
        Self {
            client,
            local: build_cache("user", config, deps).await,
        }
    }

    pub async fn get_user_info(&self, user_id: &str) -> Result<UserInfo> {
        let key = keys::user_info(user_id);
        let value = self
            .local
            .get(&key, || async {
                debug!(user_id = %user_id, "UserLocalCache get_user_info rpc");
                self.client.get_user_info(user_id).await.map(UserValue::Info)
            })
            .await;
        debug!(user_id = %user_id, ok = value.is_ok(), "UserLocalCache get_user_info");
        match value? {
            UserValue::Info(info) => Ok(info),
            _ => Err(unexpected_value(&key)),
        }
    }

    pub async fn get_user_global_msg_recv_opt(&self, user_id: &str) -> Result<i32> {
        let key = keys::user_global_recv_msg_opt(user_id);
        let value = self
            .local
            .get(&key, || async {
                debug!(user_id = %user_id, "UserLocalCache get_user_global_msg_recv_opt rpc");
                self.client
                    .get_user_global_msg_recv_opt(user_id)
                    .await
                    .map(UserValue::GlobalRecvMsgOpt)
            })
            .await?;
        match value {
            UserValue::GlobalRecvMsgOpt(opt) => Ok(opt),
            _ => Err(unexpected_value(&key)),
        }
    }

    /// Profiles of `user_ids`, in order. Unknown users are skipped.
    pub async fn get_users_info(&self, user_ids: &[String]) -> Result<Vec<UserInfo>> {
        let mut infos = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            match self.get_user_info(user_id).await {
                Ok(info) => infos.push(info),
                Err(e) if e.is_record_not_found() => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(infos)
    }

    /// Profiles of `user_ids` keyed by user id. Unknown users are skipped.
    pub async fn get_users_info_map(&self, user_ids: &[String]) -> Result<HashMap<String, UserInfo>> {
        Ok(self
            .get_users_info(user_ids)
            .await?
            .into_iter()
            .map(|info| (info.user_id.clone(), info))
            .collect())
    }

    /// Publish and locally delete `keys`
    pub async fn invalidate(&self, keys: &[String]) {
        self.local.del(keys).await;
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{config, deps, Calls};
    use super::*;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use async_trait::async_trait;

    #[derive(Default)]
    struct MockUserRpc {
        info_calls: Calls,
        opt_calls: Calls,
    }

    #[async_trait]
    impl UserRpc for MockUserRpc {
        async fn get_user_info(&self, user_id: &str) -> Result<UserInfo> {
            self.info_calls.hit();
            if user_id.starts_with("ghost") {
                return Err(Error::RecordNotFound(user_id.to_string()));
            }
            if user_id == "broken" {
                return Err(Error::rpc("GetUserInfo", "unavailable"));
            }
            Ok(UserInfo {
                user_id: user_id.to_string(),
                nickname: format!("nick-{}", user_id),
                ..Default::default()
            })
        }

        async fn get_user_global_msg_recv_opt(&self, _user_id: &str) -> Result<i32> {
            self.opt_calls.hit();
            Ok(2)
        }

        async fn get_user_online_platform(&self, _user_id: &str) -> Result<Vec<i32>> {
            Ok(vec![])
        }

        async fn get_users_online_platforms(
            &self,
            _user_ids: &[String],
        ) -> Result<HashMap<String, Vec<i32>>> {
            Ok(HashMap::new())
        }

        async fn get_all_user_ids(&self, _page: u32, _page_size: u32) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    async fn cache() -> (Arc<MockUserRpc>, UserLocalCache) {
        let rpc = Arc::new(MockUserRpc::default());
        let (_, deps) = deps();
        let cache = UserLocalCache::new(rpc.clone(), &config("DELETE_CACHE_USER"), &deps).await;
        (rpc, cache)
    }

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_user_info_is_cached() {
        let (rpc, cache) = cache().await;

        let first = cache.get_user_info("u1").await.unwrap();
        let second = cache.get_user_info("u1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.nickname, "nick-u1");
        assert_eq!(rpc.info_calls.get(), 1);
    }

    #[tokio::test]
    async fn test_keys_do_not_collide_across_methods() {
        let (rpc, cache) = cache().await;

        cache.get_user_info("u1").await.unwrap();
        assert_eq!(cache.get_user_global_msg_recv_opt("u1").await.unwrap(), 2);
        assert_eq!(rpc.opt_calls.get(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let (rpc, cache) = cache().await;

        cache.get_user_info("u1").await.unwrap();
        cache.invalidate(&[keys::user_info("u1")]).await;
        cache.get_user_info("u1").await.unwrap();

        assert_eq!(rpc.info_calls.get(), 2);
    }

    #[tokio::test]
    async fn test_batch_skips_not_found() {
        let (_, cache) = cache().await;

        let infos = cache
            .get_users_info(&ids(&["u1", "ghost1", "u2"]))
            .await
            .unwrap();
        assert_eq!(
            infos.iter().map(|i| i.user_id.as_str()).collect::<Vec<_>>(),
            ["u1", "u2"]
        );

        let map = cache.get_users_info_map(&ids(&["ghost2", "u3"])).await.unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("u3"));
    }

    #[tokio::test]
    async fn test_batch_propagates_other_errors() {
        let (_, cache) = cache().await;
        assert_matches!(
            cache.get_users_info(&ids(&["u1", "broken"])).await,
            Err(Error::Rpc { .. })
        );
    }

    #[tokio::test]
    async fn test_failure_is_negatively_cached() {
        let (rpc, cache) = cache().await;

        assert!(cache.get_user_info("broken").await.is_err());
        assert!(cache.get_user_info("broken").await.is_err());
        assert_eq!(rpc.info_calls.get(), 1);
    }
}
