//! Group cache

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use super::{build_cache, keys, unexpected_value, CacheDeps};
use crate::config::LocalCacheConfig;
use crate::domain::model::{GroupInfo, GroupMember, IdSet};
use crate::domain::ports::GroupRpc;
use crate::error::{Error, Result};
use crate::localcache::Cache;

#[derive(Debug, Clone)]
enum GroupValue {
    Info(Box<GroupInfo>),
    Member(Box<GroupMember>),
    MemberIds(Arc<IdSet>),
}

/// Read-through cache over [`GroupRpc`]
pub struct GroupLocalCache {
    client: Arc<dyn GroupRpc>,
    local: Arc<Cache<GroupValue>>,
}

impl GroupLocalCache {
    pub async fn new(client: Arc<dyn GroupRpc>, config: &LocalCacheConfig, deps: &CacheDeps) -> Self {
        Self {
            client,
            local: build_cache("group", config, deps).await,
        }
    }

    pub async fn get_group_info(&self, group_id: &str) -> Result<GroupInfo> {
        let key = keys::group_info(group_id);
        let value = self
            .local
            .get(&key, || async {
                debug!(group_id = %group_id, "GroupLocalCache get_group_info rpc");
                self.client
                    .get_group_info(group_id)
                    .await
                    .map(|info| GroupValue::Info(Box::new(info)))
            })
            .await?;
        match value {
            GroupValue::Info(info) => Ok(*info),
            _ => Err(unexpected_value(&key)),
        }
    }

    pub async fn get_group_member(&self, group_id: &str, user_id: &str) -> Result<GroupMember> {
        let key = keys::group_member_info(group_id, user_id);
        let value = self
            .local
            .get(&key, || async {
                debug!(group_id = %group_id, user_id = %user_id, "GroupLocalCache get_group_member rpc");
                self.client
                    .get_group_member(group_id, user_id)
                    .await
                    .map(|member| GroupValue::Member(Box::new(member)))
            })
            .await?;
        match value {
            GroupValue::Member(member) => Ok(*member),
            _ => Err(unexpected_value(&key)),
        }
    }

    async fn member_ids(&self, group_id: &str) -> Result<Arc<IdSet>> {
        let key = keys::group_member_ids(group_id);
        let value = self
            .local
            .get(&key, || async {
                debug!(group_id = %group_id, "GroupLocalCache get_group_member_ids rpc");
                self.client
                    .get_group_member_ids(group_id)
                    .await
                    .map(|ids| GroupValue::MemberIds(Arc::new(IdSet::new(ids))))
            })
            .await?;
        match value {
            GroupValue::MemberIds(ids) => Ok(ids),
            _ => Err(unexpected_value(&key)),
        }
    }

    pub async fn get_group_member_ids(&self, group_id: &str) -> Result<Vec<String>> {
        Ok(self.member_ids(group_id).await?.ids().to_vec())
    }

    pub async fn get_group_member_id_set(&self, group_id: &str) -> Result<HashSet<String>> {
        Ok(self.member_ids(group_id).await?.set().clone())
    }

    /// Whether `user_id` is a member of `group_id`
    pub async fn is_group_member(&self, group_id: &str, user_id: &str) -> Result<bool> {
        Ok(self.member_ids(group_id).await?.contains(user_id))
    }

    /// Infos of `group_ids`, in order. Unknown groups are skipped.
    pub async fn get_group_infos(&self, group_ids: &[String]) -> Result<Vec<GroupInfo>> {
        let mut infos = Vec::with_capacity(group_ids.len());
        for group_id in group_ids {
            if let Some(info) = skip_not_found(self.get_group_info(group_id).await)? {
                infos.push(info);
            }
        }
        Ok(infos)
    }

    /// Members of `group_id` among `user_ids`, in order. Non-members are
    /// skipped.
    pub async fn get_group_members(&self, group_id: &str, user_ids: &[String]) -> Result<Vec<GroupMember>> {
        let mut members = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            if let Some(member) = skip_not_found(self.get_group_member(group_id, user_id).await)? {
                members.push(member);
            }
        }
        Ok(members)
    }

    pub async fn get_group_member_info_map(
        &self,
        group_id: &str,
        user_ids: &[String],
    ) -> Result<HashMap<String, GroupMember>> {
        Ok(self
            .get_group_members(group_id, user_ids)
            .await?
            .into_iter()
            .map(|member| (member.user_id.clone(), member))
            .collect())
    }

    pub async fn invalidate(&self, keys: &[String]) {
        self.local.del(keys).await;
    }
}

fn skip_not_found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::RecordNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{config, deps, Calls};
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;

    #[derive(Default)]
    struct MockGroupRpc {
        info_calls: Calls,
        member_ids_calls: Calls,
    }

    #[async_trait]
    impl GroupRpc for MockGroupRpc {
        async fn get_group_info(&self, group_id: &str) -> Result<GroupInfo> {
            self.info_calls.hit();
            if group_id == "gone" {
                return Err(Error::RecordNotFound(group_id.to_string()));
            }
            Ok(GroupInfo {
                group_id: group_id.to_string(),
                member_count: 3,
                ..Default::default()
            })
        }

        async fn get_group_member(&self, group_id: &str, user_id: &str) -> Result<GroupMember> {
            if user_id == "stranger" {
                return Err(Error::RecordNotFound(user_id.to_string()));
            }
            if user_id == "broken" {
                return Err(Error::rpc("GetGroupMember", "unavailable"));
            }
            Ok(GroupMember {
                group_id: group_id.to_string(),
                user_id: user_id.to_string(),
                ..Default::default()
            })
        }

        async fn get_group_member_ids(&self, _group_id: &str) -> Result<Vec<String>> {
            self.member_ids_calls.hit();
            Ok(vec!["u1".into(), "u2".into(), "u3".into()])
        }
    }

    async fn cache() -> (Arc<MockGroupRpc>, GroupLocalCache) {
        let rpc = Arc::new(MockGroupRpc::default());
        let (_, deps) = deps();
        let cache = GroupLocalCache::new(rpc.clone(), &config("DELETE_CACHE_GROUP"), &deps).await;
        (rpc, cache)
    }

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_member_ids_share_one_entry() {
        let (rpc, cache) = cache().await;

        assert_eq!(cache.get_group_member_ids("g1").await.unwrap(), ["u1", "u2", "u3"]);
        assert!(cache.get_group_member_id_set("g1").await.unwrap().contains("u2"));
        assert!(cache.is_group_member("g1", "u3").await.unwrap());
        assert!(!cache.is_group_member("g1", "u9").await.unwrap());
        assert_eq!(rpc.member_ids_calls.get(), 1);
    }

    #[tokio::test]
    async fn test_group_infos_skip_not_found() {
        let (rpc, cache) = cache().await;

        let infos = cache.get_group_infos(&ids(&["g1", "gone", "g2"])).await.unwrap();
        assert_eq!(infos.len(), 2);
        cache.get_group_info("g1").await.unwrap();
        assert_eq!(rpc.info_calls.get(), 3);
    }

    #[tokio::test]
    async fn test_group_member_map() {
        let (_, cache) = cache().await;

        let map = cache
            .get_group_member_info_map("g1", &ids(&["u1", "stranger", "u2"]))
            .await
            .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["u1"].group_id, "g1");

        assert_matches!(
            cache.get_group_members("g1", &ids(&["broken"])).await,
            Err(Error::Rpc { .. })
        );
    }

    #[tokio::test]
    async fn test_invalidate_member_ids() {
        let (rpc, cache) = cache().await;
        cache.get_group_member_ids("g1").await.unwrap();
        cache.invalidate(&[keys::group_member_ids("g1")]).await;
        cache.get_group_member_ids("g1").await.unwrap();
        assert_eq!(rpc.member_ids_calls.get(), 2);
    }
}
