//! Auth token cache

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::{build_cache, keys, CacheDeps};
use crate::config::LocalCacheConfig;
use crate::domain::model::TokenStatus;
use crate::domain::ports::AuthRpc;
use crate::error::Result;
use crate::localcache::Cache;

type TokenMap = Arc<HashMap<String, TokenStatus>>;

/// Read-through cache of the tokens issued per user and platform
pub struct AuthLocalCache {
    client: Arc<dyn AuthRpc>,
    local: Arc<Cache<TokenMap>>,
}

impl AuthLocalCache {
    pub async fn new(client: Arc<dyn AuthRpc>, config: &LocalCacheConfig, deps: &CacheDeps) -> Self {
        Self {
            client,
            local: build_cache("auth", config, deps).await,
        }
    }

    /// Tokens issued to `user_id` on `platform_id`, with their status
    pub async fn get_existing_tokens(&self, user_id: &str, platform_id: i32) -> Result<TokenMap> {
        let key = keys::token_status(user_id, platform_id);
        self.local
            .get(&key, || async {
                debug!(user_id = %user_id, platform_id, "AuthLocalCache get_existing_tokens rpc");
                self.client
                    .get_existing_tokens(user_id, platform_id)
                    .await
                    .map(Arc::new)
            })
            .await
    }

    /// Whether `token` is known and in the normal state
    pub async fn is_token_valid(&self, user_id: &str, platform_id: i32, token: &str) -> Result<bool> {
        let tokens = self.get_existing_tokens(user_id, platform_id).await?;
        Ok(tokens.get(token).is_some_and(|status| status.is_normal()))
    }

    pub async fn invalidate(&self, keys: &[String]) {
        self.local.del(keys).await;
    }
}
