//! Conversation cache
//!
//! Caches the per-owner conversation id list, single conversations, and the
//! set of users that muted a conversation. Batch reads fan out with bounded
//! concurrency.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use super::{build_cache, keys, unexpected_value, CacheDeps};
use crate::config::LocalCacheConfig;
use crate::domain::model::{Conversation, IdSet};
use crate::domain::ports::ConversationRpc;
use crate::error::Result;
use crate::localcache::Cache;

/// Maximum concurrent lookups in [`ConversationLocalCache::get_conversations`]
pub const BATCH_CONCURRENCY: usize = 20;

#[derive(Debug, Clone)]
enum ConversationValue {
    Ids(Arc<Vec<String>>),
    Conversation(Box<Conversation>),
    NotReceiveUserIds(Arc<IdSet>),
}

/// Read-through cache over [`ConversationRpc`]
pub struct ConversationLocalCache {
    client: Arc<dyn ConversationRpc>,
    local: Arc<Cache<ConversationValue>>,
}

impl ConversationLocalCache {
    pub async fn new(
        client: Arc<dyn ConversationRpc>,
        config: &LocalCacheConfig,
        deps: &CacheDeps,
    ) -> Self {
        Self {
            client,
            local: build_cache("conversation", config, deps).await,
        }
    }

    pub async fn get_conversation_ids(&self, owner_user_id: &str) -> Result<Vec<String>> {
        let key = keys::conversation_ids(owner_user_id);
        let value = self
            .local
            .get(&key, || async {
                debug!(owner_user_id = %owner_user_id, "ConversationLocalCache get_conversation_ids rpc");
                self.client
                    .get_conversation_ids(owner_user_id)
                    .await
                    .map(|ids| ConversationValue::Ids(Arc::new(ids)))
            })
            .await?;
        match value {
            ConversationValue::Ids(ids) => Ok(ids.as_ref().clone()),
            _ => Err(unexpected_value(&key)),
        }
    }

    pub async fn get_conversation(
        &self,
        owner_user_id: &str,
        conversation_id: &str,
    ) -> Result<Conversation> {
        let key = keys::conversation(owner_user_id, conversation_id);
        let value = self
            .local
            .get(&key, || async {
                debug!(
                    owner_user_id = %owner_user_id,
                    conversation_id = %conversation_id,
                    "ConversationLocalCache get_conversation rpc"
                );
                self.client
                    .get_conversation(owner_user_id, conversation_id)
                    .await
                    .map(|c| ConversationValue::Conversation(Box::new(c)))
            })
            .await?;
        match value {
            ConversationValue::Conversation(conversation) => Ok(*conversation),
            _ => Err(unexpected_value(&key)),
        }
    }

    /// Receive-message option of the owner for a conversation
    pub async fn get_single_conversation_recv_msg_opt(
        &self,
        owner_user_id: &str,
        conversation_id: &str,
    ) -> Result<i32> {
        Ok(self
            .get_conversation(owner_user_id, conversation_id)
            .await?
            .recv_msg_opt)
    }

    /// Conversations of `owner_user_id`, in request order.
    ///
    /// Runs up to [`BATCH_CONCURRENCY`] lookups at once. Unknown conversations
    /// are skipped; any other error fails the batch.
    pub async fn get_conversations(
        &self,
        owner_user_id: &str,
        conversation_ids: &[String],
    ) -> Result<Vec<Conversation>> {
        let found: Vec<Option<Conversation>> = stream::iter(conversation_ids)
            .map(|conversation_id| async move {
                match self.get_conversation(owner_user_id, conversation_id).await {
                    Ok(conversation) => Ok(Some(conversation)),
                    Err(e) if e.is_record_not_found() => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .buffered(BATCH_CONCURRENCY)
            .try_collect()
            .await?;
        Ok(found.into_iter().flatten().collect())
    }

    async fn not_receive_message_user_ids(&self, conversation_id: &str) -> Result<Arc<IdSet>> {
        let key = keys::conversation_not_receive_message_user_ids(conversation_id);
        let value = self
            .local
            .get(&key, || async {
                debug!(
                    conversation_id = %conversation_id,
                    "ConversationLocalCache get_conversation_not_receive_message_user_ids rpc"
                );
                self.client
                    .get_conversation_not_receive_message_user_ids(conversation_id)
                    .await
                    .map(|ids| ConversationValue::NotReceiveUserIds(Arc::new(IdSet::new(ids))))
            })
            .await?;
        match value {
            ConversationValue::NotReceiveUserIds(ids) => Ok(ids),
            _ => Err(unexpected_value(&key)),
        }
    }

    /// Users that muted `conversation_id`
    pub async fn get_conversation_not_receive_message_user_ids(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<String>> {
        Ok(self
            .not_receive_message_user_ids(conversation_id)
            .await?
            .ids()
            .to_vec())
    }

    /// Set form of [`Self::get_conversation_not_receive_message_user_ids`]
    pub async fn get_conversation_not_receive_message_user_id_set(
        &self,
        conversation_id: &str,
    ) -> Result<HashSet<String>> {
        Ok(self
            .not_receive_message_user_ids(conversation_id)
            .await?
            .set()
            .clone())
    }

    pub async fn invalidate(&self, keys: &[String]) {
        self.local.del(keys).await;
    }
}
