//! Domain Ports (Port/Adapter Pattern)
//!
//! Boundaries the caches depend on. The RPC ports are implemented by the
//! service's generated clients; the pub/sub port by a broker client or by
//! [`crate::adapters::InMemoryPubSub`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Domain Caches                          │
//! │   User │ Auth │ Conversation │ Friend │ Group │ Online      │
//! └─────────────────────────────────────────────────────────────┘
//!            │ fetch on miss                 │ invalidate
//!            ▼                               ▼
//! ┌──────────────────────────────┐ ┌────────────────────────────┐
//! │        Ports (Traits)         │ │       Ports (Traits)        │
//! │ UserRpc │ AuthRpc │ GroupRpc │ │           PubSub            │
//! │ ConversationRpc │ FriendRpc  │ │                             │
//! └──────────────────────────────┘ └────────────────────────────┘
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::model::{Conversation, GroupInfo, GroupMember, TokenStatus, UserInfo};
use crate::error::Result;

// =============================================================================
// Pub/Sub
// =============================================================================

/// A message received on a pub/sub channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub channel: String,
    pub payload: String,
}

/// Stream of messages for one channel. Ends when the transport closes.
pub type Subscription = BoxStream<'static, Message>;

/// Pub/sub transport carrying invalidation and presence messages.
#[async_trait]
pub trait PubSub: Send + Sync {
    /// Publish `payload` on `channel`. Delivery is best effort.
    async fn publish(&self, channel: &str, payload: String) -> Result<()>;

    /// Subscribe to `channel`. Messages published after this returns are
    /// delivered on the stream.
    async fn subscribe(&self, channel: &str) -> Result<Subscription>;
}

// =============================================================================
// Remote Services
// =============================================================================

/// User service
#[async_trait]
pub trait UserRpc: Send + Sync {
    async fn get_user_info(&self, user_id: &str) -> Result<UserInfo>;

    async fn get_user_global_msg_recv_opt(&self, user_id: &str) -> Result<i32>;

    /// Platform ids the user is currently connected on
    async fn get_user_online_platform(&self, user_id: &str) -> Result<Vec<i32>>;

    /// Platform ids for each of `user_ids`. Users missing from the map are
    /// offline.
    async fn get_users_online_platforms(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, Vec<i32>>>;

    /// One page of all user ids. Pages start at 1; a short page is the last.
    async fn get_all_user_ids(&self, page: u32, page_size: u32) -> Result<Vec<String>>;
}

/// Auth service
#[async_trait]
pub trait AuthRpc: Send + Sync {
    /// Tokens issued to the user on the platform, with their status
    async fn get_existing_tokens(
        &self,
        user_id: &str,
        platform_id: i32,
    ) -> Result<HashMap<String, TokenStatus>>;
}

/// Conversation service
#[async_trait]
pub trait ConversationRpc: Send + Sync {
    async fn get_conversation_ids(&self, owner_user_id: &str) -> Result<Vec<String>>;

    async fn get_conversation(
        &self,
        owner_user_id: &str,
        conversation_id: &str,
    ) -> Result<Conversation>;

    /// Users that muted the conversation
    async fn get_conversation_not_receive_message_user_ids(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<String>>;
}

/// Friend / relation service
#[async_trait]
pub trait FriendRpc: Send + Sync {
    /// Whether `possible_friend` is in `user_id`'s friend list
    async fn is_friend(&self, possible_friend: &str, user_id: &str) -> Result<bool>;

    /// Whether `possible_black` is in `user_id`'s black list
    async fn is_black(&self, possible_black: &str, user_id: &str) -> Result<bool>;
}

/// Group service
#[async_trait]
pub trait GroupRpc: Send + Sync {
    async fn get_group_info(&self, group_id: &str) -> Result<GroupInfo>;

    async fn get_group_member(&self, group_id: &str, user_id: &str) -> Result<GroupMember>;

    async fn get_group_member_ids(&self, group_id: &str) -> Result<Vec<String>>;
}
