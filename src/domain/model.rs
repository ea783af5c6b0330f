//! Domain Values
//!
//! Entities returned by the remote services and held in the domain caches.
//! Only the fields the caches and their callers read are modelled.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Public profile of a user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub nickname: String,
    #[serde(rename = "faceURL")]
    pub face_url: String,
    pub ex: String,
    pub app_manger_level: i32,
    pub global_recv_msg_opt: i32,
    pub create_time: i64,
}

/// One user's view of a conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(rename = "ownerUserID")]
    pub owner_user_id: String,
    #[serde(rename = "conversationID")]
    pub conversation_id: String,
    pub conversation_type: i32,
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "groupID")]
    pub group_id: String,
    pub recv_msg_opt: i32,
    pub is_pinned: bool,
    pub is_private_chat: bool,
    pub ex: String,
}

/// Group profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    #[serde(rename = "groupID")]
    pub group_id: String,
    pub group_name: String,
    #[serde(rename = "ownerUserID")]
    pub owner_user_id: String,
    pub member_count: u32,
    pub status: i32,
    pub ex: String,
}

/// A user's membership in a group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    #[serde(rename = "groupID")]
    pub group_id: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    pub nickname: String,
    pub role_level: i32,
    pub join_time: i64,
    pub ex: String,
}

/// State of an issued auth token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Normal,
    Invalid,
    Kicked,
    Expired,
}

impl TokenStatus {
    pub fn is_normal(self) -> bool {
        self == TokenStatus::Normal
    }
}

/// Ordered id list with a set view for membership checks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct IdSet {
    ids: Vec<String>,
    set: HashSet<String>,
}

impl IdSet {
    pub fn new(ids: Vec<String>) -> Self {
        let set = ids.iter().cloned().collect();
        Self { ids, set }
    }

    /// Ids in the order the remote service returned them
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn set(&self) -> &HashSet<String> {
        &self.set
    }

    pub fn contains(&self, id: &str) -> bool {
        self.set.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl From<Vec<String>> for IdSet {
    fn from(ids: Vec<String>) -> Self {
        Self::new(ids)
    }
}

impl From<IdSet> for Vec<String> {
    fn from(set: IdSet) -> Self {
        set.ids
    }
}
