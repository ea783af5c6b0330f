//! Domain Layer
//!
//! - **Ports** (`ports.rs`) - Trait abstractions for the remote services and
//!   the pub/sub transport
//! - **Model** (`model.rs`) - Values held in the domain caches
//!
//! # Usage
//!
//! ```ignore
//! use imcache::domain::{UserRpc, UserInfo};
//!
//! async fn nickname<U: UserRpc>(users: &U, user_id: &str) -> Result<String> {
//!     let info: UserInfo = users.get_user_info(user_id).await?;
//!     Ok(info.nickname)
//! }
//! ```

pub mod model;
pub mod ports;

pub use model::{Conversation, GroupInfo, GroupMember, IdSet, TokenStatus, UserInfo};
pub use ports::{
    AuthRpc, ConversationRpc, FriendRpc, GroupRpc, Message, PubSub, Subscription, UserRpc,
};
