//! Cache key builders and topic routing
//!
//! Keys are shared with the writers that publish invalidations, so their
//! shapes must not change.

use crate::config::LocalCacheSettings;
use crate::invalidation::TopicRoute;

pub const USER_INFO: &str = "USER_INFO:";
pub const USER_GLOBAL_RECV_MSG_OPT: &str = "USER_GLOBAL_RECV_MSG_OPT_KEY:";
pub const UID_PID_TOKEN_STATUS: &str = "UID_PID_TOKEN_STATUS:";
pub const CONVERSATION: &str = "CONVERSATION:";
pub const CONVERSATION_IDS: &str = "CONVERSATION_IDS:";
pub const CONVERSATION_NOT_RECEIVE_MESSAGE_USER_IDS: &str =
    "CONVERSATION_NOT_RECEIVE_MESSAGE_USER_IDS:";
pub const FRIEND_IDS: &str = "FRIEND_IDS:";
pub const BLACK_IDS: &str = "BLACK_IDS:";
pub const IS_FRIEND: &str = "IS_FRIEND:";
pub const IS_BLACK: &str = "IS_BLACK:";
pub const GROUP_INFO: &str = "GROUP_INFO:";
pub const GROUP_MEMBER_INFO: &str = "GROUP_MEMBER_INFO:";
pub const GROUP_MEMBER_IDS: &str = "GROUP_MEMBER_IDS:";

/// Presence-change channel
pub const ONLINE_CHANNEL: &str = "online_change";

pub fn user_info(user_id: &str) -> String {
    format!("{USER_INFO}{user_id}")
}

pub fn user_global_recv_msg_opt(user_id: &str) -> String {
    format!("{USER_GLOBAL_RECV_MSG_OPT}{user_id}")
}

pub fn token_status(user_id: &str, platform_id: i32) -> String {
    format!("{UID_PID_TOKEN_STATUS}{user_id}:{platform_id}")
}

pub fn conversation(owner_user_id: &str, conversation_id: &str) -> String {
    format!("{CONVERSATION}{owner_user_id}:{conversation_id}")
}

pub fn conversation_ids(owner_user_id: &str) -> String {
    format!("{CONVERSATION_IDS}{owner_user_id}")
}

pub fn conversation_not_receive_message_user_ids(conversation_id: &str) -> String {
    format!("{CONVERSATION_NOT_RECEIVE_MESSAGE_USER_IDS}{conversation_id}")
}

pub fn friend_ids(owner_user_id: &str) -> String {
    format!("{FRIEND_IDS}{owner_user_id}")
}

pub fn black_ids(owner_user_id: &str) -> String {
    format!("{BLACK_IDS}{owner_user_id}")
}

pub fn is_friend(possible_friend: &str, user_id: &str) -> String {
    format!("{IS_FRIEND}{possible_friend}:{user_id}")
}

pub fn is_black(possible_black: &str, user_id: &str) -> String {
    format!("{IS_BLACK}{possible_black}:{user_id}")
}

pub fn group_info(group_id: &str) -> String {
    format!("{GROUP_INFO}{group_id}")
}

pub fn group_member_info(group_id: &str, user_id: &str) -> String {
    format!("{GROUP_MEMBER_INFO}{group_id}-{user_id}")
}

pub fn group_member_ids(group_id: &str) -> String {
    format!("{GROUP_MEMBER_IDS}{group_id}")
}

/// Writer-side routes from key prefixes to the topics of enabled caches
pub fn topic_routes(settings: &LocalCacheSettings) -> Vec<TopicRoute> {
    let routes = [
        (&settings.user, &[USER_INFO, USER_GLOBAL_RECV_MSG_OPT][..]),
        (&settings.auth, &[UID_PID_TOKEN_STATUS][..]),
        (
            &settings.conversation,
            &[
                CONVERSATION,
                CONVERSATION_IDS,
                CONVERSATION_NOT_RECEIVE_MESSAGE_USER_IDS,
            ][..],
        ),
        (&settings.friend, &[FRIEND_IDS, BLACK_IDS, IS_FRIEND, IS_BLACK][..]),
        (
            &settings.group,
            &[GROUP_INFO, GROUP_MEMBER_INFO, GROUP_MEMBER_IDS][..],
        ),
    ];
    routes
        .into_iter()
        .filter(|(config, _)| config.enable())
        .map(|(config, prefixes)| TopicRoute::new(config.topic.clone(), prefixes))
        .collect()
}
