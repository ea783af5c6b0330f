//! Online Presence Cache
//!
//! Answers "is this user online, and on which platforms".
//!
//! # Modes
//!
//! - **Full**: a map of every online user, built at startup by paging through
//!   all user ids, then kept current only by presence-change messages. Reads
//!   never call the user service.
//! - **Partial**: a sharded LRU of the users actually queried. A presence
//!   message only refreshes users already cached.
//!
//! # Wire format
//!
//! Presence changes arrive on [`ONLINE_CHANNEL`] as platform ids followed by
//! the user id, colon separated:
//!
//! ```text
//! 2:5:userABC     online on platforms 2 and 5
//! userABC         offline
//! ```

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::keys::ONLINE_CHANNEL;
use super::{CacheDeps, GroupLocalCache};
use crate::config::OnlineCacheConfig;
use crate::domain::ports::{Subscription, UserRpc};
use crate::error::{Error, Result};
use crate::localcache::{LruConfig, ShardedLru};

/// Presence cache mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnlineMode {
    Full,
    Partial,
}

enum Presence {
    Full(DashMap<String, Vec<i32>>),
    Partial(ShardedLru<String, Vec<i32>>),
}

/// Parse a presence-change payload into the user id and platform ids
pub fn parse_user_online_status(payload: &str) -> Result<(String, Vec<i32>)> {
    let invalid = |reason: String| Error::InvalidOnlineStatus {
        payload: payload.to_string(),
        reason,
    };

    let mut segments: Vec<&str> = payload.split(':').collect();
    let user_id = segments.pop().unwrap_or_default();
    if user_id.is_empty() {
        return Err(invalid("user id is empty".into()));
    }
    let platform_ids = segments
        .iter()
        .map(|segment| {
            segment
                .parse::<i32>()
                .map_err(|e| invalid(format!("platform id {:?}: {}", segment, e)))
        })
        .collect::<Result<Vec<i32>>>()?;
    Ok((user_id.to_string(), platform_ids))
}

/// Encode a presence change in the channel's wire format
pub fn format_user_online_status(user_id: &str, platform_ids: &[i32]) -> String {
    let mut segments: Vec<String> = platform_ids.iter().map(i32::to_string).collect();
    segments.push(user_id.to_string());
    segments.join(":")
}

/// Presence cache fed by the presence-change channel
pub struct OnlineCache {
    user: Arc<dyn UserRpc>,
    group: Arc<GroupLocalCache>,
    presence: Presence,
}

impl std::fmt::Debug for OnlineCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnlineCache")
            .field("mode", &self.mode())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl OnlineCache {
    /// Build the cache and start its presence subscriber.
    ///
    /// The channel is subscribed before the full-mode bootstrap, so changes
    /// published meanwhile are applied once it completes. A failed bootstrap
    /// page fails construction. A failed subscription fails construction in
    /// full mode and is logged in partial mode, where entries still expire.
    /// An invalid config is rejected before anything is subscribed.
    pub async fn new(
        user: Arc<dyn UserRpc>,
        group: Arc<GroupLocalCache>,
        config: &OnlineCacheConfig,
        deps: &CacheDeps,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        info!(
            full_user_cache = config.full_user_cache,
            slot_num = config.slot_num,
            slot_size = config.slot_size,
            success_expire = config.success_expire,
            failed_expire = config.failed_expire,
            "Building online cache"
        );
        let subscription = deps.pubsub.subscribe(ONLINE_CHANNEL).await;

        let presence = if config.full_user_cache {
            Presence::Full(DashMap::new())
        } else {
            let lru = LruConfig {
                shard_count: config.slot_num,
                shard_capacity: config.slot_size,
                success_ttl: config.success(),
                failed_ttl: config.failed(),
            };
            Presence::Partial(ShardedLru::new(&lru, deps.target("online")))
        };
        let cache = Arc::new(Self {
            user,
            group,
            presence,
        });

        if let Presence::Full(map) = &cache.presence {
            let subscription = subscription.map_err(|e| {
                error!(error = %e, "Online cache cannot subscribe to presence changes");
                e
            })?;
            cache.bootstrap(map, config).await?;
            spawn_presence_subscriber(&cache, subscription, deps.shutdown.child_token());
        } else {
            match subscription {
                Ok(subscription) => {
                    spawn_presence_subscriber(&cache, subscription, deps.shutdown.child_token())
                }
                Err(e) => error!(error = %e, "Online cache cannot subscribe to presence changes"),
            }
        }
        Ok(cache)
    }

    async fn bootstrap(&self, map: &DashMap<String, Vec<i32>>, config: &OnlineCacheConfig) -> Result<()> {
        tokio::time::sleep(config.bootstrap_delay()).await;

        let page_size = config.bootstrap_page_size;
        let mut page = 1;
        let mut users = 0usize;
        loop {
            let user_ids = self
                .user
                .get_all_user_ids(page, page_size)
                .await
                .map_err(|e| bootstrap_error(page, e))?;
            users += user_ids.len();

            if !user_ids.is_empty() {
                let platforms = self
                    .user
                    .get_users_online_platforms(&user_ids)
                    .await
                    .map_err(|e| bootstrap_error(page, e))?;
                for (user_id, platform_ids) in platforms {
                    if !platform_ids.is_empty() {
                        map.insert(user_id, platform_ids);
                    }
                }
            }
            debug!(page, fetched = user_ids.len(), "Online cache bootstrap page");

            if user_ids.is_empty() || user_ids.len() < page_size as usize {
                break;
            }
            page += 1;
        }

        info!(pages = page, users, online = map.len(), "Online cache bootstrap complete");
        Ok(())
    }

    pub fn mode(&self) -> OnlineMode {
        match self.presence {
            Presence::Full(_) => OnlineMode::Full,
            Presence::Partial(_) => OnlineMode::Partial,
        }
    }

    /// Platforms `user_id` is connected on; empty when offline
    pub async fn get_user_online_platform(&self, user_id: &str) -> Result<Vec<i32>> {
        match &self.presence {
            Presence::Full(map) => Ok(map
                .get(user_id)
                .map(|platforms| platforms.value().clone())
                .unwrap_or_default()),
            Presence::Partial(lru) => {
                lru.get(&user_id.to_string(), || async {
                    debug!(user_id = %user_id, "OnlineCache get_user_online_platform rpc");
                    self.user.get_user_online_platform(user_id).await
                })
                .await
            }
        }
    }

    pub async fn get_user_online(&self, user_id: &str) -> Result<bool> {
        Ok(!self.get_user_online_platform(user_id).await?.is_empty())
    }

    /// Partition `user_ids` into `(online, offline)`, preserving order
    pub async fn get_users_online(&self, user_ids: &[String]) -> Result<(Vec<String>, Vec<String>)> {
        let mut online = Vec::new();
        let mut offline = Vec::new();
        match &self.presence {
            Presence::Full(map) => {
                for user_id in user_ids {
                    if map.get(user_id).is_some_and(|p| !p.is_empty()) {
                        online.push(user_id.clone());
                    } else {
                        offline.push(user_id.clone());
                    }
                }
            }
            Presence::Partial(_) => {
                for user_id in user_ids {
                    if self.get_user_online(user_id).await? {
                        online.push(user_id.clone());
                    } else {
                        offline.push(user_id.clone());
                    }
                }
            }
        }
        debug!(users = user_ids.len(), online = online.len(), "OnlineCache get_users_online");
        Ok((online, offline))
    }

    /// Online members of `group_id`
    pub async fn get_group_online(&self, group_id: &str) -> Result<Vec<String>> {
        let member_ids = self.group.get_group_member_ids(group_id).await?;
        let (online, _) = self.get_users_online(&member_ids).await?;
        debug!(group_id = %group_id, online = ?online, "OnlineCache get_group_online");
        Ok(online)
    }

    /// Apply a presence change
    pub fn set_user_online(&self, user_id: &str, platform_ids: Vec<i32>) {
        match &self.presence {
            Presence::Full(map) => {
                if platform_ids.is_empty() {
                    map.remove(user_id);
                } else {
                    map.insert(user_id.to_string(), platform_ids);
                }
            }
            Presence::Partial(lru) => {
                lru.set_has(&user_id.to_string(), platform_ids);
            }
        }
    }

    /// Number of users held in memory
    pub fn len(&self) -> usize {
        match &self.presence {
            Presence::Full(map) => map.len(),
            Presence::Partial(lru) => lru.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn bootstrap_error(page: u32, e: Error) -> Error {
    error!(page, error = %e, "Online cache bootstrap failed");
    Error::Bootstrap(format!("page {}: {}", page, e))
}

fn spawn_presence_subscriber(
    cache: &Arc<OnlineCache>,
    mut subscription: Subscription,
    shutdown: CancellationToken,
) {
    let cache: Weak<OnlineCache> = Arc::downgrade(cache);
    tokio::spawn(async move {
        info!(channel = ONLINE_CHANNEL, "Presence subscriber started");
        loop {
            let message = tokio::select! {
                _ = shutdown.cancelled() => break,
                message = subscription.next() => message,
            };
            let Some(message) = message else {
                warn!(channel = ONLINE_CHANNEL, "Presence subscription closed");
                break;
            };
            let Some(cache) = cache.upgrade() else {
                break;
            };
            match parse_user_online_status(&message.payload) {
                Ok((user_id, platform_ids)) => {
                    debug!(user_id = %user_id, platform_ids = ?platform_ids, "OnlineCache set_user_online");
                    cache.set_user_online(&user_id, platform_ids);
                }
                Err(e) => error!(
                    channel = %message.channel,
                    payload = %message.payload,
                    error = %e,
                    "Dropping unparsable presence message"
                ),
            }
        }
        info!(channel = ONLINE_CHANNEL, "Presence subscriber stopped");
    });
}

// =============================================================================
// Tests
// =============================================================================
