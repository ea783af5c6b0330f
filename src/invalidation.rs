//! Pub/Sub Invalidation Protocol
//!
//! Each domain cache has one topic. A message is a JSON array of cache keys:
//!
//! ```text
//! DELETE_CACHE_USER  ["USER_INFO:u1","USER_GLOBAL_RECV_MSG_OPT_KEY:u1"]
//! ```
//!
//! The writer publishes before deleting locally; every replica subscribed to
//! the topic deletes the keys through its local-only path, so a message is
//! never re-broadcast. Transport errors and malformed messages are logged and
//! dropped: entries still expire on their TTL.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::ports::{PubSub, Subscription};
use crate::error::Result;
use crate::localcache::{DeleteHook, LocalDeleter, LocalDeletionSource};

/// Encode a key set as an invalidation payload
pub fn encode_keys(keys: &[String]) -> Result<String> {
    Ok(serde_json::to_string(keys)?)
}

/// Decode an invalidation payload
pub fn decode_keys(payload: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(payload)?)
}

// =============================================================================
// Publisher
// =============================================================================

/// Delete hook publishing the deleted keys on a topic
pub struct InvalidationPublisher {
    pubsub: Arc<dyn PubSub>,
    topic: String,
}

impl InvalidationPublisher {
    pub fn new(pubsub: Arc<dyn PubSub>, topic: impl Into<String>) -> Self {
        Self {
            pubsub,
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl std::fmt::Debug for InvalidationPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationPublisher")
            .field("topic", &self.topic)
            .finish()
    }
}

#[async_trait]
impl DeleteHook for InvalidationPublisher {
    async fn before_delete(&self, keys: &[String]) {
        publish(self.pubsub.as_ref(), &self.topic, keys).await;
    }
}

async fn publish(pubsub: &dyn PubSub, topic: &str, keys: &[String]) {
    let payload = match encode_keys(keys) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(topic = %topic, error = %e, "Failed to encode invalidation keys");
            return;
        }
    };
    match pubsub.publish(topic, payload).await {
        Ok(()) => debug!(topic = %topic, keys = keys.len(), "Published invalidation"),
        Err(e) => warn!(topic = %topic, error = %e, keys = ?keys, "Failed to publish invalidation"),
    }
}

// =============================================================================
// Writer-side routing
// =============================================================================

/// A topic and the key prefixes it invalidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRoute {
    pub topic: String,
    pub prefixes: Vec<String>,
}

impl TopicRoute {
    pub fn new(topic: impl Into<String>, prefixes: &[&str]) -> Self {
        Self {
            topic: topic.into(),
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        self.prefixes.iter().any(|prefix| key.starts_with(prefix.as_str()))
    }
}

/// Group `keys` by the routes whose prefixes match them.
///
/// Keys are deduplicated; a key matching several routes goes to each of
/// them; a key matching none is dropped. Routes without keys are omitted.
pub fn keys_by_topic(routes: &[TopicRoute], keys: &[String]) -> Vec<(String, Vec<String>)> {
    let mut seen = HashSet::with_capacity(keys.len());
    let distinct: Vec<&String> = keys.iter().filter(|key| seen.insert(*key)).collect();

    routes
        .iter()
        .filter_map(|route| {
            let matched: Vec<String> = distinct
                .iter()
                .filter(|key| route.matches(key))
                .map(|key| key.to_string())
                .collect();
            (!matched.is_empty()).then(|| (route.topic.clone(), matched))
        })
        .collect()
}

/// Publish `keys` on every topic that owns some of them
pub async fn publish_keys(pubsub: &dyn PubSub, routes: &[TopicRoute], keys: &[String]) {
    for (topic, topic_keys) in keys_by_topic(routes, keys) {
        publish(pubsub, &topic, &topic_keys).await;
    }
}

// =============================================================================
// Subscriber
// =============================================================================

/// Spawn the subscriber loop for `topic`.
///
/// Runs until the subscription ends or `shutdown` is cancelled.
pub fn spawn_subscriber(
    mut subscription: Subscription,
    topic: String,
    deleter: LocalDeleter,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(topic = %topic, "Invalidation subscriber started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(topic = %topic, "Invalidation subscriber shutting down");
                    break;
                }
                message = subscription.next() => {
                    let Some(message) = message else {
                        warn!(topic = %topic, "Invalidation subscription closed");
                        break;
                    };
                    match decode_keys(&message.payload) {
                        Ok(keys) => {
                            debug!(topic = %topic, keys = ?keys, "Received invalidation");
                            deleter(keys);
                        }
                        Err(e) => warn!(
                            topic = %topic,
                            payload = %message.payload,
                            error = %e,
                            "Dropping malformed invalidation message"
                        ),
                    }
                }
            }
        }
    })
}

/// Local-deletion source that runs a subscriber loop over `subscription`
pub fn local_deletions(
    subscription: Subscription,
    topic: impl Into<String>,
    shutdown: CancellationToken,
) -> LocalDeletionSource {
    let topic = topic.into();
    Box::new(move |deleter| {
        spawn_subscriber(subscription, topic, deleter, shutdown);
    })
}

// =============================================================================
// Tests
// =============================================================================
