//! In-Process Pub/Sub Adapter
//!
//! Implements the `PubSub` port with one `tokio::sync::broadcast` channel per
//! topic. Every replica constructed against the same [`InMemoryPubSub`] sees
//! every message, which is how the caches are wired in tests and in
//! single-process deployments.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::domain::ports::{Message, PubSub, Subscription};
use crate::error::Result;

/// Default per-topic buffer
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Broadcast-backed pub/sub transport
#[derive(Debug)]
pub struct InMemoryPubSub {
    channels: DashMap<String, broadcast::Sender<Message>>,
    capacity: usize,
}

impl Default for InMemoryPubSub {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPubSub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a transport buffering at most `capacity` messages per topic.
    /// Subscribers that fall further behind skip the oldest messages.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<Message> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Number of live subscriptions on `channel`
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map_or(0, |sender| sender.receiver_count())
    }

    /// Close `channel`: open subscriptions end after draining buffered
    /// messages.
    pub fn close(&self, channel: &str) {
        self.channels.remove(channel);
    }
}

#[async_trait]
impl PubSub for InMemoryPubSub {
    async fn publish(&self, channel: &str, payload: String) -> Result<()> {
        let message = Message {
            channel: channel.to_string(),
            payload,
        };
        // No receivers is not an error, same as a broker with no subscribers
        match self.sender(channel).send(message) {
            Ok(receivers) => debug!(channel = %channel, receivers, "Published message"),
            Err(_) => debug!(channel = %channel, "Published message with no subscribers"),
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription> {
        let receiver = self.sender(channel).subscribe();
        let channel = channel.to_string();

        let messages = stream::unfold(receiver, move |mut receiver| {
            let channel = channel.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(message) => return Some((message, receiver)),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(channel = %channel, skipped, "Subscriber lagged, messages dropped");
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        });
        Ok(messages.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let pubsub = InMemoryPubSub::new();
        let mut first = pubsub.subscribe("topic").await.unwrap();
        let mut second = pubsub.subscribe("topic").await.unwrap();
        assert_eq!(pubsub.subscriber_count("topic"), 2);

        pubsub.publish("topic", "hello".into()).await.unwrap();

        for sub in [&mut first, &mut second] {
            let message = sub.next().await.unwrap();
            assert_eq!(message.channel, "topic");
            assert_eq!(message.payload, "hello");
        }
    }

    #[tokio::test]
    async fn test_topics_are_independent() {
        let pubsub = InMemoryPubSub::new();
        let mut users = pubsub.subscribe("users").await.unwrap();

        pubsub.publish("groups", "g".into()).await.unwrap();
        pubsub.publish("users", "u".into()).await.unwrap();

        assert_eq!(users.next().await.unwrap().payload, "u");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_succeeds() {
        let pubsub = InMemoryPubSub::new();
        assert!(pubsub.publish("nobody", "x".into()).await.is_ok());
        assert_eq!(pubsub.subscriber_count("nobody"), 0);
    }

    #[tokio::test]
    async fn test_close_ends_subscription() {
        let pubsub = InMemoryPubSub::new();
        let mut sub = pubsub.subscribe("topic").await.unwrap();
        pubsub.publish("topic", "last".into()).await.unwrap();
        pubsub.close("topic");

        assert_eq!(sub.next().await.unwrap().payload, "last");
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber_skips_oldest() {
        let pubsub = InMemoryPubSub::with_capacity(2);
        let mut sub = pubsub.subscribe("topic").await.unwrap();
        for i in 0..4 {
            pubsub.publish("topic", i.to_string()).await.unwrap();
        }

        assert_eq!(sub.next().await.unwrap().payload, "2");
        assert_eq!(sub.next().await.unwrap().payload, "3");
    }
}
