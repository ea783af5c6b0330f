//! Infrastructure Adapters
//!
//! Adapter implementations for the domain ports, following the Port/Adapter
//! (Hexagonal) architecture pattern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │            Ports (Traits): PubSub │ Target                  │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │      InMemoryPubSub │ LocalCacheMetrics / PrometheusTarget  │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use imcache::adapters::{InMemoryPubSub, LocalCacheMetrics};
//!
//! let pubsub = Arc::new(InMemoryPubSub::new());
//! let metrics = Arc::new(LocalCacheMetrics::new()?);
//! let deps = CacheDeps::new(pubsub).with_metrics(metrics);
//! ```

mod prometheus;
mod pubsub;

pub use self::prometheus::{LocalCacheMetrics, PrometheusTarget};
pub use self::pubsub::{InMemoryPubSub, DEFAULT_CHANNEL_CAPACITY};
