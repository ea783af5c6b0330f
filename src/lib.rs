//! imcache - Distributed Read-Through Local Caching
//!
//! Process-local caches that sit in front of the remote services of an
//! instant-messaging backend, kept coherent across replicas by publishing
//! invalidated keys over pub/sub.
//!
//! # Architecture
//!
//! ```text
//!   RPC handler
//!       │ get
//!       ▼
//! ┌──────────────┐  miss   ┌──────────────┐
//! │ Domain cache │────────▶│  Remote RPC  │
//! │  (rpccache)  │         └──────────────┘
//! └──────┬───────┘
//!        │ Cache<V>: ShardedLru + Link
//!        ▼
//! ┌──────────────┐ publish ┌──────────────┐ subscribe ┌──────────────┐
//! │  invalidate  │────────▶│    PubSub    │──────────▶│ other replica│
//! └──────────────┘         └──────────────┘  del_local└──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`localcache`] - Sharded LRU engine and read-through facade
//! - [`invalidation`] - Pub/sub invalidation protocol
//! - [`rpccache`] - Domain caches and the online presence cache
//! - [`domain`] - Ports (RPC and pub/sub traits) and domain values
//! - [`adapters`] - In-process pub/sub and Prometheus metrics
//! - [`config`] - YAML settings
//! - [`error`] - Error types

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod invalidation;
pub mod localcache;
pub mod rpccache;

// Re-export commonly used types
pub use config::{LocalCacheConfig, LocalCacheSettings, OnlineCacheConfig};
pub use error::{Error, Result};
pub use localcache::{Cache, CacheOptions, ShardedLru};
pub use rpccache::{
    AuthLocalCache, CacheDeps, ConversationLocalCache, FriendLocalCache, GroupLocalCache,
    OnlineCache, UserLocalCache,
};
