//! Local Cache Engine
//!
//! Process-local read-through cache shared by every domain cache.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Cache<V>                                 │
//! │   get / get_link ──────┐           del ──▶ DeleteHook (publish)  │
//! │                        │            │                            │
//! │                        ▼            ▼                            │
//! │  ┌─────────────────────────────┐  ┌──────────────────────────┐  │
//! │  │       ShardedLru<K, V>       │◀─│    Link (parent → deps)   │  │
//! │  │  fnv1a(key) % shard_count    │  └──────────────────────────┘  │
//! │  │ ┌───────┐ ┌───────┐ ┌───────┐│                                │
//! │  │ │Shard 0│ │Shard 1│ │  ...  ││  each: LruCache + lock,        │
//! │  │ └───────┘ └───────┘ └───────┘│  entry lock held over fetch    │
//! │  └─────────────────────────────┘                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod cache;
mod entry;
mod hash;
mod link;
mod shard;
mod target;

pub use cache::{Cache, CacheOptions, DeleteHook, LocalDeleter, LocalDeletionSource};
pub use entry::CacheEntry;
pub use hash::{fnv1a, ShardHash};
pub use link::Link;
pub use shard::{EvictCallback, LruConfig, Shard, ShardedLru};
pub use target::{CountingTarget, EmptyTarget, Target, TargetSnapshot};
