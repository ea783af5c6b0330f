//! Cache Entry Types
//!
//! An entry starts pending, is resolved by exactly one fetch into a success
//! or a failure with its own expiry, and goes stale once `expires_at` passes.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::Result;

/// State of a single cached key
#[derive(Debug)]
pub struct CacheEntry<V> {
    state: Option<Resolved<V>>,
}

#[derive(Debug)]
struct Resolved<V> {
    result: Result<V>,
    expires_at: Instant,
}

impl<V> Default for CacheEntry<V> {
    fn default() -> Self {
        Self::pending()
    }
}

impl<V> CacheEntry<V> {
    /// Entry that has never been fetched
    pub fn pending() -> Self {
        Self { state: None }
    }

    /// Entry holding a result that expires after `ttl`
    pub fn resolved(result: Result<V>, ttl: Duration) -> Self {
        let mut entry = Self::pending();
        entry.resolve(result, ttl);
        entry
    }

    /// Store a fetch result
    pub fn resolve(&mut self, result: Result<V>, ttl: Duration) {
        self.state = Some(Resolved {
            result,
            expires_at: Instant::now() + ttl,
        });
    }

    /// Whether the entry has never been resolved
    pub fn is_pending(&self) -> bool {
        self.state.is_none()
    }

    /// Whether the entry holds an unexpired result at `now`
    pub fn is_fresh(&self, now: Instant) -> bool {
        matches!(&self.state, Some(r) if now < r.expires_at)
    }

    /// Successful value, regardless of expiry
    pub fn value(&self) -> Option<&V> {
        match &self.state {
            Some(Resolved { result: Ok(v), .. }) => Some(v),
            _ => None,
        }
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.state.as_ref().map(|r| r.expires_at)
    }
}

impl<V: Clone> CacheEntry<V> {
    /// Cached result if still fresh at `now`
    pub fn fresh(&self, now: Instant) -> Option<Result<V>> {
        match &self.state {
            Some(r) if now < r.expires_at => Some(r.result.clone()),
            _ => None,
        }
    }
}
