//! Cache Metrics Targets
//!
//! Every cache component reports through a [`Target`]. Implementations are
//! pure counters: they must not block or fail.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counter sink for cache traffic
pub trait Target: Send + Sync {
    fn incr_get_hit(&self);
    fn incr_get_success(&self);
    fn incr_get_failed(&self);
    fn incr_del_hit(&self);
    fn incr_del_not_found(&self);
}

/// No-op target, the default
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyTarget;

impl Target for EmptyTarget {
    fn incr_get_hit(&self) {}
    fn incr_get_success(&self) {}
    fn incr_get_failed(&self) {}
    fn incr_del_hit(&self) {}
    fn incr_del_not_found(&self) {}
}

/// In-process atomic counters
#[derive(Debug, Default)]
pub struct CountingTarget {
    get_hit: AtomicU64,
    get_success: AtomicU64,
    get_failed: AtomicU64,
    del_hit: AtomicU64,
    del_not_found: AtomicU64,
}

impl CountingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> TargetSnapshot {
        TargetSnapshot {
            get_hit: self.get_hit.load(Ordering::Relaxed),
            get_success: self.get_success.load(Ordering::Relaxed),
            get_failed: self.get_failed.load(Ordering::Relaxed),
            del_hit: self.del_hit.load(Ordering::Relaxed),
            del_not_found: self.del_not_found.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.get_hit.store(0, Ordering::Relaxed);
        self.get_success.store(0, Ordering::Relaxed);
        self.get_failed.store(0, Ordering::Relaxed);
        self.del_hit.store(0, Ordering::Relaxed);
        self.del_not_found.store(0, Ordering::Relaxed);
    }
}

impl Target for CountingTarget {
    fn incr_get_hit(&self) {
        self.get_hit.fetch_add(1, Ordering::Relaxed);
    }

    fn incr_get_success(&self) {
        self.get_success.fetch_add(1, Ordering::Relaxed);
    }

    fn incr_get_failed(&self) {
        self.get_failed.fetch_add(1, Ordering::Relaxed);
    }

    fn incr_del_hit(&self) {
        self.del_hit.fetch_add(1, Ordering::Relaxed);
    }

    fn incr_del_not_found(&self) {
        self.del_not_found.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of a [`CountingTarget`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetSnapshot {
    pub get_hit: u64,
    pub get_success: u64,
    pub get_failed: u64,
    pub del_hit: u64,
    pub del_not_found: u64,
}

impl TargetSnapshot {
    /// Fraction of gets served from cache
    pub fn hit_ratio(&self) -> f64 {
        let total = self.get_hit + self.get_success + self.get_failed;
        if total == 0 {
            0.0
        } else {
            self.get_hit as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_target() {
        let target = CountingTarget::new();
        target.incr_get_hit();
        target.incr_get_hit();
        target.incr_get_success();
        target.incr_get_failed();
        target.incr_del_hit();
        target.incr_del_not_found();
        target.incr_del_not_found();

        let snapshot = target.snapshot();
        assert_eq!(
            snapshot,
            TargetSnapshot {
                get_hit: 2,
                get_success: 1,
                get_failed: 1,
                del_hit: 1,
                del_not_found: 2,
            }
        );
        assert!((snapshot.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset() {
        let target = CountingTarget::new();
        target.incr_get_success();
        target.incr_del_hit();
        target.reset();
        assert_eq!(target.snapshot(), TargetSnapshot::default());
        assert_eq!(target.snapshot().hit_ratio(), 0.0);
    }
}
