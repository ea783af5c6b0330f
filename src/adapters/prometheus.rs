//! Prometheus Metrics Adapter
//!
//! Implements the cache `Target` port on top of Prometheus counters. One
//! [`LocalCacheMetrics`] holds the counter vectors; each domain cache gets a
//! [`PrometheusTarget`] bound to its own `cache` label value.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::{Error, Result};
use crate::localcache::Target;

/// Counter vectors for every local cache in the process
#[derive(Clone)]
pub struct LocalCacheMetrics {
    registry: Registry,
    gets: IntCounterVec,
    dels: IntCounterVec,
}

impl std::fmt::Debug for LocalCacheMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCacheMetrics").finish_non_exhaustive()
    }
}

impl LocalCacheMetrics {
    /// Create the counters and register them in a fresh registry
    pub fn new() -> Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Create the counters and register them in `registry`
    pub fn with_registry(registry: Registry) -> Result<Self> {
        let gets = IntCounterVec::new(
            Opts::new("imcache_local_get_total", "Local cache gets by result"),
            &["cache", "result"],
        )
        .map_err(metrics_error)?;
        let dels = IntCounterVec::new(
            Opts::new("imcache_local_del_total", "Local cache deletes by result"),
            &["cache", "result"],
        )
        .map_err(metrics_error)?;

        registry
            .register(Box::new(gets.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(dels.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            gets,
            dels,
        })
    }

    /// Target reporting under `cache`
    pub fn target(&self, cache: &str) -> Arc<PrometheusTarget> {
        Arc::new(PrometheusTarget {
            get_hit: self.gets.with_label_values(&[cache, "hit"]),
            get_success: self.gets.with_label_values(&[cache, "success"]),
            get_failed: self.gets.with_label_values(&[cache, "failed"]),
            del_hit: self.dels.with_label_values(&[cache, "hit"]),
            del_not_found: self.dels.with_label_values(&[cache, "not_found"]),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| Error::Internal(e.to_string()))
    }
}

fn metrics_error(e: prometheus::Error) -> Error {
    Error::Internal(format!("Prometheus metrics error: {}", e))
}

/// `Target` bound to one cache label
#[derive(Debug, Clone)]
pub struct PrometheusTarget {
    get_hit: IntCounter,
    get_success: IntCounter,
    get_failed: IntCounter,
    del_hit: IntCounter,
    del_not_found: IntCounter,
}

impl Target for PrometheusTarget {
    fn incr_get_hit(&self) {
        self.get_hit.inc();
    }

    fn incr_get_success(&self) {
        self.get_success.inc();
    }

    fn incr_get_failed(&self) {
        self.get_failed.inc();
    }

    fn incr_del_hit(&self) {
        self.del_hit.inc();
    }

    fn incr_del_not_found(&self) {
        self.del_not_found.inc();
    }
}
