//! Local Cache Configuration
//!
//! Per-domain settings, loaded from YAML:
//!
//! ```yaml
//! user:
//!   topic: DELETE_CACHE_USER
//!   slotNum: 100
//!   slotSize: 2000
//!   successExpire: 300
//!   failedExpire: 5
//! online:
//!   fullUserCache: false
//!   slotNum: 1024
//!   slotSize: 2048
//! ```
//!
//! Expirations are in seconds. Missing sections and fields take defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::localcache::CacheOptions;

/// Settings for one domain cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalCacheConfig {
    /// Invalidation topic. Empty disables the local cache.
    pub topic: String,
    pub slot_num: usize,
    pub slot_size: usize,
    /// Success TTL in seconds
    pub success_expire: u64,
    /// Failure TTL in seconds
    pub failed_expire: u64,
}

impl Default for LocalCacheConfig {
    fn default() -> Self {
        Self {
            topic: String::new(),
            slot_num: 100,
            slot_size: 2000,
            success_expire: 300,
            failed_expire: 5,
        }
    }
}

impl LocalCacheConfig {
    /// Default settings publishing on `topic`
    pub fn with_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    pub fn success(&self) -> Duration {
        Duration::from_secs(self.success_expire)
    }

    pub fn failed(&self) -> Duration {
        Duration::from_secs(self.failed_expire)
    }

    /// Whether local caching and invalidation are on
    pub fn enable(&self) -> bool {
        !self.topic.is_empty() && self.slot_num > 0 && self.slot_size > 0
    }

    /// Facade options for these settings. Disabled settings yield a
    /// pass-through cache.
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions::new()
            .with_local_disabled(!self.enable())
            .with_slot_num(self.slot_num)
            .with_slot_size(self.slot_size)
            .with_success_ttl(self.success())
            .with_failed_ttl(self.failed())
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.enable() && self.failed_expire > self.success_expire {
            return Err(Error::Config(format!(
                "{}: failedExpire ({}s) must not exceed successExpire ({}s)",
                name, self.failed_expire, self.success_expire
            )));
        }
        Ok(())
    }
}

/// Settings for the online presence cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OnlineCacheConfig {
    /// Mirror every user's presence instead of caching queried users
    pub full_user_cache: bool,
    pub slot_num: usize,
    pub slot_size: usize,
    pub success_expire: u64,
    pub failed_expire: u64,
    /// Pause before the full-mode bootstrap, in milliseconds
    pub bootstrap_delay_ms: u64,
    /// User ids per bootstrap page
    pub bootstrap_page_size: u32,
}

impl Default for OnlineCacheConfig {
    fn default() -> Self {
        Self {
            full_user_cache: false,
            slot_num: 1024,
            slot_size: 2048,
            success_expire: 1800,
            failed_expire: 3,
            bootstrap_delay_ms: 3000,
            bootstrap_page_size: 500,
        }
    }
}

impl OnlineCacheConfig {
    pub fn success(&self) -> Duration {
        Duration::from_secs(self.success_expire)
    }

    pub fn failed(&self) -> Duration {
        Duration::from_secs(self.failed_expire)
    }

    pub fn bootstrap_delay(&self) -> Duration {
        Duration::from_millis(self.bootstrap_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.slot_num == 0 || self.slot_size == 0 {
            return Err(Error::Config(
                "online: slotNum and slotSize must be greater than 0".into(),
            ));
        }
        if self.failed_expire > self.success_expire {
            return Err(Error::Config(format!(
                "online: failedExpire ({}s) must not exceed successExpire ({}s)",
                self.failed_expire, self.success_expire
            )));
        }
        if self.full_user_cache && self.bootstrap_page_size == 0 {
            return Err(Error::Config(
                "online: bootstrapPageSize must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Settings for every local cache in a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalCacheSettings {
    pub user: LocalCacheConfig,
    pub group: LocalCacheConfig,
    pub friend: LocalCacheConfig,
    pub conversation: LocalCacheConfig,
    pub auth: LocalCacheConfig,
    pub online: OnlineCacheConfig,
}

impl Default for LocalCacheSettings {
    fn default() -> Self {
        Self {
            user: LocalCacheConfig::with_topic("DELETE_CACHE_USER"),
            group: LocalCacheConfig::with_topic("DELETE_CACHE_GROUP"),
            friend: LocalCacheConfig::with_topic("DELETE_CACHE_FRIEND"),
            conversation: LocalCacheConfig::with_topic("DELETE_CACHE_CONVERSATION"),
            auth: LocalCacheConfig::with_topic("DELETE_CACHE_AUTH"),
            online: OnlineCacheConfig::default(),
        }
    }
}

impl LocalCacheSettings {
    /// Parse and validate settings from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let settings = Self::from_yaml_str(&yaml)?;
        info!(path = %path.display(), "Loaded local cache settings");
        Ok(settings)
    }

    /// Domain cache settings by name
    pub fn domains(&self) -> [(&'static str, &LocalCacheConfig); 5] {
        [
            ("user", &self.user),
            ("group", &self.group),
            ("friend", &self.friend),
            ("conversation", &self.conversation),
            ("auth", &self.auth),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        for (name, config) in self.domains() {
            config.validate(name)?;
        }
        self.online.validate()
    }
}
