//! Error types for imcache
//!
//! Errors are `Clone` because a failed fetch is cached and handed to every
//! caller that reads the key until the failure TTL lapses.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the caching subsystem
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The remote service has no record for the requested id
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Remote RPC call failed
    #[error("RPC {method} failed: {reason}")]
    Rpc { method: String, reason: String },

    /// Presence-change payload could not be parsed
    #[error("Invalid online status payload {payload:?}: {reason}")]
    InvalidOnlineStatus { payload: String, reason: String },

    /// JSON / YAML (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Pub/sub transport error
    #[error("Pub/sub error on channel {channel}: {reason}")]
    PubSub { channel: String, reason: String },

    /// Online presence bootstrap failed
    #[error("Online cache bootstrap failed: {0}")]
    Bootstrap(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build an RPC error for `method`.
    pub fn rpc(method: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::Rpc {
            method: method.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error means the record does not exist remotely.
    pub fn is_record_not_found(&self) -> bool {
        matches!(self, Error::RecordNotFound(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
