//! Capability traits for the external stores the application talks to.
//!
//! Both stores are opaque network services in production; the application
//! only depends on these traits so tests and local runs can swap in
//! in-memory or filesystem implementations.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{store} credentials are not configured")]
    ConfigurationMissing { store: &'static str },
    #[error("{store} responded with status {status}: {message}")]
    Upstream {
        store: &'static str,
        status: u16,
        message: String,
    },
    #[error("{store} request failed: {message}")]
    Transport {
        store: &'static str,
        message: String,
    },
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn upstream(store: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            store,
            status,
            message: message.into(),
        }
    }

    pub fn transport(store: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            store,
            message: err.to_string(),
        }
    }
}

/// Flat key-value namespace holding serialized posts.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Every key, optionally restricted to a prefix. Implementations must
    /// follow pagination cursors so the result is complete.
    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    async fn put(&self, key: &str, value: Bytes) -> Result<(), StoreError>;

    /// Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub uploaded: Option<OffsetDateTime>,
}

/// Bucket of binary objects addressed by key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StoreError>;

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError>;
}
