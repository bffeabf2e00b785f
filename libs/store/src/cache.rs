//! External lookup-cache access.
//!
//! The registry keeps an advisory cache of digest-keyed metadata in an
//! external key-value store. Repair needs exactly two operations from it:
//! find every key containing a digest's hex, and delete a key. The trait
//! keeps the backend swappable; production shells out to `redis-cli`,
//! tests use the in-memory store.

use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

use scour_digest::Digest;

/// Cache key recording that a blob exists, as maintained by the registry.
#[must_use]
pub fn blob_presence_key(digest: &Digest) -> String {
    format!("blobs::{digest}")
}

/// Errors from cache-store operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache command `{program}` failed: {stderr}")]
    CommandFailed { program: String, stderr: String },

    #[error("cache command `{program}` produced non-UTF-8 output")]
    NonUtf8Output { program: String },
}

/// The two cache operations repair depends on.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// All keys whose name contains `fragment`.
    async fn keys_matching(&self, fragment: &str) -> Result<Vec<String>, CacheError>;

    /// Delete one key. Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
}

/// Production adapter shelling out to the `redis-cli` program.
#[derive(Debug, Clone)]
pub struct RedisCliCache {
    program: String,
}

impl RedisCliCache {
    /// Create an adapter around the given `redis-cli` program name or path.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String, CacheError> {
        let output = Command::new(&self.program).args(args).output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CacheError::CommandFailed {
                program: self.program.clone(),
                stderr: stderr.trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| CacheError::NonUtf8Output {
            program: self.program.clone(),
        })
    }
}

impl Default for RedisCliCache {
    fn default() -> Self {
        Self::new("redis-cli")
    }
}

#[async_trait]
impl CacheStore for RedisCliCache {
    async fn keys_matching(&self, fragment: &str) -> Result<Vec<String>, CacheError> {
        let pattern = format!("*{fragment}*");
        let stdout = self.run(&["--raw", "keys", &pattern]).await?;

        let keys: Vec<String> = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        debug!(pattern = %pattern, count = keys.len(), "Listed cache keys");
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let stdout = self.run(&["--raw", "del", key]).await?;
        // `del` prints the number of keys removed.
        Ok(stdout.trim() != "0")
    }
}

/// In-memory cache store for tests and offline runs.
#[derive(Debug, Default)]
pub struct MemoryCache {
    keys: Mutex<BTreeSet<String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a key into the store.
    pub async fn insert(&self, key: impl Into<String>) {
        self.keys.lock().await.insert(key.into());
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.keys.lock().await.contains(key)
    }

    pub async fn len(&self) -> usize {
        self.keys.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.lock().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn keys_matching(&self, fragment: &str) -> Result<Vec<String>, CacheError> {
        let keys = self.keys.lock().await;
        Ok(keys
            .iter()
            .filter(|key| key.contains(fragment))
            .cloned()
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.keys.lock().await.remove(key))
    }
}
