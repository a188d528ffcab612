//! Key/value cache for provider object snapshots.
//!
//! The account directory reads through this cache before touching the
//! payment provider. The cache is strictly a speed optimization: a failed
//! write or an unreadable entry must never fail the surrounding operation,
//! so callers swallow cache errors after logging them.
//!
//! Keys are namespaced as `payments:account:<userId>`; values are the JSON
//! snapshot of the provider object exactly as it was retrieved. No TTL is
//! applied - entries live until the account is deleted.

use async_trait::async_trait;
use thiserror::Error;

use homeport_core::UserId;

/// Namespace prefix for provider account snapshots.
const ACCOUNT_NS: &str = "payments:account";

/// Cache key for a user's provider account snapshot.
#[must_use]
pub fn account_key(user_id: &UserId) -> String {
    format!("{ACCOUNT_NS}:{user_id}")
}

/// Errors from a cache backend.
#[derive(Debug, Error)]
#[error("cache error: {0}")]
pub struct CacheError(pub String);

/// Key/value store with get/set/delete.
///
/// Implementations must be safe for concurrent use by overlapping
/// invocations; a single instance lives for the whole process.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Look up a value.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value.
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;

    /// Delete a value. Deleting an absent key is not an error.
    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

/// In-process cache backed by `moka`.
///
/// Built with a capacity bound only - eviction is by size, never by age.
#[derive(Clone)]
pub struct MemoryCache {
    inner: moka::future::Cache<String, String>,
}

impl MemoryCache {
    /// Create a cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: moka::future::Cache::builder().max_capacity(capacity).build(),
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.inner.get(key).await)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.inner.insert(key.to_owned(), value).await;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.inner.invalidate(key).await;
        Ok(())
    }
}
