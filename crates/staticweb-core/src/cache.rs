//! Container metadata caching.
//!
//! The cache is the only state shared across requests. [`MetadataCache`] abstracts it
//! so the resolver works against memcache-like stores as well as the in-process
//! [`MemoryCache`].

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::types::{ContainerPath, ContainerWebConfig};

/// Cache key of one container's static web settings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for a container.
    #[must_use]
    pub fn new(container: &ContainerPath) -> Self {
        Self(format!(
            "/staticweb/{}/{}/{}",
            container.version, container.account, container.container
        ))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared key/value store for container settings.
///
/// A `delete` must be visible to every `get` that starts after it returns.
#[async_trait]
pub trait MetadataCache: Send + Sync + 'static {
    /// Look up an unexpired entry.
    async fn get(&self, key: &CacheKey) -> Option<ContainerWebConfig>;

    /// Store an entry for `ttl`.
    async fn set(&self, key: CacheKey, value: ContainerWebConfig, ttl: Duration);

    /// Drop an entry.
    async fn delete(&self, key: &CacheKey);
}

/// Upper bound for TTLs too large to add to an `Instant`.
const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
struct CachedEntry {
    value: ContainerWebConfig,
    expires_at: Instant,
}

/// In-process [`MetadataCache`] backed by a `DashMap`.
///
/// Expired entries are evicted lazily on lookup.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use staticweb_core::cache::{CacheKey, MemoryCache, MetadataCache};
/// use staticweb_core::types::{ContainerPath, ContainerWebConfig};
///
/// # tokio_test::block_on(async {
/// let cache = MemoryCache::new();
/// let key = CacheKey::new(&ContainerPath::new("v1", "acct", "site"));
/// let config = ContainerWebConfig {
///     index: Some("index.html".to_owned()),
///     ..ContainerWebConfig::default()
/// };
///
/// cache.set(key.clone(), config.clone(), Duration::from_secs(60)).await;
/// assert_eq!(cache.get(&key).await, Some(config));
///
/// cache.delete(&key).await;
/// assert_eq!(cache.get(&key).await, None);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<CacheKey, CachedEntry>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl MetadataCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Option<ContainerWebConfig> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }
        // The read guard is released above; remove_if rechecks in case of a concurrent set.
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    async fn set(&self, key: CacheKey, value: ContainerWebConfig, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).unwrap_or(now + MAX_TTL);
        self.entries.insert(key, CachedEntry { value, expires_at });
    }

    async fn delete(&self, key: &CacheKey) {
        self.entries.remove(key);
    }
}
