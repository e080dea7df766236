//! Container metadata resolution.
//!
//! [`MetadataResolver`] answers "what are this container's static web settings" from
//! the cache when it can and from a `HEAD` on the container root when it must. A
//! failed probe never fails the request; it disables static web for that request.

use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, Method};
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::cache::{CacheKey, MetadataCache};
use crate::headers::probe_headers;
use crate::types::{BackendRequest, ContainerPath, ContainerWebConfig};

/// Resolves and caches per-container static web settings.
#[derive(Clone)]
pub struct MetadataResolver {
    cache: Arc<dyn MetadataCache>,
    ttl: Duration,
}

impl std::fmt::Debug for MetadataResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataResolver")
            .field("cache", &"...")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl MetadataResolver {
    /// Create a resolver over `cache` with entries living for `ttl`.
    #[must_use]
    pub fn new(cache: Arc<dyn MetadataCache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Resolve the settings of `container`.
    ///
    /// `original` are the headers of the request being served; only its transaction id
    /// is carried into the probe.
    pub async fn resolve(
        &self,
        backend: &dyn Backend,
        container: &ContainerPath,
        original: &HeaderMap,
    ) -> ContainerWebConfig {
        let key = CacheKey::new(container);
        if let Some(config) = self.cache.get(&key).await {
            debug!(%key, "container metadata cache hit");
            return config;
        }

        let request = BackendRequest::new(Method::HEAD, container.to_path())
            .with_headers(probe_headers(original));

        let response = match backend.send(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%key, error = %err, "container metadata probe failed");
                return ContainerWebConfig::default();
            }
        };

        if !response.is_success() {
            debug!(%key, status = %response.status, "container metadata unavailable");
            return ContainerWebConfig::default();
        }

        let config = ContainerWebConfig::from_headers(&response.headers);
        debug!(
            %key,
            index = ?config.index,
            error = ?config.error_suffix,
            listing_css = ?config.listing_css,
            "fetched container metadata"
        );
        self.cache.set(key, config.clone(), self.ttl).await;
        config
    }

    /// Forget the cached settings of `container`.
    pub async fn invalidate(&self, container: &ContainerPath) {
        let key = CacheKey::new(container);
        debug!(%key, "invalidating container metadata");
        self.cache.delete(&key).await;
    }
}
