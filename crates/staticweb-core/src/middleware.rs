//! Request dispatch in front of the resolution engine.

use std::sync::Arc;

use http::Method;
use tracing::{debug, info};

use crate::backend::{Backend, send_or_bad_gateway};
use crate::cache::MetadataCache;
use crate::config::StaticWebConfig;
use crate::engine;
use crate::headers::web_mode;
use crate::metadata::MetadataResolver;
use crate::path::classify;
use crate::types::{BackendRequest, BackendResponse, RequestContext};

/// Static web middleware over a storage backend.
///
/// - Paths that are not `/{version}/{account}[/...]` go straight to the backend.
/// - `PUT`/`POST` on a container root drop that container's cached settings first.
/// - `HEAD`/`GET` on a container or object run through the resolution engine, unless
///   the caller is authenticated and did not send `X-Web-Mode: true`.
/// - Everything else passes through.
#[derive(Debug)]
pub struct StaticWeb<B: Backend> {
    backend: Arc<B>,
    metadata: MetadataResolver,
}

impl<B: Backend> Clone for StaticWeb<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            metadata: self.metadata.clone(),
        }
    }
}

impl<B: Backend> StaticWeb<B> {
    /// Create the middleware with the TTL from `config`.
    #[must_use]
    pub fn new(backend: B, cache: Arc<dyn MetadataCache>, config: &StaticWebConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            metadata: MetadataResolver::new(cache, config.cache_timeout()),
        }
    }

    /// The wrapped backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Handle one request, always producing a response.
    pub async fn handle(&self, request: BackendRequest, authenticated: bool) -> BackendResponse {
        let path = match classify(&request.path) {
            Ok(path) => path,
            Err(err) => {
                debug!(error = %err, "not a storage path, passing through");
                return self.forward(request).await;
            }
        };

        if request.method == Method::PUT || request.method == Method::POST {
            if path.object.is_none() {
                if let Some(container) = path.container_path() {
                    self.metadata.invalidate(&container).await;
                }
            }
            return self.forward(request).await;
        }

        let is_read = request.method == Method::GET || request.method == Method::HEAD;
        if !is_read || path.container.is_none() {
            return self.forward(request).await;
        }
        if authenticated && !web_mode(&request.headers) {
            debug!("authenticated request without web mode, passing through");
            return self.forward(request).await;
        }

        let ctx = RequestContext::new(&request, path, authenticated);
        info!(
            method = %ctx.method,
            account = %ctx.account,
            container = ?ctx.container,
            object = ?ctx.object,
            authenticated = ctx.authenticated,
            "static web request"
        );
        let response = engine::resolve(&ctx, self.backend.as_ref(), &self.metadata).await;
        debug!(status = %response.status, "static web response");
        response
    }

    async fn forward(&self, request: BackendRequest) -> BackendResponse {
        send_or_bad_gateway(self.backend.as_ref(), request).await
    }
}
