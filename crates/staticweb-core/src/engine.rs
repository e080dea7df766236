//! The static web resolution engine.
//!
//! Resolution is a sequential state machine. Each state issues at most one backend
//! sub-request (plus a cached metadata lookup) and returns a [`Transition`]; the
//! driver in [`resolve`] either finishes or moves to the next [`State`].
//!
//! ```text
//! ContainerRoot --index set, "/"--> ContainerIndex --404--> Listing
//! Object --404, index set--> ObjectIndex --404, "/"--> Listing
//!                                        --404, no "/"--> PseudoDirectory
//! any failure --> ErrorSubstitution
//! ```
//!
//! A trailing `/` on the request path is the only thing that distinguishes "directory"
//! from "file" at every branch.

use http::{Method, StatusCode};
use tracing::{debug, warn};

use crate::backend::{Backend, send_or_bad_gateway};
use crate::headers::internal_headers;
use crate::listing::{ListingPage, parse_listing, render_listing};
use crate::metadata::MetadataResolver;
use crate::path::encode_path;
use crate::types::{BackendRequest, BackendResponse, ContainerPath, ContainerWebConfig, RequestContext};

/// A point in the resolution of one request.
#[derive(Debug, Clone)]
pub enum State {
    /// Request for a container root.
    ContainerRoot,
    /// Fetch of the container root's index object.
    ContainerIndex {
        /// Configured index object name.
        index: String,
    },
    /// Request for an object path.
    Object,
    /// Fetch of the index object below a missing object path.
    ObjectIndex {
        /// Configured index object name.
        index: String,
    },
    /// Check whether a missing object path is a pseudo-directory.
    PseudoDirectory,
    /// Render an HTML listing of the container, optionally under a prefix.
    Listing {
        /// Listing prefix, ending with `/`.
        prefix: Option<String>,
    },
    /// Replace the body of a failure with the container's error page.
    ErrorSubstitution {
        /// The failure response to substitute into, or to forward as-is.
        failure: BackendResponse,
    },
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            Self::ContainerRoot => "container_root",
            Self::ContainerIndex { .. } => "container_index",
            Self::Object => "object",
            Self::ObjectIndex { .. } => "object_index",
            Self::PseudoDirectory => "pseudo_directory",
            Self::Listing { .. } => "listing",
            Self::ErrorSubstitution { .. } => "error_substitution",
        }
    }
}

/// The result of one state.
#[derive(Debug, Clone)]
pub enum Transition {
    /// Return this response to the client.
    Forward(BackendResponse),
    /// Answer `301 Moved Permanently` to this location.
    Redirect(String),
    /// Answer `200 OK` with this HTML document.
    Render(String),
    /// Route this failure into error substitution.
    Substitute(BackendResponse),
    /// Continue in another state.
    NextStep(State),
}

/// Resolve a HEAD/GET request for a container root or object.
///
/// Only called for requests whose context names a container.
pub async fn resolve(
    ctx: &RequestContext,
    backend: &dyn Backend,
    metadata: &MetadataResolver,
) -> BackendResponse {
    let Some(mut engine) = Engine::new(ctx, backend, metadata) else {
        return send_or_bad_gateway(backend, ctx.replay(ctx.raw_path.clone())).await;
    };

    let mut state = if ctx.object.is_some() {
        State::Object
    } else {
        State::ContainerRoot
    };

    loop {
        debug!(
            state = state.name(),
            account = %ctx.account,
            container = %engine.container.container,
            object = ?ctx.object,
            "static web step"
        );
        match engine.step(state).await {
            Transition::Forward(response) => return response,
            Transition::Redirect(location) => {
                return BackendResponse::moved_permanently(&location);
            }
            Transition::Render(html) => return BackendResponse::html(html),
            Transition::Substitute(failure) => state = State::ErrorSubstitution { failure },
            Transition::NextStep(next) => state = next,
        }
    }
}

/// Per-request resolution state.
pub struct Engine<'a> {
    ctx: &'a RequestContext,
    backend: &'a dyn Backend,
    metadata: &'a MetadataResolver,
    container: ContainerPath,
    config: Option<ContainerWebConfig>,
}

impl std::fmt::Debug for Engine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("ctx", &self.ctx)
            .field("container", &self.container)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> Engine<'a> {
    /// Create an engine for `ctx`, which must name a container.
    #[must_use]
    pub fn new(
        ctx: &'a RequestContext,
        backend: &'a dyn Backend,
        metadata: &'a MetadataResolver,
    ) -> Option<Self> {
        Some(Self {
            container: ctx.container_path()?,
            ctx,
            backend,
            metadata,
            config: None,
        })
    }

    /// Run a single state.
    pub async fn step(&mut self, state: State) -> Transition {
        match state {
            State::ContainerRoot => self.container_root().await,
            State::ContainerIndex { index } => self.container_index(&index).await,
            State::Object => self.object().await,
            State::ObjectIndex { index } => self.object_index(&index).await,
            State::PseudoDirectory => self.pseudo_directory().await,
            State::Listing { prefix } => self.listing(prefix.as_deref()).await,
            State::ErrorSubstitution { failure } => self.error_substitution(failure).await,
        }
    }

    /// Container settings, fetched at most once per request.
    async fn config(&mut self) -> ContainerWebConfig {
        if let Some(config) = &self.config {
            return config.clone();
        }
        let config = self
            .metadata
            .resolve(self.backend, &self.container, &self.ctx.headers)
            .await;
        self.config = Some(config.clone());
        config
    }

    async fn send(&self, request: BackendRequest) -> BackendResponse {
        send_or_bad_gateway(self.backend, request).await
    }

    /// GET the container with a JSON, `/`-delimited listing query.
    async fn list(&self, query: String) -> BackendResponse {
        let request = BackendRequest::new(Method::GET, self.container.to_path())
            .with_query(query)
            .with_headers(internal_headers(&self.ctx.headers));
        self.send(request).await
    }

    async fn container_root(&mut self) -> Transition {
        let Some(index) = self.config().await.index else {
            let response = self.send(self.ctx.replay(self.ctx.raw_path.clone())).await;
            return Transition::Forward(response);
        };
        if !self.ctx.has_trailing_slash() {
            return Transition::Redirect(self.ctx.directory_path());
        }
        Transition::NextStep(State::ContainerIndex { index })
    }

    async fn container_index(&mut self, index: &str) -> Transition {
        let path = format!("{}{}", self.ctx.directory_path(), encode_path(index));
        let response = self.send(self.ctx.replay(path)).await;
        if response.status == StatusCode::NOT_FOUND {
            Transition::NextStep(State::Listing { prefix: None })
        } else if response.is_servable() {
            Transition::Forward(response)
        } else {
            Transition::Substitute(response)
        }
    }

    async fn object(&mut self) -> Transition {
        let response = self.send(self.ctx.replay(self.ctx.raw_path.clone())).await;
        if response.is_servable() {
            return Transition::Forward(response);
        }
        if response.status != StatusCode::NOT_FOUND {
            return Transition::Substitute(response);
        }
        match self.config().await.index {
            Some(index) => Transition::NextStep(State::ObjectIndex { index }),
            None => Transition::Forward(response),
        }
    }

    async fn object_index(&mut self, index: &str) -> Transition {
        let path = format!("{}{}", self.ctx.directory_path(), encode_path(index));
        let response = self.send(self.ctx.replay(path)).await;
        if response.is_servable() {
            if self.ctx.has_trailing_slash() {
                return Transition::Forward(response);
            }
            return Transition::Redirect(self.ctx.directory_path());
        }
        if response.status != StatusCode::NOT_FOUND {
            return Transition::Substitute(response);
        }
        if self.ctx.has_trailing_slash() {
            Transition::NextStep(State::Listing {
                prefix: self.ctx.object.clone(),
            })
        } else {
            Transition::NextStep(State::PseudoDirectory)
        }
    }

    async fn pseudo_directory(&mut self) -> Transition {
        let object = self.ctx.object.as_deref().unwrap_or_default();
        let query = format!(
            "limit=1&format=json&delimiter=/&prefix={}",
            encode_path(&format!("{object}/"))
        );
        let response = self.list(query).await;
        let is_directory = response.is_success()
            && parse_listing(&response.body).is_ok_and(|entries| !entries.is_empty());
        if is_directory {
            Transition::Redirect(self.ctx.directory_path())
        } else {
            Transition::Substitute(BackendResponse::not_found())
        }
    }

    async fn listing(&mut self, prefix: Option<&str>) -> Transition {
        let mut query = String::from("delimiter=/&format=json");
        if let Some(prefix) = prefix {
            query.push_str("&prefix=");
            query.push_str(&encode_path(prefix));
        }
        let response = self.list(query).await;
        if !response.is_success() {
            return Transition::Substitute(response);
        }

        let entries = match parse_listing(&response.body) {
            Ok(entries) if !entries.is_empty() => entries,
            Ok(_) => return Transition::Substitute(BackendResponse::not_found()),
            Err(err) => {
                warn!(container = %self.container.container, error = %err, "unreadable listing");
                return Transition::Substitute(BackendResponse::not_found());
            }
        };

        let stylesheet = self
            .config()
            .await
            .listing_css
            .map(|css| self.container.object_path(&css));
        let display_path = self.ctx.display_path();
        let page = ListingPage {
            display_path: &display_path,
            prefix,
            stylesheet: stylesheet.as_deref(),
        };
        Transition::Render(render_listing(&entries, &page))
    }

    async fn error_substitution(&mut self, failure: BackendResponse) -> Transition {
        let Some(suffix) = self.config().await.error_suffix else {
            return Transition::Forward(failure);
        };

        let name = format!("{}{suffix}", failure.status.as_u16());
        let request = BackendRequest::new(Method::GET, self.container.object_path(&name))
            .with_headers(internal_headers(&self.ctx.headers));
        let page = self.send(request).await;

        if page.is_success() {
            debug!(status = %failure.status, page = %name, "substituted error page");
            Transition::Forward(substitute_body(failure, page))
        } else {
            Transition::Forward(failure)
        }
    }
}

/// Keep the failure's status and headers, with the error page's body and the headers
/// that describe it.
fn substitute_body(failure: BackendResponse, page: BackendResponse) -> BackendResponse {
    use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};

    let mut headers = failure.headers;
    for name in [CONTENT_TYPE, CONTENT_LENGTH, CONTENT_ENCODING] {
        headers.remove(&name);
        if let Some(value) = page.headers.get(&name) {
            headers.insert(name, value.clone());
        }
    }
    BackendResponse {
        status: failure.status,
        headers,
        body: page.body,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::cache::MemoryCache;
    use crate::path::classify;
    use crate::testing::{FakeBackend, container_head};

    fn context(method: Method, path: &str) -> RequestContext {
        let request = BackendRequest::new(method, path);
        let classified = classify(path).unwrap();
        RequestContext::new(&request, classified, false)
    }

    fn resolver() -> MetadataResolver {
        MetadataResolver::new(Arc::new(MemoryCache::new()), Duration::from_secs(60))
    }

    fn indexed_backend() -> FakeBackend {
        let backend = FakeBackend::new();
        backend.on(
            Method::HEAD,
            "/v1/a/c",
            container_head(Some("index.html"), None, None),
        );
        backend
    }

    #[tokio::test]
    async fn test_should_redirect_from_container_root_state() {
        let backend = indexed_backend();
        let metadata = resolver();
        let ctx = context(Method::GET, "/v1/a/c");
        let mut engine = Engine::new(&ctx, &backend, &metadata).unwrap();

        match engine.step(State::ContainerRoot).await {
            Transition::Redirect(location) => assert_eq!(location, "/v1/a/c/"),
            other => panic!("unexpected transition: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_should_move_from_container_root_to_index() {
        let backend = indexed_backend();
        let metadata = resolver();
        let ctx = context(Method::GET, "/v1/a/c/");
        let mut engine = Engine::new(&ctx, &backend, &metadata).unwrap();

        match engine.step(State::ContainerRoot).await {
            Transition::NextStep(State::ContainerIndex { index }) => {
                assert_eq!(index, "index.html");
            }
            other => panic!("unexpected transition: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_should_move_from_missing_index_to_prefixed_listing() {
        let backend = indexed_backend();
        let metadata = resolver();
        let ctx = context(Method::GET, "/v1/a/c/docs/");
        let mut engine = Engine::new(&ctx, &backend, &metadata).unwrap();

        let transition = engine
            .step(State::ObjectIndex {
                index: "index.html".to_owned(),
            })
            .await;
        match transition {
            Transition::NextStep(State::Listing { prefix }) => {
                assert_eq!(prefix.as_deref(), Some("docs/"));
            }
            other => panic!("unexpected transition: {other:?}"),
        }
        assert_eq!(backend.targets(), vec!["GET /v1/a/c/docs/index.html"]);
    }

    #[tokio::test]
    async fn test_should_move_from_missing_index_to_probe_without_slash() {
        let backend = indexed_backend();
        let metadata = resolver();
        let ctx = context(Method::GET, "/v1/a/c/docs");
        let mut engine = Engine::new(&ctx, &backend, &metadata).unwrap();

        let transition = engine
            .step(State::ObjectIndex {
                index: "index.html".to_owned(),
            })
            .await;
        assert!(matches!(transition, Transition::NextStep(State::PseudoDirectory)));
    }

    #[tokio::test]
    async fn test_should_route_index_server_error_to_substitution() {
        let backend = indexed_backend();
        backend.on_status(
            Method::GET,
            "/v1/a/c/index.html",
            StatusCode::INTERNAL_SERVER_ERROR,
        );
        let metadata = resolver();
        let ctx = context(Method::GET, "/v1/a/c/");
        let mut engine = Engine::new(&ctx, &backend, &metadata).unwrap();

        let transition = engine
            .step(State::ContainerIndex {
                index: "index.html".to_owned(),
            })
            .await;
        match transition {
            Transition::Substitute(failure) => {
                assert_eq!(failure.status, StatusCode::INTERNAL_SERVER_ERROR);
            }
            other => panic!("unexpected transition: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_should_forward_failure_without_error_suffix() {
        let backend = indexed_backend();
        let metadata = resolver();
        let ctx = context(Method::GET, "/v1/a/c/x");
        let mut engine = Engine::new(&ctx, &backend, &metadata).unwrap();

        let failure = BackendResponse::new(StatusCode::UNAUTHORIZED).with_body("no");
        match engine.step(State::ErrorSubstitution { failure }).await {
            Transition::Forward(response) => {
                assert_eq!(response.status, StatusCode::UNAUTHORIZED);
                assert_eq!(response.body, bytes::Bytes::from_static(b"no"));
            }
            other => panic!("unexpected transition: {other:?}"),
        }
    }

    #[test]
    fn test_should_require_container_for_engine() {
        let backend = FakeBackend::new();
        let metadata = resolver();
        let ctx = context(Method::GET, "/v1/a");
        assert!(Engine::new(&ctx, &backend, &metadata).is_none());
    }
}
