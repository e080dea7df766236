//! The static web HTTP service implementing hyper's `Service` trait.
//!
//! [`StaticWebHttpService`] adapts incoming hyper requests to the middleware:
//!
//! 1. Health check interception (`GET /health`)
//! 2. Transaction id assignment (`X-Trans-Id`)
//! 3. Request body collection
//! 4. Authentication flag from the upstream auth header
//! 5. [`StaticWeb::handle`]
//! 6. Response conversion (hop-by-hop headers removed, `HEAD` bodies dropped)

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, error};
use uuid::Uuid;

use staticweb_core::headers::{X_CF_TRANS_ID, X_TRANS_ID};
use staticweb_core::{
    Backend, BackendRequest, BackendResponse, StaticWeb, StaticWebConfig, StaticWebError,
    StaticWebResult,
};

use crate::body::StaticWebBody;
use crate::client::strip_hop_by_hop;

/// Configuration for the static web HTTP service.
#[derive(Debug, Clone)]
pub struct StaticWebHttpConfig {
    /// Header whose presence marks the caller as authenticated.
    ///
    /// A trusted proxy in front of the service must set or clear it. It is removed
    /// before the request reaches the backend.
    pub remote_user_header: HeaderName,
}

impl StaticWebHttpConfig {
    /// Derive the HTTP settings from the middleware configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StaticWebError::Config`] if the remote user header is not a
    /// valid header name.
    pub fn from_core(config: &StaticWebConfig) -> StaticWebResult<Self> {
        let remote_user_header = HeaderName::from_bytes(config.remote_user_header.as_bytes())
            .map_err(|_| {
                StaticWebError::Config(format!(
                    "invalid remote user header: {}",
                    config.remote_user_header
                ))
            })?;
        Ok(Self { remote_user_header })
    }
}

impl Default for StaticWebHttpConfig {
    fn default() -> Self {
        Self {
            remote_user_header: HeaderName::from_static("x-remote-user"),
        }
    }
}

/// The static web HTTP service.
///
/// # Type Parameters
///
/// - `B`: The storage backend behind the middleware.
#[derive(Debug)]
pub struct StaticWebHttpService<B: Backend> {
    web: StaticWeb<B>,
    config: Arc<StaticWebHttpConfig>,
}

impl<B: Backend> StaticWebHttpService<B> {
    /// Create a new service over `web`.
    #[must_use]
    pub fn new(web: StaticWeb<B>, config: StaticWebHttpConfig) -> Self {
        Self {
            web,
            config: Arc::new(config),
        }
    }
}

impl<B: Backend> Clone for StaticWebHttpService<B> {
    fn clone(&self) -> Self {
        Self {
            web: self.web.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<B: Backend> Service<http::Request<Incoming>> for StaticWebHttpService<B> {
    type Response = http::Response<StaticWebBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let web = self.web.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let (parts, incoming) = req.into_parts();
            let body = match incoming.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(err) => {
                    error!(error = %err, "failed to collect request body");
                    return Ok(plain_response(http::StatusCode::BAD_REQUEST, "Bad Request"));
                }
            };
            Ok(process_request(&web, &config, parts, body).await)
        })
    }
}

/// Run one collected request through the middleware.
pub async fn process_request<B: Backend>(
    web: &StaticWeb<B>,
    config: &StaticWebHttpConfig,
    mut parts: http::request::Parts,
    body: Bytes,
) -> http::Response<StaticWebBody> {
    if is_health_check(&parts.method, parts.uri.path()) {
        return health_check_response();
    }

    let trans_id = ensure_trans_id(&mut parts.headers);
    let authenticated = parts
        .headers
        .get(&config.remote_user_header)
        .is_some_and(|v| !v.as_bytes().is_empty());
    let is_head = parts.method == http::Method::HEAD;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    // Only feeds the authenticated flag; never forwarded.
    headers.remove(&config.remote_user_header);
    let request = BackendRequest {
        method: parts.method,
        path: parts.uri.path().to_owned(),
        query: parts.uri.query().map(str::to_owned),
        headers,
        body,
    };

    debug!(
        method = %request.method,
        path = %request.path,
        authenticated,
        trans_id = ?trans_id,
        "processing request"
    );

    let response = web.handle(request, authenticated).await;
    into_http_response(response, is_head, &trans_id)
}

/// Reuse the client's transaction id or assign a new one.
fn ensure_trans_id(headers: &mut http::HeaderMap) -> HeaderValue {
    if let Some(existing) = headers.get(X_TRANS_ID).or_else(|| headers.get(X_CF_TRANS_ID)) {
        let existing = existing.clone();
        headers.insert(X_TRANS_ID, existing.clone());
        return existing;
    }
    let generated = HeaderValue::from_str(&format!("tx{}", Uuid::new_v4().simple()))
        .unwrap_or_else(|_| HeaderValue::from_static("tx"));
    headers.insert(X_TRANS_ID, generated.clone());
    generated
}

fn into_http_response(
    response: BackendResponse,
    is_head: bool,
    trans_id: &HeaderValue,
) -> http::Response<StaticWebBody> {
    let BackendResponse {
        status,
        mut headers,
        body,
    } = response;
    strip_hop_by_hop(&mut headers);
    headers.insert(X_TRANS_ID, trans_id.clone());

    let body = if is_head {
        StaticWebBody::empty()
    } else {
        StaticWebBody::from_bytes(body)
    };

    let mut http_response = http::Response::new(body);
    *http_response.status_mut() = status;
    *http_response.headers_mut() = headers;
    http_response
}

/// Check if the request is a health check probe.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && (path == "/health" || path == "/_health")
}

/// Produce a health check response.
fn health_check_response() -> http::Response<StaticWebBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(StaticWebBody::from_string(
            r#"{"status":"running","service":"staticweb"}"#,
        ))
        .expect("static health response should be valid")
}

fn plain_response(status: http::StatusCode, text: &'static str) -> http::Response<StaticWebBody> {
    http::Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=UTF-8")
        .body(StaticWebBody::from_string(text))
        .expect("static plain response should be valid")
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use http::{Method, StatusCode};
    use http_body::Body;
    use parking_lot::Mutex;
    use staticweb_core::{BackendError, MemoryCache};

    use super::*;

    /// Answers 200 to everything and records what it saw.
    #[derive(Debug, Default)]
    struct RecordingBackend {
        seen: Mutex<Vec<BackendRequest>>,
    }

    #[async_trait]
    impl Backend for RecordingBackend {
        async fn send(&self, request: BackendRequest) -> Result<BackendResponse, BackendError> {
            self.seen.lock().push(request);
            let mut response = BackendResponse::new(StatusCode::OK).with_body("payload");
            response
                .headers
                .insert("connection", HeaderValue::from_static("close"));
            response
                .headers
                .insert("content-type", HeaderValue::from_static("text/plain"));
            Ok(response)
        }
    }

    fn web() -> StaticWeb<RecordingBackend> {
        StaticWeb::new(
            RecordingBackend::default(),
            Arc::new(MemoryCache::new()),
            &StaticWebConfig::default(),
        )
    }

    fn parts(
        method: Method,
        uri: &str,
        headers: &[(&'static str, &'static str)],
    ) -> http::request::Parts {
        let mut builder = http::Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (parts, ()) = builder.body(()).expect("valid request").into_parts();
        parts
    }

    #[test]
    fn test_should_detect_health_check_paths() {
        assert!(is_health_check(&Method::GET, "/health"));
        assert!(is_health_check(&Method::GET, "/_health"));
        assert!(!is_health_check(&Method::POST, "/health"));
        assert!(!is_health_check(&Method::GET, "/v1/a/c"));
    }

    #[tokio::test]
    async fn test_should_answer_health_check_without_backend() {
        let web = web();
        let resp = process_request(
            &web,
            &StaticWebHttpConfig::default(),
            parts(Method::GET, "/health", &[]),
            Bytes::new(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(web.backend().seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_should_forward_path_query_and_body() {
        let web = web();
        let resp = process_request(
            &web,
            &StaticWebHttpConfig::default(),
            parts(Method::PUT, "/v1/a/c/obj%20name?multipart-manifest=put", &[]),
            Bytes::from_static(b"data"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let seen = web.backend().seen.lock();
        assert_eq!(seen[0].path, "/v1/a/c/obj%20name");
        assert_eq!(seen[0].query.as_deref(), Some("multipart-manifest=put"));
        assert_eq!(seen[0].body, Bytes::from_static(b"data"));
    }

    #[tokio::test]
    async fn test_should_assign_and_echo_trans_id() {
        let web = web();
        let resp = process_request(
            &web,
            &StaticWebHttpConfig::default(),
            parts(Method::GET, "/v1/a/c/x.txt", &[]),
            Bytes::new(),
        )
        .await;

        let echoed = resp.headers().get(X_TRANS_ID).expect("trans id").clone();
        assert!(echoed.to_str().unwrap().starts_with("tx"));
        let seen = web.backend().seen.lock();
        assert_eq!(seen[0].headers.get(X_TRANS_ID), Some(&echoed));
    }

    #[tokio::test]
    async fn test_should_reuse_legacy_trans_id() {
        let web = web();
        let resp = process_request(
            &web,
            &StaticWebHttpConfig::default(),
            parts(Method::GET, "/v1/a/c/x.txt", &[("x-cf-trans-id", "legacy-1")]),
            Bytes::new(),
        )
        .await;
        assert_eq!(resp.headers().get(X_TRANS_ID).unwrap(), "legacy-1");
    }

    #[tokio::test]
    async fn test_should_drop_body_and_hop_headers_for_head() {
        let web = web();
        let resp = process_request(
            &web,
            &StaticWebHttpConfig::default(),
            parts(Method::HEAD, "/v1/a/c/x.txt", &[("te", "trailers")]),
            Bytes::new(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.body().is_end_stream());
        assert!(resp.headers().get("connection").is_none());
        assert_eq!(resp.headers().get("content-type").unwrap(), "text/plain");
        let seen = web.backend().seen.lock();
        assert!(seen[0].headers.get("te").is_none());
    }

    #[tokio::test]
    async fn test_should_mark_remote_user_as_authenticated() {
        let web = web();
        let config = StaticWebHttpConfig::default();

        let _ = process_request(
            &web,
            &config,
            parts(Method::GET, "/v1/a/c", &[("x-remote-user", "alice")]),
            Bytes::new(),
        )
        .await;
        // Authenticated without web mode: the request goes straight to the backend.
        let seen = web.backend().seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, Method::GET);
        assert_eq!(seen[0].path, "/v1/a/c");
        assert!(seen[0].headers.get("x-remote-user").is_none());
    }

    #[tokio::test]
    async fn test_should_not_forward_remote_user_header_in_web_mode() {
        let web = web();

        let _ = process_request(
            &web,
            &StaticWebHttpConfig::default(),
            parts(
                Method::GET,
                "/v1/a/c/x.txt",
                &[("x-remote-user", "alice"), ("x-web-mode", "true")],
            ),
            Bytes::new(),
        )
        .await;
        let seen = web.backend().seen.lock();
        assert_eq!(seen[0].path, "/v1/a/c/x.txt");
        assert!(seen[0].headers.get("x-remote-user").is_none());
        assert_eq!(seen[0].headers.get("x-web-mode").unwrap(), "true");
    }

    #[test]
    fn test_should_build_config_from_core() {
        let core = StaticWebConfig::builder()
            .remote_user_header("x-authenticated-user".into())
            .build();
        let config = StaticWebHttpConfig::from_core(&core).unwrap();
        assert_eq!(config.remote_user_header.as_str(), "x-authenticated-user");

        let bad = StaticWebConfig::builder()
            .remote_user_header("bad header".into())
            .build();
        assert!(StaticWebHttpConfig::from_core(&bad).is_err());
    }

    #[test]
    fn test_should_default_remote_user_header() {
        let config = StaticWebHttpConfig::default();
        assert_eq!(config.remote_user_header.as_str(), "x-remote-user");
    }
}
