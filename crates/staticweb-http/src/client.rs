//! [`Backend`] over HTTP, using the hyper-util pooled client.

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HOST, HeaderMap, HeaderName};
use http::Uri;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use staticweb_core::{Backend, BackendError, BackendRequest, BackendResponse};

/// Connection-scoped headers that must not be forwarded by a proxy.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(http::header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Storage backend reached over plain HTTP.
pub struct HttpBackend {
    client: Client<HttpConnector, Full<Bytes>>,
    base: String,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    /// Create a backend for `base_url` (e.g. `http://127.0.0.1:8080`).
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let base = base_url.trim_end_matches('/').to_owned();
        let uri: Uri = base
            .parse()
            .map_err(|e: http::uri::InvalidUri| BackendError::InvalidUri(e.to_string()))?;
        if uri.scheme_str() != Some("http") || uri.authority().is_none() {
            return Err(BackendError::InvalidUri(base));
        }

        let client = Client::builder(TokioExecutor::new()).build_http();
        Ok(Self { client, base })
    }

    /// The base URL requests are sent to.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    fn uri_for(&self, request: &BackendRequest) -> Result<Uri, BackendError> {
        let target = format!("{}{}", self.base, request.path_and_query());
        target
            .parse()
            .map_err(|e: http::uri::InvalidUri| BackendError::InvalidUri(format!("{target}: {e}")))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, BackendError> {
        let uri = self.uri_for(&request)?;
        debug!(method = %request.method, %uri, "backend request");

        let mut outgoing = http::Request::builder()
            .method(request.method)
            .uri(uri)
            .body(Full::new(request.body))
            .map_err(|e| BackendError::InvalidUri(e.to_string()))?;
        let mut headers = request.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(HOST);
        *outgoing.headers_mut() = headers;

        let response = self
            .client
            .request(outgoing)
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| BackendError::Body(e.to_string()))?
            .to_bytes();

        Ok(BackendResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}
