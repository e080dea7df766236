//! Request, response and configuration types shared by the resolver and the engine.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue, LOCATION};
use http::{Method, StatusCode};

use crate::headers::{
    X_CONTAINER_META_ERROR, X_CONTAINER_META_INDEX, X_CONTAINER_META_LISTING_CSS,
};
use crate::path::{ClassifiedPath, encode_path, encode_segment};

/// A request sent to the storage backend.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    /// HTTP method.
    pub method: Method,
    /// Percent-encoded request path.
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query: Option<String>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body; empty for reads.
    pub body: Bytes,
}

impl BackendRequest {
    /// Create a body-less request.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Set the query string.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Replace the headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Path and query as they appear in a request target.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) if !query.is_empty() => format!("{}?{query}", self.path),
            _ => self.path.clone(),
        }
    }
}

/// The outcome of one backend sub-request: status, headers and the collected body.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl BackendResponse {
    /// Create an empty response with the given status.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header, ignoring values that are not valid header text.
    #[must_use]
    pub fn with_header(mut self, name: http::header::HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// A `301 Moved Permanently` to `location`.
    #[must_use]
    pub fn moved_permanently(location: &str) -> Self {
        Self::new(StatusCode::MOVED_PERMANENTLY)
            .with_header(LOCATION, location)
            .with_header(CONTENT_TYPE, "text/html; charset=UTF-8")
            .with_body(format!(
                "<html><h1>Moved Permanently</h1><p>The resource has moved to {location}.</p></html>"
            ))
    }

    /// A `200 OK` HTML page.
    #[must_use]
    pub fn html(body: String) -> Self {
        Self::new(StatusCode::OK)
            .with_header(CONTENT_TYPE, "text/html; charset=UTF-8")
            .with_body(body)
    }

    /// A synthesized `404 Not Found`.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
            .with_header(CONTENT_TYPE, "text/html; charset=UTF-8")
            .with_body("<html><h1>Not Found</h1><p>The resource could not be found.</p></html>")
    }

    /// A synthesized `502 Bad Gateway`, used when the backend could not be reached.
    #[must_use]
    pub fn bad_gateway() -> Self {
        Self::new(StatusCode::BAD_GATEWAY)
            .with_header(CONTENT_TYPE, "text/plain; charset=UTF-8")
            .with_body("Bad Gateway")
    }

    /// 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// 2xx or 3xx: the backend produced something servable.
    #[must_use]
    pub fn is_servable(&self) -> bool {
        self.status.is_success() || self.status.is_redirection()
    }
}

/// Static web settings of one container.
///
/// Derived from the container's metadata headers. An absent field disables the
/// corresponding feature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerWebConfig {
    /// Object name served for directory-like paths.
    pub index: Option<String>,
    /// Suffix of error page objects (`{status}{suffix}`).
    pub error_suffix: Option<String>,
    /// Stylesheet object linked from listings.
    pub listing_css: Option<String>,
}

impl ContainerWebConfig {
    /// Extract the settings from a container `HEAD` response.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        Self {
            index: read(X_CONTAINER_META_INDEX),
            error_suffix: read(X_CONTAINER_META_ERROR),
            listing_css: read(X_CONTAINER_META_LISTING_CSS),
        }
    }
}

/// Decoded `/{version}/{account}/{container}` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerPath {
    /// API version segment.
    pub version: String,
    /// Account name.
    pub account: String,
    /// Container name.
    pub container: String,
}

impl ContainerPath {
    /// Create a container path from decoded segments.
    #[must_use]
    pub fn new(
        version: impl Into<String>,
        account: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            account: account.into(),
            container: container.into(),
        }
    }

    /// Percent-encoded container root path, without a trailing slash.
    #[must_use]
    pub fn to_path(&self) -> String {
        format!(
            "/{}/{}/{}",
            encode_segment(&self.version),
            encode_segment(&self.account),
            encode_segment(&self.container)
        )
    }

    /// Percent-encoded path of an object in this container.
    #[must_use]
    pub fn object_path(&self, name: &str) -> String {
        format!("{}/{}", self.to_path(), encode_path(name))
    }
}

/// Immutable view of one request under static web resolution.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// API version segment.
    pub version: String,
    /// Account name.
    pub account: String,
    /// Container name, when the path names one.
    pub container: Option<String>,
    /// Object name, when the path names one. May contain `/`.
    pub object: Option<String>,
    /// HTTP method.
    pub method: Method,
    /// Whether the caller was authenticated upstream.
    pub authenticated: bool,
    /// Original request headers.
    pub headers: HeaderMap,
    /// Original percent-encoded request path.
    pub raw_path: String,
    /// Original query string.
    pub query: Option<String>,
}

impl RequestContext {
    /// Build the context of a classified request.
    #[must_use]
    pub fn new(request: &BackendRequest, path: ClassifiedPath, authenticated: bool) -> Self {
        Self {
            version: path.version,
            account: path.account,
            container: path.container,
            object: path.object,
            method: request.method.clone(),
            authenticated,
            headers: request.headers.clone(),
            raw_path: request.path.clone(),
            query: request.query.clone(),
        }
    }

    /// The owning container, if the path names one.
    #[must_use]
    pub fn container_path(&self) -> Option<ContainerPath> {
        self.container
            .as_ref()
            .map(|c| ContainerPath::new(&self.version, &self.account, c))
    }

    /// Whether the request path ends with `/`.
    #[must_use]
    pub fn has_trailing_slash(&self) -> bool {
        self.raw_path.ends_with('/')
    }

    /// The request path with `/` appended.
    #[must_use]
    pub fn directory_path(&self) -> String {
        if self.has_trailing_slash() {
            self.raw_path.clone()
        } else {
            format!("{}/", self.raw_path)
        }
    }

    /// Decoded request path, for display.
    #[must_use]
    pub fn display_path(&self) -> String {
        crate::path::decode(&self.raw_path)
    }

    /// Replay the original request against `path`.
    #[must_use]
    pub fn replay(&self, path: impl Into<String>) -> BackendRequest {
        BackendRequest {
            method: self.method.clone(),
            path: path.into(),
            query: self.query.clone(),
            headers: self.headers.clone(),
            body: Bytes::new(),
        }
    }
}
