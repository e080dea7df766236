//! Scripted backend for unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Method, StatusCode};
use parking_lot::Mutex;

use crate::backend::Backend;
use crate::error::BackendError;
use crate::headers::{X_CONTAINER_META_ERROR, X_CONTAINER_META_INDEX, X_CONTAINER_META_LISTING_CSS};
use crate::types::{BackendRequest, BackendResponse};

type Route = Result<BackendResponse, ()>;

/// Answers from a route table keyed by method and path (with or without query).
/// Unrouted requests get an empty `404`. Every request is recorded.
#[derive(Debug, Default)]
pub(crate) struct FakeBackend {
    routes: Mutex<HashMap<(Method, String), Route>>,
    requests: Mutex<Vec<BackendRequest>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(&self, method: Method, target: &str, response: BackendResponse) {
        self.routes
            .lock()
            .insert((method, target.to_owned()), Ok(response));
    }

    pub(crate) fn on_status(&self, method: Method, target: &str, status: StatusCode) {
        self.on(method, target, BackendResponse::new(status));
    }

    pub(crate) fn fail(&self, method: Method, target: &str) {
        self.routes.lock().insert((method, target.to_owned()), Err(()));
    }

    pub(crate) fn requests(&self) -> Vec<BackendRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn targets(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path_and_query()))
            .collect()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, BackendError> {
        let full = (request.method.clone(), request.path_and_query());
        let bare = (request.method.clone(), request.path.clone());
        self.requests.lock().push(request);

        let routes = self.routes.lock();
        match routes.get(&full).or_else(|| routes.get(&bare)) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(())) => Err(BackendError::Transport("connection refused".to_owned())),
            None => Ok(BackendResponse::new(StatusCode::NOT_FOUND)),
        }
    }
}

pub(crate) fn container_head(
    index: Option<&str>,
    error: Option<&str>,
    listing_css: Option<&str>,
) -> BackendResponse {
    let mut response = BackendResponse::new(StatusCode::NO_CONTENT);
    for (name, value) in [
        (X_CONTAINER_META_INDEX, index),
        (X_CONTAINER_META_ERROR, error),
        (X_CONTAINER_META_LISTING_CSS, listing_css),
    ] {
        if let Some(value) = value {
            response
                .headers
                .insert(name, HeaderValue::from_str(value).expect("valid header"));
        }
    }
    response
}

pub(crate) fn ok_body(content_type: &'static str, body: &'static str) -> BackendResponse {
    let mut response = BackendResponse::new(StatusCode::OK).with_body(Bytes::from_static(body.as_bytes()));
    response
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

pub(crate) fn json_listing(body: &'static str) -> BackendResponse {
    ok_body("application/json; charset=utf-8", body)
}
