//! The storage backend seam.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::types::{BackendRequest, BackendResponse};

/// The storage backend the middleware forwards to and probes.
///
/// Any status the backend answers with, error statuses included, is a successful
/// exchange; `Err` means no response was obtained at all.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Send one request and collect its response.
    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, BackendError>;
}

#[async_trait]
impl<T: Backend + ?Sized> Backend for Arc<T> {
    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, BackendError> {
        (**self).send(request).await
    }
}

/// Send a request, turning a transport failure into a `502 Bad Gateway` outcome.
pub async fn send_or_bad_gateway(backend: &dyn Backend, request: BackendRequest) -> BackendResponse {
    let method = request.method.clone();
    let path = request.path.clone();
    match backend.send(request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(%method, %path, error = %err, "backend request failed");
            BackendResponse::bad_gateway()
        }
    }
}
