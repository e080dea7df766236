//! Error types for static web resolution.
//!
//! None of these errors ever reach the client as-is: the middleware turns every
//! failure into a well-formed HTTP response.

/// Failure to complete a sub-request against the storage backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The request could not be turned into a valid backend URI.
    #[error("invalid backend uri: {0}")]
    InvalidUri(String),

    /// The backend could not be reached or the exchange was aborted.
    #[error("backend transport error: {0}")]
    Transport(String),

    /// The response body could not be read to completion.
    #[error("failed to read backend body: {0}")]
    Body(String),
}

/// Core error type for static web resolution.
#[derive(Debug, thiserror::Error)]
pub enum StaticWebError {
    /// The request path is not a `/{version}/{account}[/{container}[/{object}]]` path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A container listing body was not the expected JSON array.
    #[error("invalid container listing: {0}")]
    Listing(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for static web operations.
pub type StaticWebResult<T> = Result<T, StaticWebError>;
