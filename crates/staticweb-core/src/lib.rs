//! Static website resolution for account/container/object storage.
//!
//! This crate sits in front of an object-storage backend and turns plain object
//! reads into a static web site, driven by per-container metadata:
//!
//! - **Path classification** ([`path`]): splits `/{version}/{account}/{container}/{object}`
//!   request paths. Anything else passes through untouched.
//!
//! - **Metadata resolution** ([`metadata`]): fetches the container's index, error and
//!   listing stylesheet settings with a `HEAD` sub-request and caches them in a
//!   [`MetadataCache`] for a bounded TTL.
//!
//! - **Resolution engine** ([`engine`]): a sequential state machine that decides between
//!   forwarding, redirecting, substituting an index or error page, and rendering a listing.
//!
//! - **Listing rendering** ([`listing`]): turns a JSON container listing into an HTML page.
//!
//! # Architecture
//!
//! ```text
//! BackendRequest
//!   -> StaticWeb::handle
//!     -> path::classify            (invalid -> pass through)
//!     -> PUT/POST container root   (invalidate cached metadata, pass through)
//!     -> HEAD/GET gate             (auth + X-Web-Mode)
//!     -> engine::resolve
//!          -> MetadataResolver (MetadataCache, HEAD probe)
//!          -> Backend sub-requests, one at a time
//!          -> listing::render_listing
//!   <- BackendResponse
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod headers;
pub mod listing;
pub mod metadata;
pub mod middleware;
pub mod path;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::Backend;
pub use cache::{CacheKey, MemoryCache, MetadataCache};
pub use config::StaticWebConfig;
pub use error::{BackendError, StaticWebError, StaticWebResult};
pub use listing::ListingEntry;
pub use metadata::MetadataResolver;
pub use middleware::StaticWeb;
pub use types::{BackendRequest, BackendResponse, ContainerPath, ContainerWebConfig, RequestContext};
