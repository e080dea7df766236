//! HTTP front end and upstream client for the static web middleware.
//!
//! - **Service** ([`service`]): [`StaticWebHttpService`](service::StaticWebHttpService)
//!   implements hyper's `Service` trait and feeds requests to
//!   [`StaticWeb`](staticweb_core::StaticWeb).
//!
//! - **Client** ([`client`]): [`HttpBackend`](client::HttpBackend) implements the
//!   [`Backend`](staticweb_core::Backend) trait against a plain HTTP object store.
//!
//! - **Body** ([`body`]): The [`StaticWebBody`](body::StaticWebBody) response body.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> StaticWebHttpService (hyper Service)
//!     -> Health check interception
//!     -> Transaction id, body collection, auth flag
//!     -> StaticWeb::handle
//!       -> HttpBackend (hyper-util client) -> object store
//!     -> Hop-by-hop stripping, HEAD body removal
//!   <- HTTP Response
//! ```

pub mod body;
pub mod client;
pub mod service;

pub use body::StaticWebBody;
pub use client::{HttpBackend, strip_hop_by_hop};
pub use service::{StaticWebHttpConfig, StaticWebHttpService, process_request};
