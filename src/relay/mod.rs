//! Resource listing relay.
//!
//! # Data Flow
//! ```text
//! routed request (any method)
//!     → lister.rs (method check, bearer injection, single upstream call)
//!     → client.rs (pooled HTTPS client, lazy body stream)
//!     → error.rs (failure → status + JSON body)
//!     → inbound response
//! ```
//!
//! # Design Decisions
//! - The lister is generic over a `tower::Service` transport so any client
//!   with the same request/response shape can sit underneath it
//! - Configuration (token, URL, client) is fixed at construction and shared
//!   read-only across concurrent requests

pub mod client;
pub mod error;
pub mod lister;

pub use client::UpstreamClient;
pub use error::{ApiError, RelayError};
pub use lister::{list_resources, ResourceLister};
