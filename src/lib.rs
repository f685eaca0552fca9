//! Authenticated resource listing relay.
//!
//! Receives read-only listing requests, re-issues them against a fixed
//! upstream URL with a bearer credential, and streams the upstream answer
//! back to the caller.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::{RelayError, ResourceLister, UpstreamClient};
