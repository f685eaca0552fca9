//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (assign request ID)
//!     → route match → relay::list_resources
//!     → response (relayed listing or JSON error)
//! ```

pub mod request;
pub mod server;

pub use request::{request_id, UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
