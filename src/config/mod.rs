//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → loader.rs resolves the bearer token (inline or file)
//!     → HttpServer builds one ResourceLister per [[listers]] entry
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the token is read once at startup
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, resolve_bearer_token, ConfigError};
pub use schema::ListenerConfig;
pub use schema::ListerConfig;
pub use schema::ServiceConfig;
pub use schema::{LogFormat, ObservabilityConfig, TimeoutConfig, UpstreamConfig};
pub use validation::ValidationError;
