//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and value ranges
//! - Detect conflicting lister names and routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ServiceConfig;

/// Route reserved for the liveness probe.
pub const HEALTH_ROUTE: &str = "/healthz";

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("upstream: exactly one of bearer_token or bearer_token_file must be set")]
    TokenSource,

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("timeouts.request_secs ({request_secs}) must be greater than timeouts.upstream_secs ({upstream_secs})")]
    RequestTimeoutTooShort { request_secs: u64, upstream_secs: u64 },

    #[error("at least one [[listers]] entry is required")]
    NoListers,

    #[error("lister '{0}' is defined more than once")]
    DuplicateName(String),

    #[error("lister '{name}': route '{route}' is already in use")]
    DuplicateRoute { name: String, route: String },

    #[error("lister '{name}': route '{route}' must be a literal path starting with '/' and not /healthz")]
    InvalidRoute { name: String, route: String },

    #[error("lister '{name}': invalid url '{url}': {reason}")]
    InvalidUrl {
        name: String,
        url: String,
        reason: String,
    },
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    let upstream = &config.upstream;
    if upstream.bearer_token.is_some() == upstream.bearer_token_file.is_some() {
        errors.push(ValidationError::TokenSource);
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("connect_secs", timeouts.connect_secs),
        ("upstream_secs", timeouts.upstream_secs),
        ("request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(field));
        }
    }
    // the inbound deadline must leave room for the lister's own 502
    if timeouts.upstream_secs > 0
        && timeouts.request_secs > 0
        && timeouts.request_secs <= timeouts.upstream_secs
    {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request_secs: timeouts.request_secs,
            upstream_secs: timeouts.upstream_secs,
        });
    }

    if config.listers.is_empty() {
        errors.push(ValidationError::NoListers);
    }

    let mut names = HashSet::new();
    let mut routes = HashSet::new();
    for lister in &config.listers {
        if !names.insert(lister.name.as_str()) {
            errors.push(ValidationError::DuplicateName(lister.name.clone()));
        }

        if !is_literal_route(&lister.route) || lister.route == HEALTH_ROUTE {
            errors.push(ValidationError::InvalidRoute {
                name: lister.name.clone(),
                route: lister.route.clone(),
            });
        } else if !routes.insert(lister.route.as_str()) {
            errors.push(ValidationError::DuplicateRoute {
                name: lister.name.clone(),
                route: lister.route.clone(),
            });
        }

        if let Err(reason) = parse_upstream_url(&lister.url) {
            errors.push(ValidationError::InvalidUrl {
                name: lister.name.clone(),
                url: lister.url.clone(),
                reason,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// Routes are mounted verbatim, so captures and wildcards are not allowed.
fn is_literal_route(route: &str) -> bool {
    route.starts_with('/')
        && route
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.' | '~'))
}

/// Parse a lister URL, accepting only http and https.
pub fn parse_upstream_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}
