//! Relay failure taxonomy and its mapping onto inbound responses.
//!
//! # Status Mapping
//! ```text
//! MethodNotAllowed  → 405  (no outbound call)
//! RequestBuild      → 500  (no outbound call)
//! Transport         → 502  (outbound call failed)
//! UpstreamRejected  → 500  (upstream answered != 200, body discarded)
//! ```
//!
//! The upstream status is folded into 500 on purpose; callers only see it
//! through the message text.

use std::error::Error as StdError;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    BoxError, Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every way a single listing request can fail.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Inbound method was not GET.
    #[error("invalid method: only GET is allowed")]
    MethodNotAllowed,

    /// The outbound request could not be assembled.
    #[error("failed to create GET request: {0}")]
    RequestBuild(String),

    /// The upstream could not be reached.
    #[error("GET request failed: {0}")]
    Transport(String),

    /// The upstream answered with something other than 200 OK. Holds the
    /// upstream status line, e.g. `404 Not Found`.
    #[error("console service account cannot list resource: {0}")]
    UpstreamRejected(String),
}

impl RelayError {
    /// Wrap a transport error, keeping its whole `source()` chain in the message.
    pub fn transport(err: BoxError) -> Self {
        RelayError::Transport(error_chain(err.as_ref()))
    }

    /// Reject an upstream answer, keeping the reason phrase the upstream sent
    /// and falling back to the canonical one.
    pub fn rejected(status: StatusCode, reason: Option<&[u8]>) -> Self {
        let reason = match reason {
            Some(phrase) => Some(String::from_utf8_lossy(phrase).into_owned()),
            None => status.canonical_reason().map(str::to_owned),
        };
        RelayError::UpstreamRejected(match reason {
            Some(reason) => format!("{} {reason}", status.as_u16()),
            None => status.as_u16().to_string(),
        })
    }

    pub fn timed_out(limit: Duration) -> Self {
        RelayError::Transport(format!(
            "upstream did not respond within {}s",
            limit.as_secs_f64()
        ))
    }

    /// Inbound status for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::RequestBuild(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::Transport(_) => StatusCode::BAD_GATEWAY,
            RelayError::UpstreamRejected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::MethodNotAllowed => "method_not_allowed",
            RelayError::RequestBuild(_) => "request_build",
            RelayError::Transport(_) => "transport",
            RelayError::UpstreamRejected(_) => "upstream_rejected",
        }
    }
}

/// JSON body written for every non-success inbound response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ApiError {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Render an error followed by each of its sources, `outer: inner: root`.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // hyper and reqwest often repeat the inner message in the outer one
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
