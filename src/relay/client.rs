//! Outbound HTTP client.
//!
//! # Responsibilities
//! - Own the pooled connection set used to reach upstream listing endpoints
//! - Trust an extra CA bundle (in-cluster API servers) when configured
//! - Present itself as a `tower::Service` so the relay can be driven by
//!   any transport with the same shape
//!
//! # Design Decisions
//! - Only a connect timeout is set on the client; a total timeout would also
//!   bound the body copy and cut off large listings
//! - Response bodies are handed back as a lazy byte stream, never buffered
//! - A non-canonical reason phrase from the upstream is kept as a hyper
//!   `ReasonPhrase` extension on the returned response

use std::fs;
use std::path::Path;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, Response},
};
use futures_util::future::BoxFuture;
use hyper::ext::ReasonPhrase;
use tower::Service;

use crate::config::ConfigError;

/// Shared upstream client. Cloning is cheap and clones share the pool.
#[derive(Clone, Debug)]
pub struct UpstreamClient {
    inner: reqwest::Client,
}

impl UpstreamClient {
    /// Wrap an existing reqwest client.
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Build a client from connection settings.
    pub fn from_settings(
        connect_timeout: Duration,
        ca_file: Option<&Path>,
        insecure_skip_verify: bool,
    ) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("resource-lister/", env!("CARGO_PKG_VERSION")));

        if let Some(path) = ca_file {
            let pem = fs::read(path).map_err(ConfigError::Io)?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(ConfigError::Client)?;
            builder = builder.add_root_certificate(cert);
        }

        if insecure_skip_verify {
            tracing::warn!("Upstream TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let inner = builder.build().map_err(ConfigError::Client)?;
        Ok(Self::new(inner))
    }
}

impl Service<Request<Body>> for UpstreamClient {
    type Response = Response<Body>;
    type Error = reqwest::Error;
    type Future = BoxFuture<'static, Result<Response<Body>, reqwest::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // reqwest queues internally; there is no readiness to wait on
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let client = self.inner.clone();
        Box::pin(async move {
            let (parts, _body) = request.into_parts();

            let upstream = client
                .request(parts.method, parts.uri.to_string())
                .headers(parts.headers)
                .send()
                .await?;

            let status = upstream.status();
            let headers = upstream.headers().clone();
            let reason = upstream.extensions().get::<ReasonPhrase>().cloned();

            let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            if let Some(reason) = reason {
                response.extensions_mut().insert(reason);
            }
            Ok(response)
        })
    }
}
