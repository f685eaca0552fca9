//! Authenticated pass-through for upstream listing endpoints.
//!
//! # Request Flow
//! ```text
//! inbound request
//!     → method check (GET only, else 405)
//!     → build GET for the configured URL (else 500)
//!     → attach `Authorization: Bearer <token>`
//!     → single outbound call (transport failure → 502)
//!     → status check (!= 200 → 500, upstream body dropped)
//!     → relay status + streamed body
//! ```
//!
//! # Design Decisions
//! - No retries: one attempt, fail fast
//! - The upstream body is never buffered; it becomes the inbound body as-is
//! - Owning the upstream response means every exit path drops (and so
//!   releases) its body exactly once

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, Response, StatusCode},
    response::IntoResponse,
    BoxError,
};
use bytes::Bytes;
use http_body::Body as HttpBody;
use hyper::ext::ReasonPhrase;
use tower::{Service, ServiceExt};
use url::Url;

use crate::observability::metrics;
use crate::relay::client::UpstreamClient;
use crate::relay::error::RelayError;

/// Relays one kind of resource listing from a fixed upstream URL.
///
/// Immutable once built and cheap to clone; one instance serves all
/// concurrent requests for its route.
#[derive(Clone)]
pub struct ResourceLister<S = UpstreamClient> {
    name: Arc<str>,
    bearer_token: Arc<str>,
    request_url: Url,
    client: S,
    timeout: Option<Duration>,
}

impl<S> ResourceLister<S> {
    pub fn new(bearer_token: impl Into<Arc<str>>, request_url: Url, client: S) -> Self {
        Self {
            name: Arc::from("resources"),
            bearer_token: bearer_token.into(),
            request_url,
            client,
            timeout: None,
        }
    }

    /// Label used in logs and metrics.
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Deadline for the upstream response headers. The body copy is not bounded.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    fn build_request(&self) -> Result<Request<Body>, RelayError> {
        let mut bearer = HeaderValue::try_from(format!("Bearer {}", self.bearer_token))
            .map_err(|e| RelayError::RequestBuild(e.to_string()))?;
        bearer.set_sensitive(true);

        Request::builder()
            .method(Method::GET)
            .uri(self.request_url.as_str())
            .header(header::AUTHORIZATION, bearer)
            .body(Body::empty())
            .map_err(|e| RelayError::RequestBuild(e.to_string()))
    }
}

impl<S, B> ResourceLister<S>
where
    S: Service<Request<Body>, Response = Response<B>> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    /// Run one listing request, returning the relayed response or the reason it failed.
    pub async fn list(&self, method: &Method) -> Result<Response<Body>, RelayError> {
        if *method != Method::GET {
            return Err(RelayError::MethodNotAllowed);
        }

        let request = self.build_request()?;

        tracing::debug!(
            lister = %self.name,
            url = %self.request_url,
            "Dispatching upstream list request"
        );

        let call = self.client.clone().oneshot(request);
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| RelayError::timed_out(limit))?,
            None => call.await,
        };
        let upstream = result.map_err(|e| RelayError::transport(e.into()))?;

        let status = upstream.status();
        if status != StatusCode::OK {
            let reason = upstream.extensions().get::<ReasonPhrase>();
            // `upstream` goes out of scope here, releasing its body unread
            return Err(RelayError::rejected(status, reason.map(ReasonPhrase::as_bytes)));
        }

        let (parts, body) = upstream.into_parts();
        let mut response = Response::new(Body::new(body));
        *response.status_mut() = parts.status;
        if let Some(content_type) = parts.headers.get(header::CONTENT_TYPE) {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type.clone());
        }
        Ok(response)
    }

    /// Run one listing request and render its outcome as the inbound response.
    pub async fn handle(&self, method: &Method) -> Response<Body> {
        let start_time = Instant::now();

        let response = match self.list(method).await {
            Ok(response) => response,
            Err(err) => {
                match err {
                    RelayError::MethodNotAllowed | RelayError::UpstreamRejected(_) => {
                        tracing::warn!(lister = %self.name, method = %method, kind = err.kind(), error = %err, "List request refused");
                    }
                    RelayError::RequestBuild(_) | RelayError::Transport(_) => {
                        tracing::error!(lister = %self.name, url = %self.request_url, kind = err.kind(), error = %err, "List request failed");
                    }
                }
                err.into_response()
            }
        };

        metrics::record_listing(&self.name, response.status().as_u16(), start_time);
        response
    }
}

/// Axum handler for a listing route. Mount with `any` so non-GET methods
/// reach the handler and get the JSON 405.
pub async fn list_resources<S, B>(
    State(lister): State<ResourceLister<S>>,
    method: Method,
) -> Response<Body>
where
    S: Service<Request<Body>, Response = Response<B>> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    lister.handle(&method).await
}
