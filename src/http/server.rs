//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build one `ResourceLister` per configured route, sharing one upstream client
//! - Create the Axum Router with listing routes and a liveness probe
//! - Wire up middleware (request ID, tracing, timeout)
//! - Serve on a listener until shutdown is signalled

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::validation::{parse_upstream_url, validate_config, HEALTH_ROUTE};
use crate::config::{resolve_bearer_token, ConfigError, ServiceConfig, ValidationError};
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::relay::{list_resources, ResourceLister, UpstreamClient};

/// HTTP server for the resource lister service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Validates the configuration, reads the bearer token and builds the
    /// upstream client, so this fails on a missing token file or unreadable CA bundle.
    pub fn new(config: ServiceConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let token: Arc<str> = resolve_bearer_token(&config.upstream)?.into();
        let client = UpstreamClient::from_settings(
            Duration::from_secs(config.timeouts.connect_secs),
            config.upstream.ca_file.as_deref(),
            config.upstream.insecure_skip_verify,
        )?;

        let listers = Self::build_listers(&config, &token, &client)?;
        let router = Self::build_router(&config, listers);
        Ok(Self { router, config })
    }

    fn build_listers(
        config: &ServiceConfig,
        token: &Arc<str>,
        client: &UpstreamClient,
    ) -> Result<Vec<(String, ResourceLister)>, ConfigError> {
        let upstream_timeout = Duration::from_secs(config.timeouts.upstream_secs);

        config
            .listers
            .iter()
            .map(|entry| {
                let url = parse_upstream_url(&entry.url).map_err(|reason| {
                    ConfigError::Validation(vec![ValidationError::InvalidUrl {
                        name: entry.name.clone(),
                        url: entry.url.clone(),
                        reason,
                    }])
                })?;

                tracing::info!(
                    lister = %entry.name,
                    route = %entry.route,
                    upstream = %url,
                    "Mounting resource lister"
                );

                let lister = ResourceLister::new(token.clone(), url, client.clone())
                    .with_name(entry.name.as_str())
                    .with_timeout(upstream_timeout);
                Ok((entry.route.clone(), lister))
            })
            .collect()
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, listers: Vec<(String, ResourceLister)>) -> Router {
        let mut router = Router::new().route(HEALTH_ROUTE, get(health));

        // `any` so the lister itself answers non-GET methods with its JSON 405
        for (route, lister) in listers {
            router = router.route(
                &route,
                any(list_resources::<UpstreamClient, Body>).with_state(lister),
            );
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %request_id(request),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            listers = self.config.listers.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Consume the server, returning its router (for in-process serving or tests).
    pub fn into_router(self) -> Router {
        self.router
    }
}

async fn health() -> &'static str {
    "ok"
}
