//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up request tracing
//! - Bind server to listener
//! - Resolve each request's Host through the routing layer
//! - Forward requests to upstream over a dedicated connection

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::SidecarConfig;
use crate::directory::DirectoryClient;
use crate::http::request::prepare_upstream_request;
use crate::http::response::relay_response;
use crate::observability::metrics;
use crate::routing::{request_host, RoutingResolver};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: RoutingResolver,
    pub client: Client<HttpConnector, Body>,
}

/// Dynamic-routing reverse proxy.
pub struct ProxyServer {
    router: Router,
}

impl ProxyServer {
    /// Create a proxy that routes through `directory`.
    pub fn new(config: &SidecarConfig, directory: Arc<dyn DirectoryClient>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));

        // No idle connections are kept: every request dials its upstream anew,
        // so a routing change applies to the very next request.
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(connector);

        let state = AppState {
            resolver: RoutingResolver::new(directory),
            client,
        };

        Self {
            router: Self::build_router(state),
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for serving on a custom transport or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until the task is dropped.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Proxy listening");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app).await?;

        tracing::info!("Proxy stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Resolves the upstream from the Host header and forwards the request once.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let host = request_host(&request).unwrap_or_default();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());

    let target = match state.resolver.resolve(&host).await {
        Ok(target) => target,
        Err(e) => {
            tracing::warn!(host = %host, error = %e, "Unroutable request");
            metrics::record_request(500, "none", start_time);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    tracing::debug!(
        host = %host,
        method = %request.method(),
        path = %request.uri().path(),
        target = %target,
        source = target.source().as_str(),
        "Proxying request"
    );

    let upstream_request = match prepare_upstream_request(request, &target, &host, peer) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!(host = %host, target = %target, error = %e, "Failed to build upstream request");
            metrics::record_request(500, target.source().as_str(), start_time);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match state.client.request(upstream_request).await {
        Ok(response) => {
            metrics::record_request(response.status().as_u16(), target.source().as_str(), start_time);
            relay_response(response)
        }
        Err(e) => {
            tracing::debug!(target = %target, error = %e, "Upstream request failed");
            metrics::record_request(502, target.source().as_str(), start_time);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}
