//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (tracing, request ID)
//! - Dispatch requests through the route table
//! - Redirect device commands, relay `/file/*`, serve the document root
//! - Bind server to listener and drain on shutdown

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceExt;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::http::request::{request_id, MakeRelayRequestId};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::proxy::{ProxyRelay, RelayPhase, UpstreamError, UpstreamTarget};
use crate::routing::{redirect_response, RouteAction, RouteError, RouteTable};

/// Error type for building the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Routes(#[from] RouteError),
}

/// Application state injected into handlers. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub upstream: Arc<UpstreamTarget>,
    pub relay: ProxyRelay,
    pub static_files: ServeDir,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, ServerError> {
        let upstream = UpstreamTarget::parse(&config.upstream.base_url)?;
        let routes = RouteTable::device_routes(config.file_proxy.enabled)?;

        tracing::info!(
            upstream = %upstream.base(),
            routes = routes.len(),
            file_proxy = config.file_proxy.enabled,
            static_root = %config.static_files.root,
            "Route table loaded"
        );

        let relay = ProxyRelay::new(
            upstream.clone(),
            &config.timeouts,
            config.file_proxy.preserve_host,
        );
        let static_files =
            ServeDir::new(&config.static_files.root).append_index_html_on_directories(true);

        let state = AppState {
            routes: Arc::new(routes),
            upstream: Arc::new(upstream),
            relay,
            static_files,
        };

        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(dispatch))
            .route("/{*path}", any(dispatch))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %request_id(request.headers()),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRelayRequestId))
    }

    /// The fully layered router, for driving requests in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown_rx` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

/// Main dispatch handler.
/// Looks up the route and redirects, relays, or falls back to static files.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let (route, response) = match state.routes.lookup(&method, &path) {
        Some(hit) => {
            let response = match &hit.route.action {
                RouteAction::Redirect(target) => {
                    let location =
                        target.location(&state.upstream, hit.capture, request.uri().query());
                    tracing::debug!(route = %hit.route.name, location = %location, "Redirecting to upstream");
                    redirect_response(&location)
                }
                RouteAction::Proxy => relay(&state, request).await,
            };
            (hit.route.name.as_str(), response)
        }
        None if method == Method::GET || method == Method::HEAD => {
            ("static", serve_static(&state, request).await)
        }
        None => {
            tracing::debug!(method = %method, path = %path, "No route matched");
            ("none", (StatusCode::NOT_FOUND, "No matching route found").into_response())
        }
    };

    metrics::record_request(route, method.as_str(), response.status().as_u16(), start_time);
    response
}

async fn relay(state: &AppState, request: Request<Body>) -> Response {
    let request_id = request_id(request.headers()).to_string();

    match state.relay.forward(request).await {
        Ok(response) => {
            tracing::debug!(
                request_id = %request_id,
                phase = %RelayPhase::Done,
                status = response.status().as_u16(),
                "Relayed upstream response"
            );
            response
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                upstream = %state.relay.upstream().authority(),
                phase = %e.phase(),
                error = %e,
                "Upstream relay failed"
            );
            metrics::record_upstream_error(e.phase());
            e.into_response()
        }
    }
}

async fn serve_static(state: &AppState, request: Request<Body>) -> Response {
    match state.static_files.clone().oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Static file service failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
