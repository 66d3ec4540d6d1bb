//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with session routes and the upstream fallback
//! - Wire up middleware (request ID, tracing, timeout, guard)
//! - Serve with connection info and graceful shutdown
//! - Swap in a rebuilt guard when the configuration changes

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GuardConfig;
use crate::guard::Guard;
use crate::http::middleware::guard_middleware;
use crate::http::upstream::UpstreamClient;
use crate::session::{session_router, SessionService};

/// Everything derived from one configuration generation.
#[derive(Debug)]
pub struct InnerState {
    pub config: GuardConfig,
    pub guard: Guard,
    pub sessions: SessionService,
}

impl InnerState {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            guard: Guard::new(&config),
            sessions: SessionService::from_config(&config),
            config,
        }
    }
}

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<InnerState>>,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(InnerState::new(config))),
            upstream: UpstreamClient::new(),
        }
    }

    /// Rebuild guard and session service from a new configuration.
    pub fn reload(&self, config: GuardConfig) {
        self.inner.store(Arc::new(InnerState::new(config)));
        tracing::info!("Guard configuration reloaded");
    }
}

/// HTTP server for the request guard.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: GuardConfig) -> Self {
        let state = AppState::new(config);
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let inner = state.inner.load();
        let request_timeout = Duration::from_secs(inner.config.timeouts.request_secs);
        let auth_enabled = inner.config.auth.enabled;
        drop(inner);

        let mut app = Router::new();
        if auth_enabled {
            app = app.merge(session_router());
        }

        app.fallback(forward_handler)
            .layer(from_fn_with_state(state.clone(), guard_middleware))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(request_timeout)),
            )
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until `shutdown` fires, applying config updates as
    /// they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GuardConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                state.reload(config);
            }
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward anything no local handler serves to the upstream.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let upstream = state.inner.load().config.upstream.address.clone();
    let Some(address) = upstream else {
        return (StatusCode::NOT_FOUND, "No upstream configured").into_response();
    };

    match state.upstream.forward(&address, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
