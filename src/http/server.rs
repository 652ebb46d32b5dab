//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID, work tracking)
//! - Bind server to listener and stop accepting on shutdown
//! - Serve requests against the configuration that is current when they arrive

use std::io;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::any,
    Extension, Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::config::ConfigStore;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::lifecycle::shutdown::ShutdownCoordinator;
use crate::lifecycle::startup::ServerContext;
use crate::logsink::{LogSinks, SinkKind};
use crate::net::listener::PortOwner;

/// Application state injected into request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigStore>,
    pub sinks: Arc<LogSinks>,
    pub shutdown: Arc<ShutdownCoordinator>,
}

/// Build the request-serving router, without admin routes.
///
/// This is what per-user ports serve.
#[allow(deprecated)]
pub fn app_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", any(serve_request))
        .route("/{*path}", any(serve_request))
        .layer(middleware::from_fn_with_state(state.clone(), track_work))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(set_request_id_layer())
}

/// HTTP server for the main listener.
pub struct HttpServer {
    router: Router,
    shutdown: CancellationToken,
}

impl HttpServer {
    /// Create a server exposing request handling plus the admin routes.
    pub fn new(ctx: &ServerContext) -> Self {
        let router = setup_admin_router(ctx.clone())
            .merge(app_router(ctx.app_state(), ctx.request_timeout));
        Self {
            router,
            shutdown: ctx.shutdown.token(),
        }
    }

    /// The complete router, for driving the server without a socket.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server, accepting connections until shutdown begins and the
    /// open connections finish.
    pub async fn run(self, listener: TcpListener) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let token = self.shutdown;
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Count the request as in-flight work, or refuse it once shutdown has begun.
async fn track_work(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    // register before checking so a request that gets through is always counted
    let work = state.shutdown.register_work();
    if state.shutdown.is_shutting_down() {
        drop(work);
        return (StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down\n").into_response();
    }

    let response = next.run(request).await;
    drop(work);
    response
}

/// Default request handler.
async fn serve_request(
    State(state): State<AppState>,
    owner: Option<Extension<PortOwner>>,
    request: Request<Body>,
) -> Response {
    let Some(config) = state.config.current() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "Configuration not loaded\n").into_response();
    };

    let request_id = request_id(&request);
    let user = owner.map(|Extension(PortOwner(user))| user);
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    state.sinks.write(
        SinkKind::Access,
        &format!(
            "{}\t{}\t{}\t{}\t{}",
            timestamp,
            request_id,
            user.as_deref().unwrap_or("-"),
            request.method(),
            request.uri().path()
        ),
    );

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        user = ?user,
        "Serving request"
    );

    (StatusCode::OK, format!("{}\n", config.server_name)).into_response()
}
