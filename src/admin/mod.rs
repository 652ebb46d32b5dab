//! Administrative endpoint.
//!
//! Served on the main listener only, never on per-user ports.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::startup::ServerContext;

pub fn setup_admin_router(ctx: ServerContext) -> Router {
    Router::new()
        .route("/admin/reload", get(reload).post(reload))
        .route("/admin/status", get(get_status))
        .layer(middleware::from_fn_with_state(ctx.clone(), admin_auth_middleware))
        .with_state(ctx)
}
