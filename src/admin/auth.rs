use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::lifecycle::startup::ServerContext;

/// Gate admin routes on the settings of the current configuration.
///
/// A reload that changes `admin.api_key` takes effect on the next request.
pub async fn admin_auth_middleware(
    State(ctx): State<ServerContext>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let config = ctx
        .config
        .current()
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    if !config.admin.enabled {
        return Err(StatusCode::NOT_FOUND);
    }
    if config.admin.api_key.is_empty() {
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if let Some(auth_val) = auth_header {
        if auth_val.strip_prefix("Bearer ") == Some(config.admin.api_key.as_str()) {
            return Ok(next.run(request).await);
        }
    }

    tracing::warn!(path = %request.uri().path(), "Rejected unauthenticated admin request");
    Err(StatusCode::UNAUTHORIZED)
}
