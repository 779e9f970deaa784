// src/utils/admin.rs

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};

use crate::{config::Config, error::AppError};

/// Axum Middleware: Admin Authorization.
///
/// When `ADMIN_TOKEN` is configured, requires `Authorization: Bearer <token>`
/// and returns 401 otherwise. Without a configured token the route is open.
pub async fn admin_middleware(
    State(config): State<Config>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = config.admin_token.as_deref() else {
        return Ok(next.run(req).await);
    };

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match token {
        Some(token) if token == expected => Ok(next.run(req).await),
        _ => Err(AppError::AuthError("Invalid admin token".to_string())),
    }
}
