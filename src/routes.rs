// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{live, scores, status},
    state::AppState,
    utils::admin::admin_middleware,
};

/// Assembles the main application router.
///
/// * Public routes: submission, status check, live updates, health.
/// * Admin routes (export, clear) behind the optional bearer token.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&state.config.allowed_origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let admin_state = state.clone();
    let admin = || middleware::from_fn_with_state(admin_state.clone(), admin_middleware);

    Router::new()
        // Export and clear are admin-only; submission stays public.
        .route(
            "/scores",
            get(scores::list_scores)
                .route_layer(admin())
                .post(scores::submit_score),
        )
        .route(
            "/clear-scores",
            post(scores::clear_scores).route_layer(admin()),
        )
        .route("/quiz-status/{name}", get(status::quiz_status))
        .route("/ws", get(live::live_updates))
        .route("/health", get(status::health))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// A `*` entry allows any origin; otherwise only the listed ones.
fn allowed_origins(configured: &[String]) -> AllowOrigin {
    if configured.iter().any(|origin| origin == "*") {
        return AllowOrigin::any();
    }

    let origins: Vec<HeaderValue> = configured
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    AllowOrigin::list(origins)
}
