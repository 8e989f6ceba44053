//! Route configuration and setup

use crate::auth::caller_middleware;
use crate::handlers;
use crate::state::{AppState, AuthState};
use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Json, Router,
};
use depot_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Server-wide cap on in-flight requests
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router<()> {
    let auth_state: AuthState = state.auth.clone();

    let upload_routes = Router::new()
        .route("/uploads", post(handlers::uploads::create_upload))
        .route("/uploads/lookup-urls", post(handlers::lookup::lookup_urls))
        .route(
            "/uploads/lookup-metadata",
            post(handlers::lookup::lookup_metadata),
        )
        .route(
            "/uploads/short-url/{short}",
            get(handlers::download::show_short_upload),
        )
        .route("/uploads/{site}/{key}", get(handlers::download::show_upload));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        );

    upload_routes
        .merge(public_routes)
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            caller_middleware,
        ))
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        // Multipart bodies are bounded by the layer below instead of axum's 2 MB default.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_request_body_bytes()))
        .layer(setup_cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Setup CORS configuration
fn setup_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
