use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Middleware is applied in outer-to-inner order (outermost runs first on
/// request, last on response):
///
/// 1. `CorsLayer`: the plugin calls us from arbitrary WordPress admin pages.
/// 2. `TraceLayer`: structured request/response logging via `tracing`.
/// 3. `DefaultBodyLimit`: sized for base64 images (4/3 of the raw limit plus
///    JSON overhead).
///
/// `/freemius/webhook` takes the raw body; its signature covers the exact
/// bytes sent, so it must not go through a JSON extractor.
pub fn build_app(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_image_bytes.saturating_mul(2).max(64 * 1024);

    Router::new()
        .route("/", get(routes::health::health))
        .route("/usage", post(routes::usage::usage))
        .route("/optimize/image", post(routes::optimize::optimize_image))
        .route("/admin/create-license", post(routes::admin::create_license))
        .route("/admin/list-licenses", post(routes::admin::list_licenses))
        .route("/admin/reset-license", post(routes::admin::reset_license))
        .route("/freemius/webhook", post(routes::webhook::freemius_webhook))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
