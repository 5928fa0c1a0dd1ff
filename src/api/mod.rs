//! REST API layer: route handlers, request decoding, response encoding and
//! router composition.
//!
//! Property sets are mounted under `/properties`.

pub mod handlers;
pub mod openapi;
pub mod request;
pub mod response;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
///
/// Unknown paths and unsupported methods answer with a JSON message.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .merge(handlers::routes())
        .route(openapi::OPENAPI_PATH, get(handlers::system::openapi_handler));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .config(utoipa_swagger_ui::Config::new([openapi::OPENAPI_PATH])),
    );

    router
        .fallback(handlers::system::not_found)
        .method_not_allowed_fallback(handlers::system::method_not_allowed)
}

/// Builds the servable application: the API router with tracing, CORS and
/// a per-request timeout, bound to `state`.
///
/// A request that outlives `request_timeout` is answered with a JSON 408.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    build_router()
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(middleware::map_response(handlers::system::timed_out))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
