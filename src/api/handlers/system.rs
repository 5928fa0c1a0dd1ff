//! System endpoints: health check, OpenAPI document and JSON fallbacks.

use axum::Router;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::response::{self, JsonBody};
use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
///
/// Never touches storage.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    JsonBody(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api-docs/openapi.json` — the OpenAPI document.
pub async fn openapi_handler() -> impl IntoResponse {
    JsonBody(crate::api::openapi::document())
}

/// Fallback for paths no route matches.
pub async fn not_found() -> Response {
    response::message(StatusCode::NOT_FOUND, "Not found")
}

/// Fallback for known paths hit with an unsupported method.
pub async fn method_not_allowed() -> Response {
    response::message(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Gives the bodiless 408 of the timeout layer a JSON message.
pub async fn timed_out(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT
        && !response.headers().contains_key(header::CONTENT_TYPE)
    {
        return response::message(StatusCode::REQUEST_TIMEOUT, "Request timed out");
    }
    response
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
