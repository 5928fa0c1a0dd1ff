//! Response encoding.
//!
//! Every non-empty response is JSON with an explicit UTF-8 charset. Success
//! responses are built here; error responses come from
//! [`crate::error::ServiceError`], which reuses [`JsonBody`] and
//! [`MessageBody`].

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::PropertySet;

/// `Content-Type` of every JSON response.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

const ENCODE_FAILURE: &str = r#"{"message":"Failed to encode response"}"#;

/// Error body: `{"message": "..."}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageBody {
    /// Human-readable description of what went wrong.
    pub message: String,
}

/// JSON response body serialized with [`JSON_CONTENT_TYPE`].
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T: Serialize> IntoResponse for JsonBody<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => (
                [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
                bytes,
            )
                .into_response(),
            Err(error) => {
                tracing::error!(%error, "failed to encode response body");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
                    ENCODE_FAILURE,
                )
                    .into_response()
            }
        }
    }
}

/// `201 Created` with an empty body.
#[must_use]
pub fn created() -> Response {
    StatusCode::CREATED.into_response()
}

/// `200 OK` with an empty body.
#[must_use]
pub fn ok() -> Response {
    StatusCode::OK.into_response()
}

/// `200 OK` with the entries of `set` as a JSON object.
#[must_use]
pub fn property_set(set: PropertySet) -> Response {
    JsonBody(set.into_entries()).into_response()
}

/// `200 OK` with `names` as a JSON array.
#[must_use]
pub fn names(names: Vec<String>) -> Response {
    JsonBody(names).into_response()
}

/// A JSON `{"message": ...}` response with the given status.
#[must_use]
pub fn message(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        JsonBody(MessageBody {
            message: message.into(),
        }),
    )
        .into_response()
}
