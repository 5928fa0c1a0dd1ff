//! Error types with HTTP status code mapping.
//!
//! [`StorageError`] is produced by the storage layer (factory, sessions and
//! the drivers behind them). [`ServiceError`] is the outcome a request handler
//! returns: it is the single place where client mistakes, missing property
//! sets and storage failures collapse into an HTTP status and a
//! `{"message": ...}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::api::response::{JsonBody, MessageBody};

/// Message returned when a requested property set does not exist.
pub const NO_SUCH_PROPERTY_SET: &str = "No such property set";

/// Message returned when a mutating request carries no property-set name.
pub const MISSING_NAME: &str = "Missing property-set name";

/// Failure raised by a storage factory or a storage session.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A session to the coordination store could not be established.
    #[error("unable to connect to {0}")]
    Connect(String),

    /// The ZooKeeper driver rejected an operation on `path`.
    #[error("zookeeper error on {path}: {source}")]
    Driver {
        /// Node path the operation targeted.
        path: String,
        /// Error reported by the driver.
        #[source]
        source: zookeeper::ZkError,
    },

    /// A stored node does not hold a JSON object of strings.
    #[error("corrupt property set at {path}: {reason}")]
    Corrupt {
        /// Node path holding the bad payload.
        path: String,
        /// What was wrong with the payload.
        reason: String,
    },

    /// Any other failure reported by a non-ZooKeeper backend.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The session was already released when an operation was attempted.
    #[error("storage session already closed")]
    Closed,

    /// The blocking worker running the storage call failed.
    #[error("storage worker failed: {0}")]
    Worker(String),
}

/// Outcome of a request that did not succeed.
///
/// | Variant      | HTTP Status               |
/// |--------------|---------------------------|
/// | `BadRequest` | 400 Bad Request           |
/// | `NotFound`   | 404 Not Found             |
/// | `Storage`    | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The client sent a request that cannot be served as is.
    #[error("{0}")]
    BadRequest(String),

    /// The requested property set does not exist.
    #[error("{}", NO_SUCH_PROPERTY_SET)]
    NotFound,

    /// The storage layer failed.
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Shorthand for the 400 returned when no name was given.
    #[must_use]
    pub fn missing_name() -> Self {
        Self::BadRequest(MISSING_NAME.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::Storage(source) => tracing::error!(error = ?source, "storage operation failed"),
            Self::BadRequest(message) => tracing::debug!(%message, "rejected request"),
            Self::NotFound => {}
        }
        let body = MessageBody {
            message: self.to_string(),
        };
        (status, JsonBody(body)).into_response()
    }
}
