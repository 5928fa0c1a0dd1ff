//! Property-set handlers: list, get, put, merge, delete.
//!
//! Each handler resolves the name, decodes the body where there is one,
//! then runs the blocking [`PropertyService`](crate::service::PropertyService)
//! call on a worker thread. If the client goes away mid-request the worker
//! still finishes and its session is still released.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::response::Response;
use axum::routing::get;

use crate::api::request::{self, RawName};
use crate::api::response::{self, MessageBody};
use crate::app_state::AppState;
use crate::error::{ServiceError, StorageError};
use crate::service::PropertyService;

/// Runs a blocking service call off the async runtime.
async fn run_blocking<T, F>(state: &AppState, op: F) -> Result<T, StorageError>
where
    T: Send + 'static,
    F: FnOnce(&PropertyService) -> Result<T, StorageError> + Send + 'static,
{
    let service = Arc::clone(&state.property_service);
    tokio::task::spawn_blocking(move || op(service.as_ref()))
        .await
        .map_err(|error| {
            tracing::error!(%error, "storage worker did not complete");
            let outcome = if error.is_panic() { "panicked" } else { "cancelled" };
            StorageError::Worker(outcome.to_string())
        })?
}

/// `GET /properties/` and `GET /properties/{name}`.
///
/// Without a name, lists all property-set names; with one, returns the
/// entries of that set.
///
/// # Errors
///
/// Returns [`ServiceError::NotFound`] if the named set does not exist,
/// [`ServiceError::BadRequest`] for an invalid name and
/// [`ServiceError::Storage`] on storage failure.
#[utoipa::path(
    get,
    path = "/properties/{name}",
    tag = "Properties",
    summary = "Get a property set",
    description = "Returns the entries of the named property set as a JSON object. `GET /properties/` lists the names of all property sets instead.",
    params(
        ("name" = String, Path, description = "Property-set name"),
    ),
    responses(
        (status = 200, description = "Entries of the property set", body = std::collections::HashMap<String, String>),
        (status = 404, description = "No such property set", body = MessageBody),
        (status = 500, description = "Storage failure", body = MessageBody),
    )
)]
pub async fn get_property_set(
    State(state): State<AppState>,
    RawName(raw): RawName,
) -> Result<Response, ServiceError> {
    let Some(name) = request::extract_name(raw.as_deref())? else {
        return list_property_sets(State(state)).await;
    };

    let set = run_blocking(&state, move |service| service.fetch(&name)).await?;
    set.map(response::property_set).ok_or(ServiceError::NotFound)
}

/// `GET /properties/` — list property-set names.
///
/// # Errors
///
/// Returns [`ServiceError::Storage`] on storage failure.
#[utoipa::path(
    get,
    path = "/properties/",
    tag = "Properties",
    summary = "List property sets",
    description = "Returns the names of all property sets stored under the root path.",
    responses(
        (status = 200, description = "Property-set names", body = Vec<String>),
        (status = 500, description = "Storage failure", body = MessageBody),
    )
)]
pub async fn list_property_sets(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let names = run_blocking(&state, PropertyService::list).await?;
    Ok(response::names(names))
}

/// `PUT /properties/{name}` — replace a property set.
///
/// # Errors
///
/// Returns [`ServiceError::BadRequest`] for a missing or invalid name or
/// body and [`ServiceError::Storage`] on storage failure.
#[utoipa::path(
    put,
    path = "/properties/{name}",
    tag = "Properties",
    summary = "Replace a property set",
    description = "Stores the body as the complete property set. Keys not present in the body are removed.",
    params(
        ("name" = String, Path, description = "Property-set name"),
    ),
    request_body(content = std::collections::HashMap<String, String>, description = "JSON object of string values", content_type = "application/json"),
    responses(
        (status = 201, description = "Property set stored"),
        (status = 400, description = "Missing name or invalid body", body = MessageBody),
        (status = 500, description = "Storage failure", body = MessageBody),
    )
)]
pub async fn put_property_set(
    State(state): State<AppState>,
    RawName(raw): RawName,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ServiceError> {
    let name = request::require_name(raw.as_deref())?;
    let set = request::decode_body(name, body)?;
    run_blocking(&state, move |service| service.replace(&set)).await?;
    Ok(response::created())
}

/// `POST /properties/{name}` — merge into a property set.
///
/// # Errors
///
/// Returns [`ServiceError::BadRequest`] for a missing or invalid name or
/// body and [`ServiceError::Storage`] on storage failure.
#[utoipa::path(
    post,
    path = "/properties/{name}",
    tag = "Properties",
    summary = "Merge into a property set",
    description = "Overwrites the given keys of the property set and keeps the others. Creates the set if it does not exist. The read and the write are not atomic.",
    params(
        ("name" = String, Path, description = "Property-set name"),
    ),
    request_body(content = std::collections::HashMap<String, String>, description = "JSON object of string values", content_type = "application/json"),
    responses(
        (status = 201, description = "Property set updated"),
        (status = 400, description = "Missing name or invalid body", body = MessageBody),
        (status = 500, description = "Storage failure", body = MessageBody),
    )
)]
pub async fn post_property_set(
    State(state): State<AppState>,
    RawName(raw): RawName,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ServiceError> {
    let name = request::require_name(raw.as_deref())?;
    let update = request::decode_body(name, body)?;
    run_blocking(&state, move |service| service.merge(update)).await?;
    Ok(response::created())
}

/// `DELETE /properties/{name}` — remove a property set.
///
/// # Errors
///
/// Returns [`ServiceError::BadRequest`] for a missing or invalid name and
/// [`ServiceError::Storage`] on storage failure.
#[utoipa::path(
    delete,
    path = "/properties/{name}",
    tag = "Properties",
    summary = "Delete a property set",
    description = "Removes the property set. Deleting a set that does not exist succeeds.",
    params(
        ("name" = String, Path, description = "Property-set name"),
    ),
    responses(
        (status = 200, description = "Property set removed"),
        (status = 400, description = "Missing property-set name", body = MessageBody),
        (status = 500, description = "Storage failure", body = MessageBody),
    )
)]
pub async fn delete_property_set(
    State(state): State<AppState>,
    RawName(raw): RawName,
) -> Result<Response, ServiceError> {
    let name = request::require_name(raw.as_deref())?;
    run_blocking(&state, move |service| service.remove(&name)).await?;
    Ok(response::ok())
}

/// Property-set routes. The bare prefix (with or without a trailing `/`)
/// carries no name.
pub fn routes() -> Router<AppState> {
    let handlers = || {
        get(get_property_set)
            .put(put_property_set)
            .post(post_property_set)
            .delete(delete_property_set)
    };
    Router::new()
        .route("/properties", handlers())
        .route("/properties/", handlers())
        .route("/properties/{*name}", handlers())
}
