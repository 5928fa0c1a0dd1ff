//! Request decoding: property-set name and JSON body.
//!
//! Extraction never fails with a non-JSON rejection: anything axum would
//! reject on its own is turned into a [`ServiceError::BadRequest`].

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use crate::domain::{NameError, PropertySet, PropertySetName};
use crate::error::ServiceError;

/// Raw trailing path segment after `/properties/`, if the route has one.
#[derive(Debug, Clone, Default)]
pub struct RawName(pub Option<String>);

impl<S> FromRequestParts<S> for RawName
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<HashMap<String, String>>::from_request_parts(parts, state).await {
            Ok(Path(mut params)) => Ok(Self(params.remove("name"))),
            Err(PathRejection::MissingPathParams(_)) => Ok(Self(None)),
            Err(rejection) => Err(ServiceError::BadRequest(rejection.body_text())),
        }
    }
}

/// Resolves the property-set name of a request.
///
/// An absent or empty segment yields `None`.
///
/// # Errors
///
/// Returns [`ServiceError::BadRequest`] if the segment is not a valid name.
pub fn extract_name(raw: Option<&str>) -> Result<Option<PropertySetName>, ServiceError> {
    match raw {
        None | Some("") => Ok(None),
        Some(raw) => PropertySetName::parse(raw)
            .map(Some)
            .map_err(|e: NameError| ServiceError::BadRequest(e.to_string())),
    }
}

/// Resolves the name of a request that cannot do without one.
///
/// # Errors
///
/// Returns [`ServiceError::BadRequest`] with `"Missing property-set name"`
/// if there is no name, or the validation message if it is invalid.
pub fn require_name(raw: Option<&str>) -> Result<PropertySetName, ServiceError> {
    extract_name(raw)?.ok_or_else(ServiceError::missing_name)
}

/// Decodes a request body into a property set named `name`.
///
/// The body must be a JSON object whose values are all strings. `{}` is a
/// valid, empty set.
///
/// # Errors
///
/// Returns [`ServiceError::BadRequest`] if the body could not be read or is
/// not a JSON object of strings.
pub fn decode_body(
    name: PropertySetName,
    body: Result<Bytes, BytesRejection>,
) -> Result<PropertySet, ServiceError> {
    let body = body.map_err(|rejection| ServiceError::BadRequest(rejection.body_text()))?;
    PropertySet::from_json(name, &body).map_err(|e| ServiceError::BadRequest(e.to_string()))
}
