//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use crate::api::handlers::{properties, system};
use crate::api::response::MessageBody;

/// Path the OpenAPI document is served at.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// OpenAPI description of every endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "zk-properties",
        description = "RESTful interface for managing properties stored in ZooKeeper"
    ),
    paths(
        properties::list_property_sets,
        properties::get_property_set,
        properties::put_property_set,
        properties::post_property_set,
        properties::delete_property_set,
        system::health_handler,
    ),
    components(schemas(MessageBody, system::HealthResponse)),
    tags(
        (name = "Properties", description = "Property-set management"),
        (name = "System", description = "Service health"),
    )
)]
pub struct ApiDoc;

/// Builds the OpenAPI document.
#[must_use]
pub fn document() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
