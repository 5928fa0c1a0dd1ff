//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::PropertyService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Property service for all storage operations.
    pub property_service: Arc<PropertyService>,
}

impl AppState {
    /// Wraps a service in shared state.
    #[must_use]
    pub fn new(property_service: PropertyService) -> Self {
        Self {
            property_service: Arc::new(property_service),
        }
    }
}
