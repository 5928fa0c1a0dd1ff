//! Service layer: business logic orchestration.
//!
//! [`PropertyService`] implements the storage contract of each HTTP verb
//! on top of the scoped sessions in [`crate::storage`].

pub mod property_service;

pub use property_service::PropertyService;
