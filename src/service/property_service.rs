//! Property service: the storage contract behind each HTTP verb.

use std::sync::Arc;

use crate::domain::{PropertySet, PropertySetName};
use crate::error::StorageError;
use crate::storage::{ScopedStorage, StorageFactory};

/// Orchestration layer for all property-set operations.
///
/// Holds only the shared [`StorageFactory`]. Every storage touch opens a
/// fresh [`ScopedStorage`], so a session never outlives the call that
/// needed it. All methods block until the store answers; async callers run
/// them on a blocking worker.
#[derive(Debug, Clone)]
pub struct PropertyService {
    factory: Arc<dyn StorageFactory>,
}

impl PropertyService {
    /// Creates a new `PropertyService`.
    #[must_use]
    pub fn new(factory: Arc<dyn StorageFactory>) -> Self {
        Self { factory }
    }

    fn session(&self) -> Result<ScopedStorage, StorageError> {
        ScopedStorage::open(self.factory.as_ref())
    }

    /// Stores `set`, replacing every entry previously stored under its name.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the session cannot be opened or the
    /// write fails.
    pub fn replace(&self, set: &PropertySet) -> Result<(), StorageError> {
        tracing::debug!(name = %set.name(), entries = set.len(), "replacing property set");
        self.session()?.store(set)
    }

    /// Merges `update` into the stored set.
    ///
    /// Keys present in `update` overwrite stored values; stored keys it
    /// omits are kept. A missing set is treated as empty. The read and the
    /// write use separate sessions and are not atomic: concurrent merges on
    /// the same name may lose updates.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if either session cannot be opened, or the
    /// read or the write fails.
    pub fn merge(&self, update: PropertySet) -> Result<(), StorageError> {
        let existing = self.session()?.get(update.name())?;
        let mut merged = existing.unwrap_or_else(|| PropertySet::new(update.name().clone()));
        merged.merge(update);
        tracing::debug!(name = %merged.name(), entries = merged.len(), "merging property set");
        self.session()?.store(&merged)
    }

    /// Fetches the set stored under `name`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the session cannot be opened or the
    /// read fails.
    pub fn fetch(&self, name: &PropertySetName) -> Result<Option<PropertySet>, StorageError> {
        tracing::debug!(%name, "fetching property set");
        self.session()?.get(name)
    }

    /// Lists the names of all stored sets, sorted.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the session cannot be opened or the
    /// listing fails.
    pub fn list(&self) -> Result<Vec<String>, StorageError> {
        tracing::debug!("listing property sets");
        let mut names = self.session()?.property_sets()?;
        names.sort_unstable();
        Ok(names)
    }

    /// Deletes the set stored under `name`. Deleting a missing set succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the session cannot be opened or the
    /// delete fails.
    pub fn remove(&self, name: &PropertySetName) -> Result<(), StorageError> {
        tracing::debug!(%name, "deleting property set");
        self.session()?.delete(name)
    }
}
