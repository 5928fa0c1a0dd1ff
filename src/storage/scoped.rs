//! One-shot storage sessions.
//!
//! [`ScopedStorage`] owns a session obtained from a [`StorageFactory`]. Each
//! operation consumes the wrapper, so a session serves exactly one call, and
//! the session is released right after that call returns. `Drop` releases it
//! too, which covers early returns and unwinding. Release failures are logged
//! and swallowed so they never replace the outcome of the operation.

use crate::domain::{PropertySet, PropertySetName};
use crate::error::StorageError;

use super::{PropertiesStorage, StorageFactory};

/// A storage session valid for exactly one operation.
#[derive(Debug)]
pub struct ScopedStorage {
    session: Option<Box<dyn PropertiesStorage>>,
}

impl ScopedStorage {
    /// Opens a fresh session from `factory`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the factory cannot create a session.
    pub fn open(factory: &dyn StorageFactory) -> Result<Self, StorageError> {
        let session = factory.create()?;
        Ok(Self::new(session))
    }

    /// Wraps an already opened session.
    #[must_use]
    pub fn new(session: Box<dyn PropertiesStorage>) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Fetches a set, then releases the session.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the fetch fails.
    pub fn get(self, name: &PropertySetName) -> Result<Option<PropertySet>, StorageError> {
        self.invoke(|storage| storage.get(name))
    }

    /// Stores a set, then releases the session.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the write fails.
    pub fn store(self, set: &PropertySet) -> Result<(), StorageError> {
        self.invoke(|storage| storage.store(set))
    }

    /// Deletes a set, then releases the session.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the delete fails.
    pub fn delete(self, name: &PropertySetName) -> Result<(), StorageError> {
        self.invoke(|storage| storage.delete(name))
    }

    /// Lists stored set names, then releases the session.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the listing fails.
    pub fn property_sets(self) -> Result<Vec<String>, StorageError> {
        self.invoke(|storage| storage.property_sets())
    }

    /// Releases the session without using it.
    pub fn close(mut self) {
        self.release();
    }

    fn invoke<R>(
        mut self,
        op: impl FnOnce(&dyn PropertiesStorage) -> Result<R, StorageError>,
    ) -> Result<R, StorageError> {
        let result = match self.session.as_deref() {
            Some(storage) => op(storage),
            None => Err(StorageError::Closed),
        };
        self.release();
        result
    }

    fn release(&mut self) {
        if let Some(session) = self.session.take()
            && let Err(error) = session.close()
        {
            tracing::warn!(%error, "failed to close storage session");
        }
    }
}

impl Drop for ScopedStorage {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::storage::MemoryStorageFactory;

    fn name(raw: &str) -> PropertySetName {
        let Ok(name) = PropertySetName::parse(raw) else {
            panic!("valid name");
        };
        name
    }

    fn open(factory: &MemoryStorageFactory) -> ScopedStorage {
        let Ok(scoped) = ScopedStorage::open(factory) else {
            panic!("memory factory never fails to connect");
        };
        scoped
    }

    #[test]
    fn each_operation_releases_its_session() {
        let factory = MemoryStorageFactory::new();
        let mut set = PropertySet::new(name("db"));
        set.set("host", "h1");

        assert!(open(&factory).store(&set).is_ok());
        assert!(matches!(open(&factory).get(&name("db")), Ok(Some(_))));
        assert!(open(&factory).property_sets().is_ok());
        assert!(open(&factory).delete(&name("db")).is_ok());

        assert_eq!(factory.opened(), 4);
        assert_eq!(factory.closed(), 4);
    }

    #[test]
    fn failed_operation_still_releases() {
        let factory = MemoryStorageFactory::new();
        let scoped = open(&factory);
        factory.set_failing(true);

        assert!(scoped.get(&name("db")).is_err());
        assert_eq!(factory.opened(), 1);
        assert_eq!(factory.closed(), 1);
    }

    #[test]
    fn explicit_close_releases_once() {
        let factory = MemoryStorageFactory::new();
        open(&factory).close();
        assert_eq!(factory.closed(), 1);
    }

    #[test]
    fn dropping_unused_session_releases() {
        let factory = MemoryStorageFactory::new();
        {
            let _scoped = open(&factory);
        }
        assert_eq!(factory.opened(), 1);
        assert_eq!(factory.closed(), 1);
    }

    #[test]
    fn panic_inside_operation_releases() {
        let factory = MemoryStorageFactory::new();
        let scoped = open(&factory);

        let outcome = catch_unwind(AssertUnwindSafe(move || {
            scoped.invoke(|_| -> Result<(), StorageError> { panic!("encoder blew up") })
        }));

        assert!(outcome.is_err());
        assert_eq!(factory.closed(), 1);
    }

    #[test]
    fn close_failure_does_not_mask_result() {
        let factory = MemoryStorageFactory::new();
        let scoped = open(&factory);
        factory.set_failing_close(true);

        let result = scoped.property_sets();
        assert!(matches!(result, Ok(ref names) if names.is_empty()));
        assert_eq!(factory.closed(), 1);
    }
}
