//! Storage layer: sessions against the coordination store.
//!
//! A [`StorageFactory`] yields fresh [`PropertiesStorage`] sessions and holds
//! no connection of its own. Handlers never touch sessions directly; they go
//! through [`ScopedStorage`], which allows exactly one operation per session
//! and releases it on every exit path.
//!
//! Two backends implement the traits: [`ZkStorageFactory`] talks to a
//! ZooKeeper ensemble, [`MemoryStorageFactory`] keeps nodes in process.

use std::fmt;

use crate::domain::{PropertySet, PropertySetName};
use crate::error::StorageError;

pub mod memory;
pub mod scoped;
pub mod zk;

pub use memory::MemoryStorageFactory;
pub use scoped::ScopedStorage;
pub use zk::ZkStorageFactory;

/// A raw session against the property store.
///
/// Implementations are not required to survive more than one call; callers
/// wrap them in [`ScopedStorage`].
pub trait PropertiesStorage: Send + fmt::Debug {
    /// Fetches the set stored under `name`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the store fails or the stored payload
    /// is not a JSON object of strings.
    fn get(&self, name: &PropertySetName) -> Result<Option<PropertySet>, StorageError>;

    /// Creates or fully replaces the stored set.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the store fails.
    fn store(&self, set: &PropertySet) -> Result<(), StorageError>;

    /// Removes the set stored under `name`. Removing a missing set succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the store fails.
    fn delete(&self, name: &PropertySetName) -> Result<(), StorageError>;

    /// Lists the names of all stored sets, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the store fails.
    fn property_sets(&self) -> Result<Vec<String>, StorageError>;

    /// Releases the session. Taking the session by value means it can be
    /// released only once.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the driver fails to release it.
    fn close(self: Box<Self>) -> Result<(), StorageError>;
}

/// Producer of fresh storage sessions.
pub trait StorageFactory: Send + Sync + fmt::Debug {
    /// Opens a new session.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if no session can be established.
    fn create(&self) -> Result<Box<dyn PropertiesStorage>, StorageError>;
}

/// Joins `root` and `name` into a node path with exactly one separator.
#[must_use]
pub fn node_path(root: &str, name: &str) -> String {
    let root = root.trim_end_matches('/');
    format!("{root}/{name}")
}
