//! In-process property store.
//!
//! [`MemoryStorageFactory`] keeps node payloads in a shared map and hands out
//! sessions with the same semantics as the ZooKeeper backend: payloads are
//! JSON objects of strings, deletes of missing sets succeed, and a missing
//! set reads as `None`. It counts sessions opened and released, and can be
//! switched into failure modes, which makes it the backend of choice for
//! tests and for running the service without an ensemble.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::domain::{PropertySet, PropertySetName};
use crate::error::StorageError;

use super::{PropertiesStorage, StorageFactory};

#[derive(Debug, Default)]
struct Shared {
    nodes: RwLock<BTreeMap<String, Vec<u8>>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    unreachable: AtomicBool,
    failing: AtomicBool,
    failing_close: AtomicBool,
}

impl Shared {
    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("injected failure".to_string()));
        }
        Ok(())
    }
}

/// Factory for sessions over a shared in-memory map.
///
/// Clones share the same nodes and counters.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageFactory {
    shared: Arc<Shared>,
}

impl MemoryStorageFactory {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions created so far.
    #[must_use]
    pub fn opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    /// Number of sessions released so far, including failed releases.
    #[must_use]
    pub fn closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Makes [`StorageFactory::create`] fail while `true`.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.shared.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Makes every session operation fail while `true`.
    pub fn set_failing(&self, failing: bool) {
        self.shared.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes session release fail while `true`.
    pub fn set_failing_close(&self, failing: bool) {
        self.shared.failing_close.store(failing, Ordering::SeqCst);
    }

    /// Writes a raw node payload, bypassing validation.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the map lock is poisoned.
    pub fn insert_raw(&self, name: &str, payload: &[u8]) -> Result<(), StorageError> {
        let mut nodes = self.shared.nodes.write().map_err(poisoned)?;
        nodes.insert(name.to_string(), payload.to_vec());
        Ok(())
    }
}

impl StorageFactory for MemoryStorageFactory {
    fn create(&self) -> Result<Box<dyn PropertiesStorage>, StorageError> {
        if self.shared.unreachable.load(Ordering::SeqCst) {
            return Err(StorageError::Connect("memory store".to_string()));
        }
        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            shared: Arc::clone(&self.shared),
        }))
    }
}

#[derive(Debug)]
struct MemorySession {
    shared: Arc<Shared>,
}

impl PropertiesStorage for MemorySession {
    fn get(&self, name: &PropertySetName) -> Result<Option<PropertySet>, StorageError> {
        self.shared.check()?;
        let nodes = self.shared.nodes.read().map_err(poisoned)?;
        let Some(payload) = nodes.get(name.as_str()) else {
            return Ok(None);
        };
        if payload.is_empty() {
            return Ok(Some(PropertySet::new(name.clone())));
        }
        PropertySet::from_json(name.clone(), payload)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                path: name.to_string(),
                reason: e.to_string(),
            })
    }

    fn store(&self, set: &PropertySet) -> Result<(), StorageError> {
        self.shared.check()?;
        let payload = set.to_json().map_err(|e| StorageError::Corrupt {
            path: set.name().to_string(),
            reason: e.to_string(),
        })?;
        let mut nodes = self.shared.nodes.write().map_err(poisoned)?;
        nodes.insert(set.name().to_string(), payload);
        Ok(())
    }

    fn delete(&self, name: &PropertySetName) -> Result<(), StorageError> {
        self.shared.check()?;
        let mut nodes = self.shared.nodes.write().map_err(poisoned)?;
        nodes.remove(name.as_str());
        Ok(())
    }

    fn property_sets(&self) -> Result<Vec<String>, StorageError> {
        self.shared.check()?;
        let nodes = self.shared.nodes.read().map_err(poisoned)?;
        Ok(nodes.keys().cloned().collect())
    }

    fn close(self: Box<Self>) -> Result<(), StorageError> {
        self.shared.closed.fetch_add(1, Ordering::SeqCst);
        if self.shared.failing_close.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("injected close failure".to_string()));
        }
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Backend("memory store lock poisoned".to_string())
}
