//! ZooKeeper-backed property store.
//!
//! Each property set is one persistent node at `{root}/{name}` whose payload
//! is a JSON object of its entries. Listing returns the immediate children
//! of the root. Every [`ZkStorageFactory::create`] call opens its own
//! ZooKeeper session; [`PropertiesStorage::close`] ends it.

use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use zookeeper::{Acl, CreateMode, WatchedEvent, Watcher, ZkError, ZkState, ZooKeeper};

use crate::domain::{PropertySet, PropertySetName};
use crate::error::StorageError;

use super::{PropertiesStorage, StorageFactory, node_path};

/// Factory that opens a new ZooKeeper session per call.
#[derive(Debug, Clone)]
pub struct ZkStorageFactory {
    connect_string: String,
    root_path: String,
    session_timeout: Duration,
}

impl ZkStorageFactory {
    /// Creates a factory for `connect_string` storing sets under `root_path`.
    #[must_use]
    pub fn new(
        connect_string: impl Into<String>,
        root_path: impl Into<String>,
        session_timeout: Duration,
    ) -> Self {
        Self {
            connect_string: connect_string.into(),
            root_path: root_path.into(),
            session_timeout,
        }
    }

    /// ZooKeeper connection string.
    #[must_use]
    pub fn connect_string(&self) -> &str {
        &self.connect_string
    }

    /// Parent path of all property-set nodes.
    #[must_use]
    pub fn root_path(&self) -> &str {
        &self.root_path
    }
}

impl StorageFactory for ZkStorageFactory {
    fn create(&self) -> Result<Box<dyn PropertiesStorage>, StorageError> {
        let zk = ZooKeeper::connect(&self.connect_string, self.session_timeout, SessionWatcher)
            .map_err(|e| self.connect_error(e))?;
        self.await_session(&zk)?;
        tracing::trace!(connect_string = %self.connect_string, "zookeeper session opened");
        Ok(Box::new(ZkPropertiesStorage {
            zk,
            root_path: self.root_path.clone(),
        }))
    }
}

impl ZkStorageFactory {
    /// Blocks until `zk` holds an established session, for at most the
    /// session timeout.
    ///
    /// The listener is registered right after `connect` returns, before the
    /// handshake round trip can complete.
    fn await_session(&self, zk: &ZooKeeper) -> Result<(), StorageError> {
        let (tx, rx) = mpsc::channel();
        let subscription = zk.add_listener(move |state| {
            tx.send(state).ok();
        });

        let deadline = Instant::now() + self.session_timeout;
        let outcome = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(ZkState::Connected | ZkState::ConnectedReadOnly) => break Ok(()),
                Ok(ZkState::AuthFailed) => break Err(self.connect_error("authentication failed")),
                Ok(ZkState::Closed) => break Err(self.connect_error("session closed")),
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                    break Err(self.connect_error("no session within the session timeout"));
                }
            }
        };
        zk.remove_listener(subscription);
        outcome
    }

    fn connect_error(&self, reason: impl fmt::Display) -> StorageError {
        StorageError::Connect(format!("{} ({reason})", self.connect_string))
    }
}

/// Logs session-level events; property sets are never watched.
struct SessionWatcher;

impl Watcher for SessionWatcher {
    fn handle(&self, event: WatchedEvent) {
        tracing::debug!(?event, "zookeeper event");
    }
}

struct ZkPropertiesStorage {
    zk: ZooKeeper,
    root_path: String,
}

impl fmt::Debug for ZkPropertiesStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZkPropertiesStorage")
            .field("root_path", &self.root_path)
            .finish_non_exhaustive()
    }
}

impl ZkPropertiesStorage {
    fn path_of(&self, name: &str) -> String {
        node_path(&self.root_path, name)
    }

    /// Creates the root and its ancestors if they are missing.
    fn ensure_root(&self) -> Result<(), StorageError> {
        for path in ancestors(&self.root_path) {
            if self.zk.exists(&path, false).map_err(driver(&path))?.is_some() {
                continue;
            }
            match self.zk.create(
                &path,
                Vec::new(),
                Acl::open_unsafe().clone(),
                CreateMode::Persistent,
            ) {
                Ok(_) => tracing::debug!(%path, "created root node"),
                Err(ZkError::NodeExists) => {}
                Err(e) => return Err(driver(&path)(e)),
            }
        }
        Ok(())
    }
}

impl PropertiesStorage for ZkPropertiesStorage {
    fn get(&self, name: &PropertySetName) -> Result<Option<PropertySet>, StorageError> {
        let path = self.path_of(name.as_str());
        let payload = match self.zk.get_data(&path, false) {
            Ok((payload, _stat)) => payload,
            Err(ZkError::NoNode) => return Ok(None),
            Err(e) => return Err(driver(&path)(e)),
        };
        if payload.is_empty() {
            return Ok(Some(PropertySet::new(name.clone())));
        }
        PropertySet::from_json(name.clone(), &payload)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                path,
                reason: e.to_string(),
            })
    }

    fn store(&self, set: &PropertySet) -> Result<(), StorageError> {
        let path = self.path_of(set.name().as_str());
        let payload = set.to_json().map_err(|e| StorageError::Corrupt {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        self.ensure_root()?;

        match self.zk.set_data(&path, payload.clone(), None) {
            Ok(_) => return Ok(()),
            Err(ZkError::NoNode) => {}
            Err(e) => return Err(driver(&path)(e)),
        }
        match self.zk.create(
            &path,
            payload.clone(),
            Acl::open_unsafe().clone(),
            CreateMode::Persistent,
        ) {
            Ok(_) => Ok(()),
            // Lost a race with a concurrent create.
            Err(ZkError::NodeExists) => self
                .zk
                .set_data(&path, payload, None)
                .map(|_| ())
                .map_err(driver(&path)),
            Err(e) => Err(driver(&path)(e)),
        }
    }

    fn delete(&self, name: &PropertySetName) -> Result<(), StorageError> {
        let path = self.path_of(name.as_str());
        match self.zk.delete(&path, None) {
            Ok(()) | Err(ZkError::NoNode) => Ok(()),
            Err(e) => Err(driver(&path)(e)),
        }
    }

    fn property_sets(&self) -> Result<Vec<String>, StorageError> {
        match self.zk.get_children(&self.root_path, false) {
            Ok(children) => Ok(children),
            Err(ZkError::NoNode) => Ok(Vec::new()),
            Err(e) => Err(driver(&self.root_path)(e)),
        }
    }

    fn close(self: Box<Self>) -> Result<(), StorageError> {
        // `ZooKeeper`'s own `Drop` ends the session and logs any failure.
        // Calling `ZooKeeper::close` first would end it twice.
        drop(self);
        Ok(())
    }
}

fn driver(path: &str) -> impl Fn(ZkError) -> StorageError + '_ {
    move |source| StorageError::Driver {
        path: path.to_string(),
        source,
    }
}

/// Every proper prefix path of `root`, shortest first, ending with `root`.
/// The ZooKeeper root `/` itself always exists and is skipped.
fn ancestors(root: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut current = String::new();
    for segment in root.split('/').filter(|s| !s.is_empty()) {
        current.push('/');
        current.push_str(segment);
        paths.push(current.clone());
    }
    paths
}
