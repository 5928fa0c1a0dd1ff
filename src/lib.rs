//! # zk-properties
//!
//! RESTful interface for managing property sets stored in ZooKeeper.
//!
//! A property set is a flat mapping from string keys to string values,
//! stored as one ZooKeeper node under a configurable root. Clients create,
//! merge, fetch, list and delete sets over HTTP with JSON payloads.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── PropertyService (service/)
//!     │
//!     ├── ScopedStorage, one operation per session (storage/)
//!     ├── StorageFactory
//!     │
//!     └── ZooKeeper ensemble, or process memory
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod service;
pub mod storage;
