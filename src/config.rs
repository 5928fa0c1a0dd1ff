//! Service configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).
//!
//! | Variable                | Default          |
//! |-------------------------|------------------|
//! | `LISTEN_ADDR`           | `0.0.0.0:8080`   |
//! | `ZK_CONNECT_STRING`     | `localhost:2181` |
//! | `ZK_ROOT_PATH`          | `/`              |
//! | `ZK_SESSION_TIMEOUT_MS` | `10000`          |
//! | `REQUEST_TIMEOUT_SECS`  | `30`             |
//! | `LOG_FORMAT`            | `pretty`         |
//! | `STORAGE_BACKEND`       | `zookeeper`      |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Invalid configuration value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `LISTEN_ADDR` is not a socket address.
    #[error("invalid LISTEN_ADDR {value:?}: {source}")]
    ListenAddr {
        /// Raw value.
        value: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },

    /// `ZK_CONNECT_STRING` is empty.
    #[error("ZK_CONNECT_STRING must not be empty")]
    EmptyConnectString,

    /// `ZK_ROOT_PATH` is not an absolute node path.
    #[error("invalid ZK_ROOT_PATH {0:?}: must start with '/' and contain no empty segments")]
    RootPath(String),

    /// A variable holds a value outside its allowed set.
    #[error("invalid {key} {value:?}: expected one of {expected}")]
    Choice {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Accepted values.
        expected: &'static str,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable compact lines.
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::Choice {
                key: "LOG_FORMAT",
                value: s.to_string(),
                expected: "pretty, json",
            }),
        }
    }
}

/// Where property sets are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// A ZooKeeper ensemble.
    ZooKeeper,
    /// Process memory; contents are lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zookeeper" | "zk" => Ok(Self::ZooKeeper),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Choice {
                key: "STORAGE_BACKEND",
                value: s.to_string(),
                expected: "zookeeper, memory",
            }),
        }
    }
}

/// Top-level service configuration.
///
/// Loaded once at startup via [`ServiceConfig::from_env`] and never mutated.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Socket address to bind the HTTP server to.
    pub listen_addr: SocketAddr,

    /// ZooKeeper connection string (`host:port[,host:port...]`).
    pub connect_string: String,

    /// Parent node of all property sets, normalized without trailing `/`.
    pub root_path: String,

    /// ZooKeeper session timeout.
    pub session_timeout: Duration,

    /// Upper bound on handling a single HTTP request.
    pub request_timeout: Duration,

    /// Log output format.
    pub log_format: LogFormat,

    /// Storage backend.
    pub storage_backend: StorageBackend,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            connect_string: "localhost:2181".to_string(),
            root_path: "/".to_string(),
            session_timeout: Duration::from_millis(10_000),
            request_timeout: Duration::from_secs(30),
            log_format: LogFormat::Pretty,
            storage_backend: StorageBackend::ZooKeeper,
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set. Numeric values
    /// that fail to parse also fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the listen address, connect string,
    /// root path, log format or storage backend is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`ServiceConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let listen_addr = match lookup("LISTEN_ADDR") {
            Some(value) => value
                .parse()
                .map_err(|source| ConfigError::ListenAddr { value, source })?,
            None => defaults.listen_addr,
        };

        let connect_string = lookup("ZK_CONNECT_STRING")
            .map(|s| s.trim().to_string())
            .unwrap_or(defaults.connect_string);
        if connect_string.is_empty() {
            return Err(ConfigError::EmptyConnectString);
        }

        let root_path = match lookup("ZK_ROOT_PATH") {
            Some(raw) => normalize_root_path(&raw)?,
            None => defaults.root_path,
        };

        let session_timeout = parse_or(&lookup, "ZK_SESSION_TIMEOUT_MS")
            .map_or(defaults.session_timeout, Duration::from_millis);
        let request_timeout = parse_or(&lookup, "REQUEST_TIMEOUT_SECS")
            .map_or(defaults.request_timeout, Duration::from_secs);

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => defaults.log_format,
        };
        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.storage_backend,
        };

        Ok(Self {
            listen_addr,
            connect_string,
            root_path,
            session_timeout,
            request_timeout,
            log_format,
            storage_backend,
        })
    }
}

/// Parses a variable as `T`, returning `None` on missing or invalid values.
fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

/// Validates a root node path and strips a trailing `/`.
///
/// # Errors
///
/// Returns [`ConfigError::RootPath`] unless the path is absolute with no
/// empty segments.
pub fn normalize_root_path(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('/') {
        return Err(ConfigError::RootPath(raw.to_string()));
    }
    if trimmed == "/" {
        return Ok(trimmed.to_string());
    }
    let body = trimmed.trim_end_matches('/');
    if body.is_empty() || body.split('/').skip(1).any(str::is_empty) {
        return Err(ConfigError::RootPath(raw.to_string()));
    }
    Ok(body.to_string())
}
