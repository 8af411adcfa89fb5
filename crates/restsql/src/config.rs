//! Database configuration.
//!
//! Loaded from a JSON file (the service's own config file, whose unrelated
//! keys are ignored) or from the environment.
//!
//! ```json
//! {
//!     "ListenAddress": ":8080",
//!     "ConnectionString": "postgres://gondul@localhost/gondul",
//!     "Driver": "postgres",
//!     "StatementTimeoutMs": 5000
//! }
//! ```

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default upper bound on pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 16;

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

/// How to reach the database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DbConfig {
    #[serde(alias = "ConnectionString")]
    pub connection_string: String,

    #[serde(default, alias = "Driver")]
    pub driver: Dialect,

    #[serde(default = "default_max_connections", alias = "MaxConnections")]
    pub max_connections: usize,

    /// Per-statement deadline; `None` waits forever.
    #[serde(default, alias = "StatementTimeoutMs")]
    pub statement_timeout_ms: Option<u64>,
}

impl DbConfig {
    pub fn new(connection_string: impl Into<String>, driver: Dialect) -> Self {
        Self {
            connection_string: connection_string.into(),
            driver,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            statement_timeout_ms: None,
        }
    }

    /// In-memory SQLite, mostly for tests and demos.
    pub fn sqlite_memory() -> Self {
        Self::new("sqlite::memory:", Dialect::Sqlite)
    }

    pub fn max_connections(mut self, n: usize) -> Self {
        self.max_connections = n;
        self
    }

    pub fn statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.statement_timeout_ms.map(Duration::from_millis)
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        let config = Self::from_json(&data)?;
        tracing::debug!(
            target: "restsql.sql",
            path = %path.display(),
            driver = %config.driver,
            "parsed config file"
        );
        Ok(config)
    }

    /// `DATABASE_URL` (required), `DATABASE_DRIVER`, `DATABASE_MAX_CONNECTIONS`
    /// and `DATABASE_STATEMENT_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".to_string()))?;
        let driver = match std::env::var("DATABASE_DRIVER") {
            Ok(name) => name.parse()?,
            Err(_) => Dialect::default(),
        };
        let mut config = Self::new(url, driver);
        if let Ok(n) = std::env::var("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = n
                .parse()
                .map_err(|e| Error::Config(format!("DATABASE_MAX_CONNECTIONS: {e}")))?;
        }
        if let Ok(ms) = std::env::var("DATABASE_STATEMENT_TIMEOUT_MS") {
            config.statement_timeout_ms = Some(
                ms.parse()
                    .map_err(|e| Error::Config(format!("DATABASE_STATEMENT_TIMEOUT_MS: {e}")))?,
            );
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.connection_string.trim().is_empty() {
            return Err(Error::Config("connection string is empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(Error::Config("max_connections must be at least 1".to_string()));
        }
        Ok(())
    }
}
