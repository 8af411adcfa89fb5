//! The database handle.

use crate::client::{Executor, Row};
use crate::config::DbConfig;
use crate::dialect::Dialect;
use crate::error::{Error, Result, StorageError};
use crate::value::Value;
#[cfg(feature = "postgres")]
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[cfg(feature = "postgres")]
use crate::postgres::PostgresBackend;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteBackend;

enum Backend {
    #[cfg(feature = "postgres")]
    Postgres(PostgresBackend),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteBackend),
}

/// Bound a pooled statement by `limit`. Dropping the future returns the
/// connection to the pool.
#[cfg(feature = "postgres")]
async fn deadline<T>(limit: Option<Duration>, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| StorageError::Timeout(limit))?,
        None => fut.await,
    }
}

impl Backend {
    async fn open(config: &DbConfig) -> Result<Self> {
        match config.driver {
            #[cfg(feature = "postgres")]
            Dialect::Postgres => {
                let pool = crate::pool::create_pool_from(config)?;
                Ok(Backend::Postgres(PostgresBackend::new(pool)))
            }
            #[cfg(feature = "sqlite")]
            Dialect::Sqlite => Ok(Backend::Sqlite(SqliteBackend::open(
                &config.connection_string,
            )?)),
            #[allow(unreachable_patterns)]
            other => Err(Error::Config(format!(
                "driver {other} is not compiled in; enable the `{other}` feature"
            ))),
        }
    }

    async fn ping(&self, limit: Option<Duration>) -> Result<()> {
        match self {
            #[cfg(feature = "postgres")]
            Backend::Postgres(pg) => deadline(limit, pg.ping()).await,
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(lite) => lite.ping(limit).await,
        }
    }

    async fn query(&self, sql: &str, params: &[Value], limit: Option<Duration>) -> Result<Vec<Row>> {
        match self {
            #[cfg(feature = "postgres")]
            Backend::Postgres(pg) => deadline(limit, pg.query(sql, params)).await,
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(lite) => lite.query(sql, params, limit).await,
        }
    }

    async fn execute(&self, sql: &str, params: &[Value], limit: Option<Duration>) -> Result<u64> {
        match self {
            #[cfg(feature = "postgres")]
            Backend::Postgres(pg) => deadline(limit, pg.execute(sql, params)).await,
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(lite) => lite.execute(sql, params, limit).await,
        }
    }

    fn close(&self) {
        match self {
            #[cfg(feature = "postgres")]
            Backend::Postgres(pg) => pg.close(),
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(_) => {}
        }
    }
}

/// An explicitly constructed, explicitly owned database handle.
///
/// Building a `Database` does not touch the network. [`Database::connect`]
/// opens the backend and pings it; until then (and after
/// [`Database::close`]) every statement fails with
/// [`StorageError::NotConnected`].
///
/// The handle is safe to share between tasks: PostgreSQL statements run on
/// pooled connections and SQLite statements take turns on one connection.
///
/// ```ignore
/// let db = Database::new(DbConfig::from_json_file("gondul.json")?);
/// db.connect().await?;
/// let found = restsql::select(&db, &mut switch, "switches", &search).await?;
/// ```
pub struct Database {
    config: DbConfig,
    backend: RwLock<Option<Arc<Backend>>>,
}

impl Database {
    pub fn new(config: DbConfig) -> Self {
        Self {
            config,
            backend: RwLock::new(None),
        }
    }

    /// Build and connect in one step.
    pub async fn open(config: DbConfig) -> Result<Self> {
        let db = Self::new(config);
        db.connect().await?;
        Ok(db)
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Open the backend and verify it answers.
    ///
    /// Calling this on a connected handle replaces the backend.
    pub async fn connect(&self) -> Result<()> {
        let backend = match Backend::open(&self.config).await {
            Ok(backend) => backend,
            Err(e) => {
                tracing::warn!(target: "restsql.sql", driver = %self.config.driver, error = %e, "failed to open database");
                return Err(e);
            }
        };
        if let Err(e) = backend.ping(self.config.timeout()).await {
            tracing::warn!(target: "restsql.sql", driver = %self.config.driver, error = %e, "failed to connect to database");
            backend.close();
            return Err(e);
        }

        let previous = self.slot_write().replace(Arc::new(backend));
        if let Some(previous) = previous {
            previous.close();
        }
        tracing::info!(target: "restsql.sql", driver = %self.config.driver, "connected to database");
        Ok(())
    }

    /// Round-trip a trivial statement.
    pub async fn ping(&self) -> Result<()> {
        let backend = self.backend()?;
        backend.ping(self.config.timeout()).await
    }

    /// Drop the backend. Later statements fail with `NotConnected`.
    pub fn close(&self) {
        if let Some(backend) = self.slot_write().take() {
            backend.close();
            tracing::info!(target: "restsql.sql", driver = %self.config.driver, "closed database");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.backend
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn slot_write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Arc<Backend>>> {
        self.backend.write().unwrap_or_else(|e| e.into_inner())
    }

    fn backend(&self) -> Result<Arc<Backend>> {
        self.backend
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| StorageError::NotConnected.into())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("driver", &self.config.driver)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Executor for Database {
    fn dialect(&self) -> Dialect {
        self.config.driver
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let backend = self.backend()?;
        backend.query(sql, params, self.config.timeout()).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let backend = self.backend()?;
        backend.execute(sql, params, self.config.timeout()).await
    }
}
