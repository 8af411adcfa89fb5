//! SQLite backend: one `rusqlite` connection behind a mutex.
//!
//! SQLite has no address, box or JSON types, so those values are stored in
//! their text form and parsed back by the codecs on read.

use crate::client::Row;
use crate::error::{Result, StorageError};
use crate::value::Value;
use rusqlite::Connection;
use rusqlite::config::DbConfig as SqliteConfig;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(v) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*v))),
            Value::Int(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Float(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Bytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(&v[..])),
            other => ToSqlOutput::Owned(SqlValue::Text(other.to_text().unwrap_or_default())),
        })
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => Value::Bytes(v.to_vec()),
    }
}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Location {
    InMemory,
    File(PathBuf),
}

impl Location {
    /// Accepts `sqlite::memory:`, `:memory:`, `sqlite://path`, `sqlite:path`
    /// or a bare path.
    pub(crate) fn parse(url: &str) -> Self {
        let rest = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        match rest {
            "" | ":memory:" | "memory:" => Location::InMemory,
            path => Location::File(PathBuf::from(path)),
        }
    }
}

/// A single SQLite connection shared by every statement.
///
/// Statements run on tokio's blocking pool. With a deadline, a watchdog
/// interrupts the statement once it has held the connection that long.
#[derive(Clone)]
pub(crate) struct SqliteBackend {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    pub(crate) fn open(url: &str) -> Result<Self> {
        let connection = match Location::parse(url) {
            Location::InMemory => Connection::open_in_memory(),
            Location::File(path) => Connection::open(path),
        }
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        // A double-quoted unknown column must fail, not turn into a string literal.
        for flag in [SqliteConfig::SQLITE_DBCONFIG_DQS_DML, SqliteConfig::SQLITE_DBCONFIG_DQS_DDL] {
            connection
                .set_db_config(flag, false)
                .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    async fn with_connection<T, F>(&self, limit: Option<Duration>, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        let task = tokio::task::spawn_blocking(move || {
            let conn = connection
                .lock()
                .map_err(|_| StorageError::Connection("sqlite connection mutex poisoned".into()))?;
            let watchdog = limit.map(|limit| {
                let handle = conn.get_interrupt_handle();
                tokio::spawn(async move {
                    tokio::time::sleep(limit).await;
                    handle.interrupt();
                })
            });
            let result = f(&conn);
            if let Some(watchdog) = watchdog {
                watchdog.abort();
            }
            result.map_err(|e| classify(e, limit))
        });
        let result = task
            .await
            .map_err(|e| StorageError::Connection(format!("sqlite worker failed: {e}")))?;
        result.map_err(Into::into)
    }

    pub(crate) async fn query(
        &self,
        sql: &str,
        params: &[Value],
        limit: Option<Duration>,
    ) -> Result<Vec<Row>> {
        let sql = sql.to_owned();
        let params = params.to_vec();
        self.with_connection(limit, move |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let columns: Arc<[String]> = stmt.column_names().into_iter().map(String::from).collect();
            let width = columns.len();
            let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let values = (0..width)
                    .map(|idx| row.get_ref(idx).map(from_sql))
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                out.push(Row::new(columns.clone(), values));
            }
            Ok(out)
        })
        .await
    }

    pub(crate) async fn execute(
        &self,
        sql: &str,
        params: &[Value],
        limit: Option<Duration>,
    ) -> Result<u64> {
        let sql = sql.to_owned();
        let params = params.to_vec();
        self.with_connection(limit, move |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let n = stmt.execute(rusqlite::params_from_iter(params.iter()))?;
            Ok(n as u64)
        })
        .await
    }

    pub(crate) async fn ping(&self, limit: Option<Duration>) -> Result<()> {
        self.with_connection(limit, |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        })
        .await
        .map(|_| ())
    }
}

/// An interrupted statement under a deadline is a timeout.
fn classify(err: rusqlite::Error, limit: Option<Duration>) -> StorageError {
    match (limit, err.sqlite_error_code()) {
        (Some(limit), Some(rusqlite::ErrorCode::OperationInterrupted)) => StorageError::Timeout(limit),
        _ => StorageError::from_sqlite(err),
    }
}
