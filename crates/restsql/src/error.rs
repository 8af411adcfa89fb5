//! Error types for restsql

use std::time::Duration;
use thiserror::Error;

/// Result type alias for restsql operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the mapper.
///
/// Every variant maps to an HTTP-status-like class through [`Error::code`]:
/// 400 for malformed input, 404 for a missing row, 500 for everything the
/// caller cannot fix by changing the request.
#[derive(Debug, Error)]
pub enum Error {
    /// The value handed to the mapper has no mappable shape (no columns,
    /// nothing to write).
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// A search triple is unusable: bad column identifier, unknown operator,
    /// or a missing key where one is required.
    #[error("Malformed predicate: {0}")]
    MalformedPredicate(String),

    /// A scalar codec could not parse its input.
    #[error("Malformed {kind}: {message}")]
    MalformedScalar { kind: &'static str, message: String },

    /// Zero rows matched a single-row fetch.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The row exists but a column could not be scanned into its field.
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Configuration could not be loaded or names an unsupported driver.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The storage layer failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures of the storage layer itself.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A statement was attempted before `Database::connect` succeeded.
    #[error("Database is not connected")]
    NotConnected,

    /// Opening or pinging the connection failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// PostgreSQL query execution error
    #[cfg(feature = "postgres")]
    #[error("Query error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// SQLite query execution error
    #[cfg(feature = "sqlite")]
    #[error("Query error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Pool error
    #[cfg(feature = "postgres")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Statement timeout
    #[error("Query timeout after {0:?}")]
    Timeout(Duration),

    /// The driver returned a column type with no [`crate::Value`] mapping.
    #[error("Unsupported column type: {0}")]
    UnsupportedType(String),
}

impl Error {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a malformed predicate error
    pub fn malformed_predicate(message: impl Into<String>) -> Self {
        Self::MalformedPredicate(message.into())
    }

    /// Create a malformed scalar error for the codec named `kind`
    pub fn malformed_scalar(kind: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedScalar {
            kind,
            message: message.into(),
        }
    }

    /// Create an invalid target error
    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::InvalidTarget(message.into())
    }

    /// HTTP-status-like classification of this error.
    pub fn code(&self) -> u16 {
        match self {
            Self::MalformedPredicate(_) | Self::MalformedScalar { .. } => 400,
            Self::NotFound(_) => 404,
            Self::InvalidTarget(_) | Self::Decode { .. } | Self::Config(_) | Self::Storage(_) => {
                500
            }
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a storage-layer failure
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Storage(StorageError::UniqueViolation(_)))
    }

    /// Check if the statement was refused because the handle is not connected
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::Storage(StorageError::NotConnected))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Storage(StorageError::Timeout(_)))
    }
}

impl StorageError {
    /// Parse a tokio_postgres error into a more specific StorageError
    #[cfg(feature = "postgres")]
    pub fn from_postgres(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            if db_err.code().code() == "23505" {
                let constraint = db_err.constraint().unwrap_or("unknown");
                return Self::UniqueViolation(format!("{}: {}", constraint, db_err.message()));
            }
        }
        Self::Postgres(err)
    }

    /// Parse a rusqlite error into a more specific StorageError
    #[cfg(feature = "sqlite")]
    pub fn from_sqlite(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ffi_err, message) = &err {
            let code = ffi_err.extended_code;
            if code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            {
                return Self::UniqueViolation(message.clone().unwrap_or_else(|| err.to_string()));
            }
        }
        Self::Sqlite(err)
    }
}

#[cfg(feature = "postgres")]
impl From<deadpool_postgres::PoolError> for StorageError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
