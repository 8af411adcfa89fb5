//! `tracing` events for executed statements.
//!
//! All events use the `restsql.sql` target so they can be filtered apart
//! from application logs, e.g. `RUST_LOG=restsql.sql=debug`.

use crate::dialect::Dialect;
use crate::error::Error;
use crate::sql::Statement;
use std::time::Duration;

/// Longest SQL text emitted in an event, in bytes.
pub const MAX_SQL_LENGTH: usize = 200;

/// Truncate a SQL string to at most `max_bytes`, keeping a UTF-8 boundary.
pub(crate) fn truncate_sql_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn display_sql(sql: &str) -> String {
    if sql.len() > MAX_SQL_LENGTH {
        format!("{}...", truncate_sql_bytes(sql, MAX_SQL_LENGTH))
    } else {
        sql.to_string()
    }
}

pub(crate) fn statement(dialect: Dialect, stmt: &Statement) {
    tracing::debug!(
        target: "restsql.sql",
        %dialect,
        kind = %stmt.kind(),
        param_count = stmt.params().len(),
        sql = %display_sql(stmt.sql()),
    );
}

pub(crate) fn finished(stmt: &Statement, elapsed: Duration, rows: u64) {
    tracing::trace!(
        target: "restsql.sql",
        kind = %stmt.kind(),
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        rows,
    );
}

pub(crate) fn failed(stmt: &Statement, err: &Error) {
    tracing::warn!(
        target: "restsql.sql",
        kind = %stmt.kind(),
        code = err.code(),
        error = %err,
        sql = %display_sql(stmt.sql()),
        "statement failed"
    );
}
