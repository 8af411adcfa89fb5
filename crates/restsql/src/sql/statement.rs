use super::Sql;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::ident::Ident;
use crate::search::Search;
use crate::value::Value;
use std::fmt;

/// What a [`Statement`] does, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Exists,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatementKind::Select => "select",
            StatementKind::Exists => "exists",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
        })
    }
}

/// Rendered statement text plus its positional parameters.
///
/// Table and column names are interpolated as validated [`Ident`]s; only
/// values are bound. Safe defaults apply: INSERT and UPDATE need at least
/// one column, UPDATE and DELETE need at least one predicate.
#[derive(Debug, Clone)]
pub struct Statement {
    kind: StatementKind,
    sql: String,
    params: Vec<Value>,
}

impl Statement {
    fn finish(kind: StatementKind, dialect: Dialect, sql: Sql) -> Self {
        Self {
            kind,
            sql: sql.to_sql(dialect),
            params: sql.into_params(),
        }
    }

    /// `SELECT cols FROM table [WHERE ...] [LIMIT n]`
    pub fn select(
        dialect: Dialect,
        table: &Ident,
        columns: &[Ident],
        search: &Search,
        limit: Option<u32>,
    ) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::invalid_target(format!(
                "no columns to select from {table}"
            )));
        }
        let mut q = Sql::new("SELECT ");
        q.push_ident_list(columns).push(" FROM ").push_ident(table);
        q.push_where(search);
        if let Some(n) = limit {
            q.push(&format!(" LIMIT {n}"));
        }
        Ok(Self::finish(StatementKind::Select, dialect, q))
    }

    /// `SELECT 1 FROM table [WHERE ...] LIMIT 1`
    pub fn exists(dialect: Dialect, table: &Ident, search: &Search) -> Self {
        let mut q = Sql::new("SELECT 1 FROM ");
        q.push_ident(table);
        q.push_where(search);
        q.push(" LIMIT 1");
        Self::finish(StatementKind::Exists, dialect, q)
    }

    /// `INSERT INTO table (cols) VALUES (...)`
    pub fn insert(dialect: Dialect, table: &Ident, columns: Vec<(Ident, Value)>) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::invalid_target(format!(
                "nothing to insert into {table}"
            )));
        }
        let (names, values): (Vec<Ident>, Vec<Value>) = columns.into_iter().unzip();
        let mut q = Sql::new("INSERT INTO ");
        q.push_ident(table).push(" (");
        q.push_ident_list(&names).push(") VALUES (");
        q.push_bind_list(values).push(")");
        Ok(Self::finish(StatementKind::Insert, dialect, q))
    }

    /// `UPDATE table SET a = $1, b = $2 WHERE ...`
    ///
    /// SET parameters are numbered before the WHERE parameters.
    pub fn update(
        dialect: Dialect,
        table: &Ident,
        columns: Vec<(Ident, Value)>,
        search: &Search,
    ) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::invalid_target(format!(
                "nothing to update in {table}"
            )));
        }
        if search.is_empty() {
            return Err(Error::malformed_predicate(format!(
                "refusing to update every row of {table}"
            )));
        }
        let mut q = Sql::new("UPDATE ");
        q.push_ident(table).push(" SET ");
        for (i, (name, value)) in columns.into_iter().enumerate() {
            if i > 0 {
                q.push(", ");
            }
            q.push_ident(&name).push(" = ").push_value(value);
        }
        q.push_where(search);
        Ok(Self::finish(StatementKind::Update, dialect, q))
    }

    /// `DELETE FROM table WHERE ...`
    pub fn delete(dialect: Dialect, table: &Ident, search: &Search) -> Result<Self> {
        if search.is_empty() {
            return Err(Error::malformed_predicate(format!(
                "refusing to delete every row of {table}"
            )));
        }
        let mut q = Sql::new("DELETE FROM ");
        q.push_ident(table);
        q.push_where(search);
        Ok(Self::finish(StatementKind::Delete, dialect, q))
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}
