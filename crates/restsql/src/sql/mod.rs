//! Statement text generation.
//!
//! [`Sql`] composes fragments and bound values without tracking placeholder
//! indices by hand; [`Statement`] builds the five statement shapes the mapper
//! issues and renders them for a [`crate::Dialect`].
//!
//! # Example
//!
//! ```ignore
//! use restsql::{Dialect, Ident, Search, Statement};
//!
//! let table = Ident::parse("switches")?;
//! let search = Search::new().eq("sysname", "e1-3")?;
//! let stmt = Statement::delete(Dialect::Postgres, &table, &search)?;
//! assert_eq!(stmt.sql(), "DELETE FROM switches WHERE sysname = $1");
//! ```

mod builder;
mod statement;


pub use builder::Sql;
pub use statement::{Statement, StatementKind};

/// Start building a SQL statement.
pub fn sql(initial_sql: impl Into<String>) -> Sql {
    Sql::new(initial_sql)
}
