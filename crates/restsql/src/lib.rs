//! # restsql
//!
//! Maps plain structs to table rows so a JSON REST service can back its
//! GET/PUT/POST/DELETE verbs with PostgreSQL or SQLite.
//!
//! ## Features
//!
//! - **Field-driven SQL**: column lists come from the struct's fields, values are always bound
//! - **Partial writes**: absent `Option` fields leave their columns untouched
//! - **Explicit handles**: every operation takes a [`Database`] (or any [`Executor`]) argument
//! - **Codec types**: [`Ip`], [`Rectangle`] and [`Jsonb`] columns with stable text forms
//! - **Safe defaults**: UPDATE and DELETE refuse an empty search
//!
//! ## Example
//!
//! ```ignore
//! use restsql::{Database, DbConfig, Entity, Search};
//!
//! #[derive(Debug, Default, Entity)]
//! struct Switch {
//!     pub sysname: Option<String>,
//!     #[orm(column = "mgmt_v4_addr")]
//!     pub mgmt_v4: Option<restsql::Ip>,
//!     pub tags: Option<restsql::Jsonb>,
//! }
//!
//! let db = Database::open(DbConfig::from_env()?).await?;
//!
//! let key = Search::new().eq("sysname", "e1-3")?;
//! let mut sw = Switch::default();
//! restsql::get(&db, &mut sw, "switches", &key).await?;
//!
//! sw.tags = None; // leave the stored tags alone
//! restsql::upsert(&db, &sw, "switches", &key).await?;
//! ```

extern crate self as restsql;

pub mod client;
pub mod config;
pub mod db;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod ident;
pub mod mapper;
pub mod report;
pub mod search;
pub mod sql;
pub mod types;
pub mod value;
pub mod verbs;

mod trace;

#[cfg(feature = "postgres")]
pub mod pool;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use client::{Executor, Row, RowReader};
pub use config::DbConfig;
pub use db::Database;
pub use dialect::Dialect;
pub use entity::{Entity, Field};
pub use error::{Error, Result, StorageError};
pub use ident::Ident;
pub use mapper::{delete, exists, get, insert, select, select_many, update, upsert, upsert_each};
pub use report::{Report, ReportError};
pub use search::{Op, Predicate, Search};
pub use sql::{Sql, Statement, StatementKind, sql};
pub use types::{Ip, Jsonb, Rectangle};
pub use value::{FromValue, ToValue, Value};
pub use verbs::{Deleter, Getter, Poster, Putter, element_key};

#[cfg(feature = "postgres")]
pub use pool::{create_pool, create_pool_with_config};

#[cfg(feature = "derive")]
pub use restsql_derive::Entity;
