//! The executor seam between the mapper and a driver.

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::value::{FromValue, Value};
use std::future::Future;
use std::sync::Arc;

/// Anything that can run a rendered statement.
///
/// [`crate::Database`] is the usual implementation; mapper entry points are
/// generic over this trait so tests and middleware can wrap it.
pub trait Executor: Send + Sync {
    /// Placeholder convention statements must be rendered in.
    fn dialect(&self) -> Dialect;

    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> impl Future<Output = Result<u64>> + Send;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<Vec<Row>>> + Send {
        (**self).query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> impl Future<Output = Result<u64>> + Send {
        (**self).execute(sql, params)
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<Vec<Row>>> + Send {
        (**self).query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> impl Future<Output = Result<u64>> + Send {
        (**self).execute(sql, params)
    }
}

/// One result row, already decoded into [`Value`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Value of the column called `name`, if present.
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == name)?;
        self.values.get(idx)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Sequential reader handed to [`crate::Entity::from_row`].
///
/// Columns are consumed in the order of [`crate::Entity::FIELDS`], which is
/// the order the SELECT list was emitted in.
#[derive(Debug)]
pub struct RowReader {
    values: std::vec::IntoIter<Value>,
}

impl RowReader {
    pub fn new(row: Row) -> Self {
        Self {
            values: row.values.into_iter(),
        }
    }

    /// Scan the next column into `T`.
    ///
    /// Any failure is reported as [`Error::Decode`] naming `column`: the row
    /// exists, its contents just do not fit the field.
    pub fn column<T: FromValue>(&mut self, column: &str) -> Result<T> {
        let value = self
            .values
            .next()
            .ok_or_else(|| Error::decode(column, "row has fewer columns than the entity"))?;
        T::from_value(value).map_err(|e| match e {
            Error::Decode { message, .. } => Error::decode(column, message),
            other => Error::decode(column, other.to_string()),
        })
    }

    /// Columns not yet read.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl From<Row> for RowReader {
    fn from(row: Row) -> Self {
        Self::new(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Ip;

    fn row(values: Vec<Value>) -> Row {
        let columns: Vec<String> = (0..values.len()).map(|i| format!("c{i}")).collect();
        Row::new(columns.into(), values)
    }

    #[test]
    fn reads_columns_in_order() {
        let mut reader = RowReader::new(row(vec![Value::Text("e1-3".into()), Value::Int(1)]));
        assert_eq!(reader.column::<String>("sysname").unwrap(), "e1-3");
        assert_eq!(reader.column::<i32>("vlan").unwrap(), 1);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn failures_name_the_column() {
        let mut reader = RowReader::new(row(vec![Value::Text("x".into())]));
        let err = reader.column::<i32>("vlan").unwrap_err();
        assert!(matches!(&err, Error::Decode { column, .. } if column == "vlan"));
        assert_eq!(err.code(), 500);
    }

    #[test]
    fn malformed_stored_codec_is_a_decode_error() {
        let mut reader = RowReader::new(row(vec![Value::Text("kjeks".into())]));
        let err = reader.column::<Ip>("mgmt").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn short_rows_fail() {
        let mut reader = RowReader::new(row(vec![]));
        assert!(reader.column::<Option<i32>>("vlan").is_err());
    }

    #[test]
    fn named_lookup() {
        let r = row(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(r.get_named("c1"), Some(&Value::Int(2)));
        assert_eq!(r.get_named("nope"), None);
    }
}
