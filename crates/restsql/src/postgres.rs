//! PostgreSQL backend: `tokio-postgres` over a `deadpool-postgres` pool.
//!
//! [`Value`] binds by adapting to the parameter type the server inferred for
//! each placeholder, so an `i64` can land in an `int4` column and the text
//! form of an address can land in an `inet` column. Rows are decoded by
//! column type.

use crate::client::Row;
use crate::error::{Error, Result, StorageError};
use crate::types::{Ip, Rectangle};
use crate::value::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use deadpool_postgres::Pool;
use std::error::Error as StdError;
use std::sync::Arc;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type, to_sql_checked};

type BoxError = Box<dyn StdError + Sync + Send>;

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => match *ty {
                Type::BOOL => v.to_sql(ty, out),
                _ => int_to_sql(i64::from(*v), ty, out),
            },
            Value::Int(v) => int_to_sql(*v, ty, out),
            Value::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => v.to_sql(ty, out),
                _ => text_to_sql(&v.to_string(), ty, out),
            },
            Value::Text(s) => text_to_sql(s, ty, out),
            Value::Bytes(b) => match *ty {
                Type::BYTEA => b.to_sql(ty, out),
                _ => text_to_sql(std::str::from_utf8(b)?, ty, out),
            },
            Value::Json(v) => match *ty {
                Type::JSON | Type::JSONB => v.to_sql(ty, out),
                _ => text_to_sql(&v.to_string(), ty, out),
            },
            Value::Inet { addr, prefix } => match *ty {
                Type::INET => cidr::IpInet::new(*addr, *prefix)?.to_sql(ty, out),
                Type::CIDR => cidr::IpCidr::new(*addr, *prefix)?.to_sql(ty, out),
                _ => text_to_sql(&self.to_string(), ty, out),
            },
            Value::Rect { x1, y1, x2, y2 } => match *ty {
                Type::BOX => geo_types::Rect::new(
                    geo_types::Coord { x: *x1, y: *y1 },
                    geo_types::Coord { x: *x2, y: *y2 },
                )
                .to_sql(ty, out),
                _ => text_to_sql(&self.to_string(), ty, out),
            },
            Value::Timestamp(ts) => match *ty {
                Type::TIMESTAMPTZ => ts.to_sql(ty, out),
                Type::TIMESTAMP => ts.naive_utc().to_sql(ty, out),
                _ => text_to_sql(&ts.to_rfc3339(), ty, out),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn int_to_sql(v: i64, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        Type::OID => u32::try_from(v)?.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        Type::BOOL => match v {
            0 => false.to_sql(ty, out),
            1 => true.to_sql(ty, out),
            _ => Err(format!("{v} is not a boolean").into()),
        },
        _ => text_to_sql(&v.to_string(), ty, out),
    }
}

/// Bind the text form of a value, parsing it when the column has a richer type.
fn text_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
    match *ty {
        Type::INET => {
            let ip: Ip = s.parse()?;
            cidr::IpInet::new(ip.addr, ip.effective_prefix())?.to_sql(ty, out)
        }
        Type::CIDR => {
            let ip: Ip = s.parse()?;
            cidr::IpCidr::new(ip.addr, ip.effective_prefix())?.to_sql(ty, out)
        }
        Type::BOX => {
            let r: Rectangle = s.parse()?;
            geo_types::Rect::new(
                geo_types::Coord {
                    x: r.x1 as f64,
                    y: r.y1 as f64,
                },
                geo_types::Coord {
                    x: r.x2 as f64,
                    y: r.y2 as f64,
                },
            )
            .to_sql(ty, out)
        }
        Type::UUID => uuid::Uuid::parse_str(s)?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => DateTime::parse_from_rfc3339(s)?
            .with_timezone(&Utc)
            .to_sql(ty, out),
        Type::INT2 | Type::INT4 | Type::INT8 | Type::OID => int_to_sql(s.trim().parse()?, ty, out),
        Type::FLOAT4 | Type::FLOAT8 => s.trim().parse::<f64>()?.to_sql(ty, out),
        Type::BOOL => s.trim().parse::<bool>()?.to_sql(ty, out),
        _ if <&str as ToSql>::accepts(ty) => s.to_sql(ty, out),
        _ => Err(format!("cannot bind text to a column of type {ty}").into()),
    }
}

fn get<'a, T: FromSql<'a>>(
    row: &'a tokio_postgres::Row,
    idx: usize,
    name: &str,
) -> Result<Option<T>> {
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| Error::decode(name, e.to_string()))
}

fn decode_column(row: &tokio_postgres::Row, idx: usize, name: &str, ty: &Type) -> Result<Value> {
    let value = match *ty {
        Type::BOOL => get::<bool>(row, idx, name)?.map(Value::Bool),
        Type::CHAR => get::<i8>(row, idx, name)?.map(|v| Value::Int(v.into())),
        Type::INT2 => get::<i16>(row, idx, name)?.map(|v| Value::Int(v.into())),
        Type::INT4 => get::<i32>(row, idx, name)?.map(|v| Value::Int(v.into())),
        Type::INT8 => get::<i64>(row, idx, name)?.map(Value::Int),
        Type::OID => get::<u32>(row, idx, name)?.map(|v| Value::Int(v.into())),
        Type::FLOAT4 => get::<f32>(row, idx, name)?.map(|v| Value::Float(v.into())),
        Type::FLOAT8 => get::<f64>(row, idx, name)?.map(Value::Float),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            get::<String>(row, idx, name)?.map(Value::Text)
        }
        Type::BYTEA => get::<Vec<u8>>(row, idx, name)?.map(Value::Bytes),
        Type::JSON | Type::JSONB => get::<serde_json::Value>(row, idx, name)?.map(Value::Json),
        Type::INET => get::<cidr::IpInet>(row, idx, name)?.map(|v| Value::Inet {
            addr: v.address(),
            prefix: v.network_length(),
        }),
        Type::CIDR => get::<cidr::IpCidr>(row, idx, name)?.map(|v| Value::Inet {
            addr: v.first_address(),
            prefix: v.network_length(),
        }),
        // The server keeps the upper right corner first.
        Type::BOX => get::<geo_types::Rect<f64>>(row, idx, name)?.map(|r| Value::Rect {
            x1: r.max().x,
            y1: r.max().y,
            x2: r.min().x,
            y2: r.min().y,
        }),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, idx, name)?.map(Value::Timestamp),
        Type::TIMESTAMP => {
            get::<NaiveDateTime>(row, idx, name)?.map(|v| Value::Timestamp(v.and_utc()))
        }
        Type::UUID => get::<uuid::Uuid>(row, idx, name)?.map(|v| Value::Text(v.to_string())),
        _ => return Err(StorageError::UnsupportedType(format!("{name}: {ty}")).into()),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Decode every row of a result set into driver-neutral [`Row`]s.
pub(crate) fn decode_rows(rows: &[tokio_postgres::Row]) -> Result<Vec<Row>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let columns: Arc<[String]> = first
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    rows.iter()
        .map(|row| {
            let values = row
                .columns()
                .iter()
                .enumerate()
                .map(|(idx, col)| decode_column(row, idx, col.name(), col.type_()))
                .collect::<Result<Vec<_>>>()?;
            Ok(Row::new(columns.clone(), values))
        })
        .collect()
}

fn bind(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

/// Pooled PostgreSQL connections.
#[derive(Clone)]
pub(crate) struct PostgresBackend {
    pool: Pool,
}

impl PostgresBackend {
    pub(crate) fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub(crate) async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let client = self.pool.get().await.map_err(StorageError::from)?;
        let rows = client
            .query(sql, &bind(params))
            .await
            .map_err(StorageError::from_postgres)?;
        decode_rows(&rows)
    }

    pub(crate) async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let client = self.pool.get().await.map_err(StorageError::from)?;
        let n = client
            .execute(sql, &bind(params))
            .await
            .map_err(StorageError::from_postgres)?;
        Ok(n)
    }

    pub(crate) async fn ping(&self) -> Result<()> {
        let client = self.pool.get().await.map_err(|e| {
            StorageError::Connection(format!("cannot reach the server: {e}"))
        })?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(StorageError::from_postgres)?;
        Ok(())
    }

    pub(crate) fn close(&self) {
        self.pool.close();
    }
}
