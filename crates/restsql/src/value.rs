//! Dialect-neutral values bound to statements and scanned out of rows.
//!
//! Every mapped field type implements [`ToValue`] (for INSERT/UPDATE/search
//! parameters) and [`FromValue`] (for SELECT results). Drivers translate
//! [`Value`] to and from their own wire types.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;
use std::net::IpAddr;

/// A single SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    /// An address with its real network length (32 or 128 for a host).
    Inet { addr: IpAddr, prefix: u8 },
    /// Two opposing corners of a box.
    Rect { x1: f64, y1: f64, x2: f64, y2: f64 },
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Short name of the variant, used in decode errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
            Value::Inet { .. } => "inet",
            Value::Rect { .. } => "box",
            Value::Timestamp(_) => "timestamp",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Textual storage form, used by backends without native types.
    pub(crate) fn to_text(&self) -> Option<String> {
        match self {
            Value::Json(v) => Some(v.to_string()),
            Value::Inet { addr, prefix } => Some(if *prefix == host_prefix(addr) {
                addr.to_string()
            } else {
                format!("{addr}/{prefix}")
            }),
            Value::Rect { x1, y1, x2, y2 } => Some(format!("({x1},{y1}),({x2},{y2})")),
            Value::Timestamp(ts) => Some(ts.to_rfc3339()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v:?}"),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            other => match other.to_text() {
                Some(text) => f.write_str(&text),
                None => f.write_str(other.kind()),
            },
        }
    }
}

/// Full-length prefix of an address: 32 for IPv4, 128 for IPv6.
pub(crate) fn host_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// Conversion into a bindable [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Conversion out of a scanned [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(expected: &str, found: &Value) -> Result<T> {
    Err(Error::decode(
        "<value>",
        format!("expected {expected}, found {}", found.kind()),
    ))
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: ToValue + ?Sized> ToValue for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: FromValue> FromValue for Box<T> {
    fn from_value(value: Value) -> Result<Self> {
        T::from_value(value).map(Box::new)
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            // SQLite stores booleans as integers.
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            other => mismatch("bool", &other),
        }
    }
}

macro_rules! int_value {
    ($($ty:ty),*) => {$(
        impl ToValue for $ty {
            fn to_value(&self) -> Value {
                Value::Int(i64::from(*self))
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Int(v) => <$ty>::try_from(v).map_err(|_| {
                        Error::decode(
                            "<value>",
                            format!("{v} is out of range for {}", stringify!($ty)),
                        )
                    }),
                    other => mismatch("integer", &other),
                }
            }
        }
    )*};
}

int_value!(i8, i16, i32, i64, u8, u16, u32);

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            other => mismatch("float", &other),
        }
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_owned())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(v) => Ok(v),
            Value::Bytes(v) => String::from_utf8(v)
                .map_err(|e| Error::decode("<value>", format!("invalid utf-8: {e}"))),
            other => mismatch("text", &other),
        }
    }
}

impl ToValue for [u8] {
    fn to_value(&self) -> Value {
        Value::Bytes(self.to_vec())
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(v) => Ok(v),
            Value::Text(v) => Ok(v.into_bytes()),
            other => mismatch("bytes", &other),
        }
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Json(v) => Ok(v),
            Value::Text(v) => {
                serde_json::from_str(&v).map_err(|e| Error::decode("<value>", e.to_string()))
            }
            Value::Bytes(v) => {
                serde_json::from_slice(&v).map_err(|e| Error::decode("<value>", e.to_string()))
            }
            other => mismatch("json", &other),
        }
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(v) => Ok(v),
            Value::Text(v) => parse_timestamp(&v),
            other => mismatch("timestamp", &other),
        }
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    // SQLite's CURRENT_TIMESTAMP format.
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::decode("<value>", format!("invalid timestamp {s:?}: {e}")))
}
