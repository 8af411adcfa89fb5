//! Geometric box given by two opposing corners.

use crate::error::{Error, Result};
use crate::value::{FromValue, ToValue, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const KIND: &str = "box";

/// Two opposing corners of a box, matching the Postgres `box` type.
///
/// Postgres always stores the upper right corner first, so `x1/y1` may come
/// back as `x2/y2`. Equality compares the normalized corners and is not
/// affected by that reordering.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Rectangle {
    #[serde(rename = "X1")]
    pub x1: i64,
    #[serde(rename = "Y1")]
    pub y1: i64,
    #[serde(rename = "X2")]
    pub x2: i64,
    #[serde(rename = "Y2")]
    pub y2: i64,
}

impl Rectangle {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Lower left and upper right corners.
    pub fn normalized(&self) -> ((i64, i64), (i64, i64)) {
        (
            (self.x1.min(self.x2), self.y1.min(self.y2)),
            (self.x1.max(self.x2), self.y1.max(self.y2)),
        )
    }

    /// Parse the storage representation, as either text or raw bytes.
    pub fn from_storage(bytes: &[u8]) -> Result<Self> {
        super::storage_text(KIND, bytes)?.parse()
    }
}

impl PartialEq for Rectangle {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Rectangle {}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{}),({},{})", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Reads `(a,b)` off the front of `s`, returning the pair and the rest.
fn parse_point(s: &str) -> Option<((i64, i64), &str)> {
    let rest = s.strip_prefix('(')?;
    let (inner, rest) = rest.split_once(')')?;
    let (a, b) = inner.split_once(',')?;
    Some(((a.trim().parse().ok()?, b.trim().parse().ok()?), rest))
}

impl FromStr for Rectangle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || Error::malformed_scalar(KIND, format!("expected (x1,y1),(x2,y2), got {s:?}"));
        let text = s.trim();
        let ((x1, y1), rest) = parse_point(text).ok_or_else(malformed)?;
        let rest = rest.strip_prefix(',').ok_or_else(malformed)?;
        let ((x2, y2), rest) = parse_point(rest).ok_or_else(malformed)?;
        if !rest.is_empty() {
            return Err(malformed());
        }
        Ok(Self { x1, y1, x2, y2 })
    }
}

impl ToValue for Rectangle {
    fn to_value(&self) -> Value {
        Value::Rect {
            x1: self.x1 as f64,
            y1: self.y1 as f64,
            x2: self.x2 as f64,
            y2: self.y2 as f64,
        }
    }
}

fn integral(v: f64) -> Result<i64> {
    if v.fract() != 0.0 || !v.is_finite() {
        return Err(Error::malformed_scalar(
            KIND,
            format!("corner coordinate {v} is not an integer"),
        ));
    }
    // i64::MIN is exactly representable; i64::MAX rounds up to 2^63.
    if v < i64::MIN as f64 || v >= i64::MAX as f64 {
        return Err(Error::malformed_scalar(
            KIND,
            format!("corner coordinate {v} is out of range"),
        ));
    }
    Ok(v as i64)
}

impl FromValue for Rectangle {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Rect { x1, y1, x2, y2 } => Ok(Self {
                x1: integral(x1)?,
                y1: integral(y1)?,
                x2: integral(x2)?,
                y2: integral(y2)?,
            }),
            Value::Text(text) => text.parse(),
            Value::Bytes(bytes) => Self::from_storage(&bytes),
            other => Err(Error::malformed_scalar(
                KIND,
                format!("cannot scan {} into a box", other.kind()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_corners_are_rejected() {
        let huge = Value::Rect {
            x1: 0.0,
            y1: 0.0,
            x2: 1e19,
            y2: 1.0,
        };
        let err = Rectangle::from_value(huge).unwrap_err();
        assert!(matches!(err, Error::MalformedScalar { .. }));

        let low = Value::Rect {
            x1: i64::MIN as f64,
            y1: 0.0,
            x2: 0.0,
            y2: 0.0,
        };
        assert_eq!(Rectangle::from_value(low).unwrap().x1, i64::MIN);
    }

    #[test]
    fn parses_corner_grammar() {
        let b: Rectangle = "(0,0),(0,0)".parse().unwrap();
        assert_eq!((b.x1, b.y1, b.x2, b.y2), (0, 0, 0, 0));
        assert_eq!(b.to_string(), "(0,0),(0,0)");

        let b: Rectangle = "(10,20),(30,40)".parse().unwrap();
        assert_eq!((b.x1, b.y1, b.x2, b.y2), (10, 20, 30, 40));
        assert_eq!(b.to_string(), "(10,20),(30,40)");
    }

    #[test]
    fn rejects_other_grammars() {
        for bad in ["kjeks", "((1,2),(3,4))", "(1,2)", "(1,2),(3,4),(5,6)", "(1.5,2),(3,4)", ""] {
            assert!(
                matches!(bad.parse::<Rectangle>(), Err(Error::MalformedScalar { kind: "box", .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn storage_accepts_bytes() {
        let b = Rectangle::from_value(Value::Bytes(b"(1,2),(3,4)".to_vec())).unwrap();
        assert_eq!(b, Rectangle::new(1, 2, 3, 4));
    }

    #[test]
    fn equality_ignores_corner_order() {
        let stored = Rectangle::from_value(Value::Rect {
            x1: 30.0,
            y1: 40.0,
            x2: 10.0,
            y2: 20.0,
        })
        .unwrap();
        assert_eq!(stored, Rectangle::new(10, 20, 30, 40));
        assert_ne!(stored, Rectangle::new(10, 20, 30, 41));
    }

    #[test]
    fn fractional_corners_are_malformed() {
        let err = Rectangle::from_value(Value::Rect {
            x1: 0.5,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
        })
        .unwrap_err();
        assert_eq!(err.code(), 400);
    }

    #[test]
    fn json_uses_corner_names() {
        let b = Rectangle::new(1, 2, 3, 4);
        let json = serde_json::to_value(b).unwrap();
        assert_eq!(json, serde_json::json!({"X1": 1, "Y1": 2, "X2": 3, "Y2": 4}));
    }
}
