//! Scalar types with their own storage and wire formats.
//!
//! Each type converts to and from a [`crate::Value`] so the mapper can treat
//! it as an opaque column, accepts its storage grammar as either text or raw
//! bytes, and serializes to JSON in the form clients exchange over HTTP.
//!
//! Any other type that implements [`crate::ToValue`] and [`crate::FromValue`]
//! can be used as a column the same way. Nested structs are never flattened
//! into several columns; they are one column through those two traits.

mod ip;
mod jsonb;
mod rectangle;

pub use ip::Ip;
pub use jsonb::Jsonb;
pub use rectangle::Rectangle;

use crate::error::{Error, Result};

/// Decode raw storage bytes as UTF-8 text for a codec.
fn storage_text<'a>(kind: &'static str, bytes: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(bytes).map_err(|e| Error::malformed_scalar(kind, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_text_borrows_from_the_bytes() {
        let bytes = b"(1,2),(3,4)".to_vec();
        let text = storage_text("box", &bytes).unwrap();
        assert_eq!(text, "(1,2),(3,4)");
    }

    #[test]
    fn storage_text_rejects_invalid_utf8() {
        let err = storage_text("inet", &[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, Error::MalformedScalar { .. }));
        assert_eq!(err.code(), 400);
    }
}
