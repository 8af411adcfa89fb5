//! Table and column names.
//!
//! Identifiers are interpolated into statement text, never bound as
//! parameters, so every name is checked before it reaches SQL:
//!
//! - bare parts match `[A-Za-z_][A-Za-z0-9_$]*`
//! - quoted parts (`"Mixed Case"`) allow anything but NUL, with `""` as an
//!   escaped quote
//! - tables may be dotted (`inventory.switches`); columns are a single part
//!
//! Names are compared case-sensitively and are emitted exactly as given.

use crate::error::{Error, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Bare(String),
    Quoted(String),
}

/// A validated SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    parts: Vec<Part>,
}

impl Ident {
    /// Parse a possibly dotted name, such as a table reference.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::malformed_predicate("identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(Error::malformed_predicate(
                "identifier cannot contain a NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut rest = s;
        loop {
            let (part, tail) = parse_part(rest, s)?;
            parts.push(part);
            match tail.strip_prefix('.') {
                Some("") => {
                    return Err(Error::malformed_predicate(format!(
                        "trailing '.' in identifier {s:?}"
                    )));
                }
                Some(next) => rest = next,
                None if tail.is_empty() => break,
                None => {
                    return Err(Error::malformed_predicate(format!(
                        "unexpected text after identifier part in {s:?}"
                    )));
                }
            }
        }
        Ok(Self { parts })
    }

    /// Parse a single-part name, such as a column.
    pub fn column(s: &str) -> Result<Self> {
        let ident = Self::parse(s)?;
        if ident.parts.len() != 1 {
            return Err(Error::malformed_predicate(format!(
                "column name {s:?} cannot be qualified"
            )));
        }
        Ok(ident)
    }

    /// Append the SQL spelling to `out`.
    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                Part::Bare(name) => out.push_str(name),
                Part::Quoted(name) => {
                    out.push('"');
                    out.push_str(&name.replace('"', "\"\""));
                    out.push('"');
                }
            }
        }
    }

    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.write_sql(&mut out);
        out
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Consume one part from the front of `s`, returning it and the remainder.
fn parse_part<'a>(s: &'a str, whole: &str) -> Result<(Part, &'a str)> {
    if let Some(quoted) = s.strip_prefix('"') {
        let mut name = String::new();
        let mut chars = quoted.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c != '"' {
                name.push(c);
                continue;
            }
            if matches!(chars.peek(), Some((_, '"'))) {
                chars.next();
                name.push('"');
                continue;
            }
            if name.is_empty() {
                return Err(Error::malformed_predicate("empty quoted identifier"));
            }
            return Ok((Part::Quoted(name), &quoted[i + 1..]));
        }
        return Err(Error::malformed_predicate(format!(
            "unclosed quoted identifier in {whole:?}"
        )));
    }

    let end = s.find('.').unwrap_or(s.len());
    let name = &s[..end];
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        Some(c) => {
            return Err(Error::malformed_predicate(format!(
                "invalid identifier start character '{c}' in {whole:?}"
            )));
        }
        None => {
            return Err(Error::malformed_predicate(format!(
                "empty identifier segment in {whole:?}"
            )));
        }
    }
    if let Some(c) = chars.find(|&c| !(c == '_' || c == '$' || c.is_ascii_alphanumeric())) {
        return Err(Error::malformed_predicate(format!(
            "invalid character '{c}' in identifier {whole:?}"
        )));
    }
    Ok((Part::Bare(name.to_owned()), &s[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_dotted_names() {
        assert_eq!(Ident::parse("switches").unwrap().to_sql(), "switches");
        assert_eq!(
            Ident::parse("inventory.switches").unwrap().to_sql(),
            "inventory.switches"
        );
        assert_eq!(Ident::parse("vlan$1").unwrap().to_sql(), "vlan$1");
    }

    #[test]
    fn quoted_names_keep_their_case_and_escapes() {
        assert_eq!(Ident::parse(r#""SysName""#).unwrap().to_sql(), r#""SysName""#);
        assert_eq!(Ident::parse(r#""a""b""#).unwrap().to_sql(), r#""a""b""#);
        assert_eq!(
            Ident::parse(r#"inventory."Switch Table".id"#).unwrap().to_sql(),
            r#"inventory."Switch Table".id"#
        );
    }

    #[test]
    fn injection_attempts_are_rejected() {
        for bad in [
            "",
            "1table",
            "my table",
            "name; DROP TABLE x",
            "a..b",
            "a.",
            r#""unclosed"#,
            r#""""#,
            "vlan=1",
        ] {
            let err = Ident::parse(bad).unwrap_err();
            assert!(
                matches!(err, Error::MalformedPredicate(_)),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn columns_are_single_part() {
        assert!(Ident::column("sysname").is_ok());
        assert!(Ident::column("switches.sysname").is_err());
    }
}
