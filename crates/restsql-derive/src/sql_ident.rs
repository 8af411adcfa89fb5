use proc_macro2::Span;
use syn::{Error, Result};

pub(crate) fn is_valid_sql_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn parse_sql_ident_with_span(s: &str, span: Span, what: &str) -> Result<String> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::new(span, format!("{what} must not be empty")));
    }
    if !is_valid_sql_ident(s) {
        return Err(Error::new(
            span,
            format!("{what} must be a valid SQL identifier (expected [A-Za-z_][A-Za-z0-9_]*)"),
        ));
    }
    Ok(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(is_valid_sql_ident("mgmt_v4_addr"));
        assert!(is_valid_sql_ident("_hidden"));
        assert!(is_valid_sql_ident("Sysname"));
    }

    #[test]
    fn rejects_everything_else() {
        assert!(!is_valid_sql_ident(""));
        assert!(!is_valid_sql_ident("1st"));
        assert!(!is_valid_sql_ident("a-b"));
        assert!(!is_valid_sql_ident("name; drop table x"));
        assert!(parse_sql_ident_with_span("  ", Span::call_site(), "column").is_err());
        assert_eq!(
            parse_sql_ident_with_span(" vlan ", Span::call_site(), "column").unwrap(),
            "vlan"
        );
    }
}
