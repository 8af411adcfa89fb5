//! Field-level `#[orm(...)]` attributes.

use crate::sql_ident::parse_sql_ident_with_span;
use syn::Result;

/// Where a field's value goes.
pub(super) enum Mapping {
    Column(String),
    Skip,
}

struct FieldAttr {
    skip: bool,
    column: Option<syn::LitStr>,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut skip = false;
        let mut column = None;

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "skip" {
                skip = true;
            } else if ident == "column" {
                let _: syn::Token![=] = input.parse()?;
                column = Some(input.parse::<syn::LitStr>()?);
            } else {
                return Err(syn::Error::new(
                    ident.span(),
                    format!("unknown orm attribute `{ident}` (expected `column` or `skip`)"),
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(FieldAttr { skip, column })
    }
}

/// Resolve the mapping of one field from its `#[orm]` attributes.
///
/// The column defaults to the field name. `column = "-"` is the same as
/// `skip`.
pub(super) fn field_mapping(field: &syn::Field) -> Result<Mapping> {
    let mut column: Option<syn::LitStr> = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let parsed: FieldAttr = attr.parse_args()?;
        if parsed.skip {
            return Ok(Mapping::Skip);
        }
        if parsed.column.is_some() {
            column = parsed.column;
        }
    }

    match column {
        Some(lit) if lit.value() == "-" => Ok(Mapping::Skip),
        Some(lit) => Ok(Mapping::Column(parse_sql_ident_with_span(
            &lit.value(),
            lit.span(),
            "column",
        )?)),
        None => {
            let name = field
                .ident
                .as_ref()
                .map(|i| i.to_string())
                .unwrap_or_default();
            let name = name.strip_prefix("r#").unwrap_or(&name).to_string();
            Ok(Mapping::Column(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn mapping(field: syn::Field) -> Option<String> {
        match field_mapping(&field).unwrap() {
            Mapping::Column(c) => Some(c),
            Mapping::Skip => None,
        }
    }

    #[test]
    fn column_defaults_to_field_name() {
        let field: syn::Field = parse_quote!(pub sysname: Option<String>);
        assert_eq!(mapping(field).as_deref(), Some("sysname"));

        let field: syn::Field = parse_quote!(pub r#type: String);
        assert_eq!(mapping(field).as_deref(), Some("type"));
    }

    #[test]
    fn column_attribute_renames() {
        let field: syn::Field = parse_quote!(#[orm(column = "mgmt_v4_addr")] pub mgmt_v4: Option<Ip>);
        assert_eq!(mapping(field).as_deref(), Some("mgmt_v4_addr"));
    }

    #[test]
    fn skip_forms() {
        let field: syn::Field = parse_quote!(#[orm(skip)] pub seen: bool);
        assert_eq!(mapping(field), None);
        let field: syn::Field = parse_quote!(#[orm(column = "-")] pub ignored: Option<String>);
        assert_eq!(mapping(field), None);
    }

    #[test]
    fn bad_attributes_are_errors() {
        let field: syn::Field = parse_quote!(#[orm(column = "a b")] pub x: i32);
        assert!(field_mapping(&field).is_err());
        let field: syn::Field = parse_quote!(#[orm(id)] pub x: i32);
        assert!(field_mapping(&field).is_err());
    }
}
