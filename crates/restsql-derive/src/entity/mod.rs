//! Entity derive macro implementation

mod attrs;

use crate::common::syn_types::option_inner;
use attrs::{Mapping, field_mapping};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use std::collections::HashSet;
use syn::{Data, DeriveInput, Fields, Result, Visibility};

struct MappedField<'a> {
    ident: &'a syn::Ident,
    ty: &'a syn::Type,
    column: String,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let mut mapped = Vec::new();
    let mut unmapped = Vec::new();
    let mut seen = HashSet::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let mapping = field_mapping(field)?;
        let column = match (&field.vis, mapping) {
            (Visibility::Public(_), Mapping::Column(column)) => column,
            _ => {
                unmapped.push(ident);
                continue;
            }
        };
        if !seen.insert(column.clone()) {
            return Err(syn::Error::new_spanned(
                field,
                format!("column `{column}` is mapped by more than one field"),
            ));
        }
        mapped.push(MappedField {
            ident,
            ty: &field.ty,
            column,
        });
    }

    let descriptors = mapped.iter().map(|f| {
        let field_name = f.ident.to_string();
        let field_name = field_name.strip_prefix("r#").unwrap_or(&field_name);
        let column = &f.column;
        let nullable = option_inner(f.ty).is_some();
        quote! {
            ::restsql::Field { name: #field_name, column: #column, nullable: #nullable }
        }
    });

    let values = mapped.iter().map(|f| {
        let ident = f.ident;
        if option_inner(f.ty).is_some() {
            quote! { self.#ident.as_ref().map(::restsql::ToValue::to_value) }
        } else {
            quote! { ::core::option::Option::Some(::restsql::ToValue::to_value(&self.#ident)) }
        }
    });

    let locals: Vec<_> = mapped
        .iter()
        .map(|f| format_ident!("__restsql_{}", f.ident))
        .collect();
    let scans: Vec<_> = mapped
        .iter()
        .zip(&locals)
        .map(|(f, local)| {
            let ty = f.ty;
            let column = &f.column;
            quote! { let #local: #ty = row.column::<#ty>(#column)?; }
        })
        .collect();
    let idents: Vec<_> = mapped.iter().map(|f| f.ident).collect();

    Ok(quote! {
        impl #impl_generics ::restsql::Entity for #name #ty_generics #where_clause {
            const FIELDS: &'static [::restsql::Field] = &[#(#descriptors),*];

            fn field_values(&self) -> ::std::vec::Vec<::core::option::Option<::restsql::Value>> {
                ::std::vec![#(#values),*]
            }

            fn from_row(row: &mut ::restsql::RowReader) -> ::restsql::Result<Self> {
                #(#scans)*
                ::core::result::Result::Ok(Self {
                    #(#idents: #locals,)*
                    #(#unmapped: ::core::default::Default::default(),)*
                })
            }

            fn read_row(&mut self, row: &mut ::restsql::RowReader) -> ::restsql::Result<()> {
                #(#scans)*
                #(self.#idents = #locals;)*
                ::core::result::Result::Ok(())
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn expands_public_fields_only() {
        let input: DeriveInput = parse_quote! {
            pub struct Switch {
                pub sysname: Option<String>,
                #[orm(column = "mgmt_vlan")]
                pub vlan: Option<i32>,
                #[orm(skip)]
                pub seen: bool,
                cache: Vec<u8>,
            }
        };
        let out = expand(input).unwrap().to_string();
        assert!(out.contains("column : \"sysname\""));
        assert!(out.contains("column : \"mgmt_vlan\""));
        assert!(!out.contains("\"seen\""));
        assert!(!out.contains("\"cache\""));
        assert!(out.contains("seen :"));
    }

    #[test]
    fn rejects_tuple_structs_and_enums() {
        let input: DeriveInput = parse_quote!(pub struct Pair(pub i32, pub i32););
        assert!(expand(input).is_err());
        let input: DeriveInput = parse_quote!(pub enum Kind { A, B });
        assert!(expand(input).is_err());
    }

    #[test]
    fn rejects_duplicate_columns() {
        let input: DeriveInput = parse_quote! {
            pub struct Twice {
                pub vlan: i32,
                #[orm(column = "vlan")]
                pub other: i32,
            }
        };
        assert!(expand(input).is_err());
    }
}
