//! Derive macro for restsql
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod common;
mod entity;
mod sql_ident;

/// Derive the `Entity` descriptor for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use restsql::Entity;
///
/// #[derive(Default, Entity)]
/// pub struct Switch {
///     pub sysname: Option<String>,
///     #[orm(column = "mgmt_v4_addr")]
///     pub mgmt_v4: Option<restsql::Ip>,
///     #[orm(skip)]
///     pub seen: bool,
///     cache: Vec<u8>,
/// }
/// ```
///
/// Only `pub` fields are mapped, in declaration order. Unmapped fields must
/// implement `Default`: rows build fresh values with them defaulted.
///
/// # Attributes
///
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(skip)]` or `#[orm(column = "-")]` - Leave the field unmapped
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
