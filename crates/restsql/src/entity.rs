//! Entity descriptors and field enumeration.
//!
//! A struct becomes mappable by implementing [`Entity`], normally through
//! `#[derive(Entity)]`. The derive emits an ordered [`Field`] table and the
//! accessors that move values between the struct and a row. Only `pub` fields
//! take part; `#[orm(skip)]` (or `#[orm(column = "-")]`) leaves a field out and
//! `#[orm(column = "name")]` renames its column.
//!
//! ```ignore
//! #[derive(Entity, Default)]
//! pub struct Switch {
//!     pub sysname: String,
//!     pub vlan: Option<i32>,
//!     #[orm(column = "mgmt_ip")]
//!     pub mgmt: Option<Ip>,
//!     #[orm(skip)]
//!     pub cached: bool,
//! }
//! ```

use crate::client::RowReader;
use crate::error::{Error, Result};
use crate::ident::Ident;
use crate::search::Search;
use crate::value::Value;

/// One mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Field {
    /// Rust field name.
    pub name: &'static str,
    /// Column it maps to.
    pub column: &'static str,
    /// Stored as `Option<T>`: absent is skipped on write, NULL reads as absent.
    pub nullable: bool,
}

/// A struct mapped onto the rows of one table.
pub trait Entity: Sized + Send + Sync {
    /// Mapped fields in declaration order.
    const FIELDS: &'static [Field];

    /// Current value of each mapped field, parallel to [`Entity::FIELDS`].
    ///
    /// `None` marks an absent optional field.
    fn field_values(&self) -> Vec<Option<Value>>;

    /// Build a fresh value from a row. Unmapped fields take their defaults.
    fn from_row(row: &mut RowReader) -> Result<Self>;

    /// Overwrite the mapped fields of `self` from a row.
    ///
    /// Every column is scanned before any field is assigned, so on error
    /// `self` is unchanged. Unmapped fields are never touched.
    fn read_row(&mut self, row: &mut RowReader) -> Result<()>;
}

impl<T: Entity> Entity for Box<T> {
    const FIELDS: &'static [Field] = T::FIELDS;

    fn field_values(&self) -> Vec<Option<Value>> {
        (**self).field_values()
    }

    fn from_row(row: &mut RowReader) -> Result<Self> {
        T::from_row(row).map(Box::new)
    }

    fn read_row(&mut self, row: &mut RowReader) -> Result<()> {
        (**self).read_row(row)
    }
}

fn column_ident<E: Entity>(field: &Field) -> Result<Ident> {
    Ident::column(field.column).map_err(|e| {
        Error::invalid_target(format!(
            "{}.{}: {e}",
            std::any::type_name::<E>(),
            field.name
        ))
    })
}

fn check_shape<E: Entity>() -> Result<()> {
    if E::FIELDS.is_empty() {
        return Err(Error::invalid_target(format!(
            "{} has no mapped fields",
            std::any::type_name::<E>()
        )));
    }
    Ok(())
}

/// SELECT list for `E`: every mapped column, in order.
pub fn select_columns<E: Entity>() -> Result<Vec<Ident>> {
    check_shape::<E>()?;
    E::FIELDS.iter().map(column_ident::<E>).collect()
}

/// Column/value pairs to write for `entity`.
///
/// Columns referenced by `exclude` are left out (they are the row's key, not
/// a SET target), and so are absent optional fields. Exclusion compares
/// column names case-sensitively.
pub fn write_columns<E: Entity>(entity: &E, exclude: &Search) -> Result<Vec<(Ident, Value)>> {
    check_shape::<E>()?;
    let values = entity.field_values();
    if values.len() != E::FIELDS.len() {
        return Err(Error::invalid_target(format!(
            "{} reported {} values for {} fields",
            std::any::type_name::<E>(),
            values.len(),
            E::FIELDS.len()
        )));
    }

    let mut out = Vec::with_capacity(values.len());
    for (field, value) in E::FIELDS.iter().zip(values) {
        if exclude.references(field.column) {
            continue;
        }
        let Some(value) = value else {
            continue;
        };
        out.push((column_ident::<E>(field)?, value));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Row;
    use crate::value::ToValue;

    #[derive(Debug, Default, PartialEq)]
    struct Port {
        name: String,
        speed: Option<i32>,
        note: String,
    }

    impl Entity for Port {
        const FIELDS: &'static [Field] = &[
            Field {
                name: "name",
                column: "name",
                nullable: false,
            },
            Field {
                name: "speed",
                column: "speed_mbps",
                nullable: true,
            },
        ];

        fn field_values(&self) -> Vec<Option<Value>> {
            vec![
                Some(self.name.to_value()),
                self.speed.as_ref().map(ToValue::to_value),
            ]
        }

        fn from_row(row: &mut RowReader) -> Result<Self> {
            let mut port = Self::default();
            port.read_row(row)?;
            Ok(port)
        }

        fn read_row(&mut self, row: &mut RowReader) -> Result<()> {
            let name = row.column("name")?;
            let speed = row.column("speed_mbps")?;
            self.name = name;
            self.speed = speed;
            Ok(())
        }
    }

    struct Empty;

    impl Entity for Empty {
        const FIELDS: &'static [Field] = &[];

        fn field_values(&self) -> Vec<Option<Value>> {
            Vec::new()
        }

        fn from_row(_: &mut RowReader) -> Result<Self> {
            Ok(Empty)
        }

        fn read_row(&mut self, _: &mut RowReader) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn select_lists_every_column() {
        let cols: Vec<String> = select_columns::<Port>()
            .unwrap()
            .iter()
            .map(Ident::to_sql)
            .collect();
        assert_eq!(cols, ["name", "speed_mbps"]);
    }

    #[test]
    fn writes_skip_absent_and_excluded_columns() {
        let port = Port {
            name: "ge-0/0/1".into(),
            speed: None,
            note: String::new(),
        };
        let cols = write_columns(&port, &Search::all()).unwrap();
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].0.to_sql(), "name");

        let key = Search::new().eq("name", "ge-0/0/1").unwrap();
        let port = Port {
            speed: Some(0),
            ..port
        };
        let cols = write_columns(&port, &key).unwrap();
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].0.to_sql(), "speed_mbps");
        assert_eq!(cols[0].1, Value::Int(0));
    }

    #[test]
    fn exclusion_is_case_sensitive() {
        let port = Port::default();
        let key = Search::new().eq("Name", "x").unwrap();
        let cols = write_columns(&port, &key).unwrap();
        assert_eq!(cols[0].0.to_sql(), "name");
    }

    #[test]
    fn no_fields_is_invalid_target() {
        assert!(matches!(
            select_columns::<Empty>(),
            Err(Error::InvalidTarget(_))
        ));
        assert!(matches!(
            write_columns(&Empty, &Search::all()),
            Err(Error::InvalidTarget(_))
        ));
    }

    #[test]
    fn failed_read_leaves_value_alone() {
        let mut port = Port {
            name: "old".into(),
            speed: Some(10),
            note: "kept".into(),
        };
        let row = Row::new(
            vec!["name".to_string(), "speed_mbps".to_string()].into(),
            vec![Value::Text("new".into()), Value::Text("fast".into())],
        );
        assert!(port.read_row(&mut RowReader::new(row)).is_err());
        assert_eq!(port.name, "old");
        assert_eq!(port.speed, Some(10));

        let row = Row::new(
            vec!["name".to_string(), "speed_mbps".to_string()].into(),
            vec![Value::Text("new".into()), Value::Null],
        );
        port.read_row(&mut RowReader::new(row)).unwrap();
        assert_eq!(port.name, "new");
        assert_eq!(port.speed, None);
        assert_eq!(port.note, "kept");
    }

    #[test]
    fn boxed_entities_forward() {
        assert_eq!(<Box<Port> as Entity>::FIELDS.len(), 2);
        let row = Row::new(
            vec!["name".to_string(), "speed_mbps".to_string()].into(),
            vec![Value::Text("xe-1".into()), Value::Int(100)],
        );
        let port = <Box<Port>>::from_row(&mut RowReader::new(row)).unwrap();
        assert_eq!(port.speed, Some(100));
    }
}
