//! Search predicates: ordered `(column, operator, value)` triples.
//!
//! A [`Search`] is the WHERE clause of every mapper operation. Predicates are
//! AND-ed in the order they were added, and their values bind positionally in
//! that order. An empty search matches every row.
//!
//! ```ignore
//! let search = Search::new().eq("sysname", "e1-3")?;
//! let search = Search::new().add("vlan", ">=", 10)?.like("sysname", "e1-%")?;
//! ```

use crate::error::{Error, Result};
use crate::ident::Ident;
use crate::value::{ToValue, Value};
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
}

impl Op {
    pub fn as_sql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Op {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let op = match s.trim().to_ascii_uppercase().as_str() {
            "=" | "==" => Op::Eq,
            "!=" | "<>" => Op::Ne,
            "<" => Op::Lt,
            "<=" => Op::Lte,
            ">" => Op::Gt,
            ">=" => Op::Gte,
            "LIKE" => Op::Like,
            "NOT LIKE" => Op::NotLike,
            other => {
                return Err(Error::malformed_predicate(format!(
                    "unknown operator {other:?}"
                )));
            }
        };
        Ok(op)
    }
}

/// One `column <op> value` comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    column: Ident,
    name: String,
    op: Op,
    value: Value,
}

impl Predicate {
    pub fn new(column: &str, op: Op, value: impl ToValue) -> Result<Self> {
        Ok(Self {
            column: Ident::column(column)?,
            name: column.to_owned(),
            op,
            value: value.to_value(),
        })
    }

    /// Build a predicate from a textual operator such as `"="` or `"NOT LIKE"`.
    pub fn parse(column: &str, op: &str, value: impl ToValue) -> Result<Self> {
        Self::new(column, op.parse()?, value)
    }

    /// Column name as given.
    pub fn column(&self) -> &str {
        &self.name
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn ident(&self) -> &Ident {
        &self.column
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.op, self.value)
    }
}

/// An ordered list of predicates, AND-ed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Search {
    predicates: Vec<Predicate>,
}

impl Search {
    pub fn new() -> Self {
        Self::default()
    }

    /// The empty search, matching every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Append a predicate.
    pub fn push(&mut self, predicate: Predicate) -> &mut Self {
        self.predicates.push(predicate);
        self
    }

    /// Append a predicate with a textual operator.
    pub fn add(mut self, column: &str, op: &str, value: impl ToValue) -> Result<Self> {
        self.predicates.push(Predicate::parse(column, op, value)?);
        Ok(self)
    }

    pub fn with(mut self, column: &str, op: Op, value: impl ToValue) -> Result<Self> {
        self.predicates.push(Predicate::new(column, op, value)?);
        Ok(self)
    }

    pub fn eq(self, column: &str, value: impl ToValue) -> Result<Self> {
        self.with(column, Op::Eq, value)
    }

    pub fn ne(self, column: &str, value: impl ToValue) -> Result<Self> {
        self.with(column, Op::Ne, value)
    }

    pub fn lt(self, column: &str, value: impl ToValue) -> Result<Self> {
        self.with(column, Op::Lt, value)
    }

    pub fn lte(self, column: &str, value: impl ToValue) -> Result<Self> {
        self.with(column, Op::Lte, value)
    }

    pub fn gt(self, column: &str, value: impl ToValue) -> Result<Self> {
        self.with(column, Op::Gt, value)
    }

    pub fn gte(self, column: &str, value: impl ToValue) -> Result<Self> {
        self.with(column, Op::Gte, value)
    }

    pub fn like(self, column: &str, pattern: impl ToValue) -> Result<Self> {
        self.with(column, Op::Like, pattern)
    }

    pub fn not_like(self, column: &str, pattern: impl ToValue) -> Result<Self> {
        self.with(column, Op::NotLike, pattern)
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Whether `column` is the haystack of any predicate.
    pub fn references(&self, column: &str) -> bool {
        self.predicates.iter().any(|p| p.name == column)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Predicate> {
        self.predicates.iter()
    }
}

impl From<Predicate> for Search {
    fn from(predicate: Predicate) -> Self {
        Self {
            predicates: vec![predicate],
        }
    }
}

impl FromIterator<Predicate> for Search {
    fn from_iter<I: IntoIterator<Item = Predicate>>(iter: I) -> Self {
        Self {
            predicates: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Search {
    type Item = &'a Predicate;
    type IntoIter = std::slice::Iter<'a, Predicate>;

    fn into_iter(self) -> Self::IntoIter {
        self.predicates.iter()
    }
}

impl fmt::Display for Search {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.predicates.is_empty() {
            return f.write_str("<all>");
        }
        for (i, p) in self.predicates.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{p}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_parse_case_insensitively() {
        assert_eq!("=".parse::<Op>().unwrap(), Op::Eq);
        assert_eq!("<>".parse::<Op>().unwrap(), Op::Ne);
        assert_eq!("like".parse::<Op>().unwrap(), Op::Like);
        assert_eq!(" not like ".parse::<Op>().unwrap(), Op::NotLike);
        assert!(matches!(
            "~~".parse::<Op>(),
            Err(Error::MalformedPredicate(_))
        ));
    }

    #[test]
    fn predicates_keep_insertion_order() {
        let search = Search::new()
            .eq("sysname", "e1-3")
            .unwrap()
            .add("vlan", ">", 10)
            .unwrap();
        let cols: Vec<_> = search.iter().map(|p| p.column()).collect();
        assert_eq!(cols, ["sysname", "vlan"]);
        assert_eq!(search.predicates()[1].value(), &Value::Int(10));
        assert_eq!(search.to_string(), r#"sysname = "e1-3" AND vlan > 10"#);
    }

    #[test]
    fn bad_columns_are_malformed() {
        assert!(matches!(
            Search::new().eq("vlan; --", 1),
            Err(Error::MalformedPredicate(_))
        ));
        assert!(Predicate::parse("", "=", 1).is_err());
        assert!(Predicate::parse("switches.vlan", "=", 1).is_err());
    }

    #[test]
    fn empty_search_matches_all() {
        let search = Search::all();
        assert!(search.is_empty());
        assert_eq!(search.to_string(), "<all>");
    }

    #[test]
    fn references_is_case_sensitive() {
        let search = Search::new().eq("sysname", "x").unwrap();
        assert!(search.references("sysname"));
        assert!(!search.references("Sysname"));
    }
}
