use crate::dialect::Dialect;
use crate::ident::Ident;
use crate::search::Search;
use crate::value::{ToValue, Value};

#[derive(Debug, Clone)]
enum SqlPart {
    Raw(String),
    Param,
}

/// A parameter-safe SQL builder.
///
/// `Sql` stores SQL pieces and parameters separately. Placeholders are only
/// rendered by [`Sql::to_sql`], so the same fragment can be emitted for any
/// [`Dialect`] and parameter numbering always follows push order.
#[must_use]
#[derive(Debug, Clone, Default)]
pub struct Sql {
    parts: Vec<SqlPart>,
    params: Vec<Value>,
}

impl Sql {
    /// Create a new builder with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        Self {
            parts: vec![SqlPart::Raw(initial_sql.into())],
            params: Vec::new(),
        }
    }

    /// Create an empty builder.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }
        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    /// Append a placeholder and bind its value.
    pub fn push_bind(&mut self, value: impl ToValue) -> &mut Self {
        self.push_value(value.to_value())
    }

    pub(crate) fn push_value(&mut self, value: Value) -> &mut Self {
        self.parts.push(SqlPart::Param);
        self.params.push(value);
        self
    }

    /// Append a validated identifier.
    pub fn push_ident(&mut self, ident: &Ident) -> &mut Self {
        let mut out = String::new();
        ident.write_sql(&mut out);
        self.push(&out)
    }

    /// Append `a, b, c`.
    pub fn push_ident_list<'a>(&mut self, idents: impl IntoIterator<Item = &'a Ident>) -> &mut Self {
        for (i, ident) in idents.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_ident(ident);
        }
        self
    }

    /// Append `$1, $2, ...` for each value.
    pub fn push_bind_list(&mut self, values: impl IntoIterator<Item = Value>) -> &mut Self {
        for (i, v) in values.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_value(v);
        }
        self
    }

    /// Append a `WHERE ...` clause with the predicates joined by `AND`.
    ///
    /// If `search` is empty, this is a no-op.
    pub fn push_where(&mut self, search: &Search) -> &mut Self {
        for (i, p) in search.iter().enumerate() {
            self.push(if i == 0 { " WHERE " } else { " AND " });
            self.push_ident(p.ident());
            self.push(" ");
            self.push(p.op().as_sql());
            self.push(" ");
            self.push_value(p.value().clone());
        }
        self
    }

    /// Render the statement text for `dialect`.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let cap: usize = self
            .parts
            .iter()
            .map(|p| match p {
                SqlPart::Raw(s) => s.len(),
                SqlPart::Param => 4,
            })
            .sum();
        let mut out = String::with_capacity(cap);
        let mut idx = 0;
        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => {
                    idx += 1;
                    dialect.write_placeholder(&mut out, idx);
                }
            }
        }
        out
    }

    /// Bound values in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_params(self) -> Vec<Value> {
        self.params
    }
}
