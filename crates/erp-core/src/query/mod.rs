//! # Query Family
//!
//! SQL text plus an ordered parameter list, specialized per SQL verb.
//!
//! ## Type Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Query Family                                    │
//! │                                                                         │
//! │                    ┌──────────────────────────┐                         │
//! │                    │ Query (base)             │                         │
//! │                    │  sql, params, context,   │                         │
//! │                    │  audit                   │                         │
//! │                    └────────────┬─────────────┘                         │
//! │                                 │ Parameterized (add_*_param,           │
//! │                                 │ param_values, set_audit)              │
//! │        ┌────────────────┬───────┴────────┬─────────────────┐           │
//! │        ▼                ▼                ▼                 ▼            │
//! │  SelectQuery      InsertQuery      UpdateQuery       DeleteQuery       │
//! │  free-form SQL    table, pk,       table, pk,        table, where      │
//! │                   values, columns  values, where                       │
//! │                                                                         │
//! │  Statement = one of the four; compile() → Query with final SQL.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Binding Contract
//! Parameters are bound **in the order they were added**, never sorted by
//! `index`. Placeholders use SQLite's numbered form (`?1`, `?2`, ...).
//! For generated statements the params added through `add_*_param` (the
//! WHERE params) come first, then the SET / VALUES params:
//!
//! ```text
//! UPDATE producto SET nombre = ?2 WHERE ide_prod = ?1
//! params: [ide_prod value, nombre value]
//! ```

mod delete;
mod insert;
mod select;
mod update;

pub use delete::DeleteQuery;
pub use insert::InsertQuery;
pub use select::SelectQuery;
pub use update::{UpdateQuery, UPDATE_DENYLIST};

use chrono::NaiveDate;

use crate::context::CallerContext;
use crate::error::CoreResult;
use crate::value::Value;

// =============================================================================
// Param
// =============================================================================

/// A positional query parameter.
///
/// `index` is informational only. Binding follows insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub index: usize,
    pub value: Value,
}

// =============================================================================
// Query (base)
// =============================================================================

/// SQL text with its ordered parameters, caller context and audit flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    sql: String,
    params: Vec<Param>,
    context: Option<CallerContext>,
    audit: bool,
}

impl Query {
    /// Creates a query from SQL text.
    pub fn new(sql: impl Into<String>) -> Self {
        Query {
            sql: sql.into(),
            ..Default::default()
        }
    }

    /// Attaches the caller context.
    pub fn with_context(mut self, context: CallerContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Returns the SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Leading SQL keyword, upper-cased (`"UPDATE"`). Empty for blank SQL.
    pub fn verb(&self) -> String {
        self.sql
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_uppercase()
    }

    /// Returns the parameters in call order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Returns the caller context, if any.
    pub fn context(&self) -> Option<&CallerContext> {
        self.context.as_ref()
    }

    pub(crate) fn set_context(&mut self, context: Option<CallerContext>) {
        self.context = context;
    }
}

// =============================================================================
// Parameterized
// =============================================================================

/// Parameter handling shared by every query kind.
pub trait Parameterized {
    /// The underlying base query.
    fn base(&self) -> &Query;

    /// The underlying base query, mutably.
    fn base_mut(&mut self) -> &mut Query;

    /// Appends a parameter. No dedup, no validation of `index`.
    fn add_param(&mut self, index: usize, value: impl Into<Value>) -> &mut Self
    where
        Self: Sized,
    {
        self.base_mut().params.push(Param {
            index,
            value: value.into(),
        });
        self
    }

    fn add_int_param(&mut self, index: usize, value: i64) -> &mut Self
    where
        Self: Sized,
    {
        self.add_param(index, Value::Int(value))
    }

    fn add_string_param(&mut self, index: usize, value: impl Into<String>) -> &mut Self
    where
        Self: Sized,
    {
        self.add_param(index, Value::Text(value.into()))
    }

    fn add_boolean_param(&mut self, index: usize, value: bool) -> &mut Self
    where
        Self: Sized,
    {
        self.add_param(index, Value::Bool(value))
    }

    fn add_date_param(&mut self, index: usize, value: NaiveDate) -> &mut Self
    where
        Self: Sized,
    {
        self.add_param(index, Value::Date(value))
    }

    fn add_int_array_param(&mut self, index: usize, values: Vec<i64>) -> &mut Self
    where
        Self: Sized,
    {
        self.add_param(index, Value::IntArray(values))
    }

    fn add_string_array_param(&mut self, index: usize, values: Vec<String>) -> &mut Self
    where
        Self: Sized,
    {
        self.add_param(index, Value::TextArray(values))
    }

    /// Projects the parameters to plain values, in call order.
    fn param_values(&self) -> Vec<Value> {
        self.base().params.iter().map(|p| p.value.clone()).collect()
    }

    /// Sets whether the gateway records this query in the audit log.
    fn set_audit(&mut self, audit: bool) -> &mut Self
    where
        Self: Sized,
    {
        self.base_mut().audit = audit;
        self
    }

    /// Returns whether this query is audited.
    fn is_audit(&self) -> bool {
        self.base().audit
    }
}

impl Parameterized for Query {
    fn base(&self) -> &Query {
        self
    }

    fn base_mut(&mut self) -> &mut Query {
        self
    }
}

// =============================================================================
// Ordered Value Map
// =============================================================================

/// Column → value map that keeps first-insertion order.
///
/// Keys are stored lower-cased; setting an existing key replaces its value
/// in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    entries: Vec<(String, Value)>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the value for `column`.
    pub fn set(&mut self, column: &str, value: Value) {
        let key = column.to_lowercase();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Returns the value for `column`, ignoring case.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Column names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keeps only the columns for which `keep` returns true.
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.entries.retain(|(k, _)| keep(k.as_str()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Statement
// =============================================================================

/// One entry of a batch: any query kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectQuery),
    Insert(InsertQuery),
    Update(UpdateQuery),
    Delete(DeleteQuery),
}

impl Statement {
    /// Compiles to a base query with final SQL and bound-order params.
    pub fn compile(&self) -> CoreResult<Query> {
        match self {
            Statement::Select(q) => Ok(q.compile()),
            Statement::Insert(q) => q.compile(),
            Statement::Update(q) => q.compile(),
            Statement::Delete(q) => q.compile(),
        }
    }

    pub fn as_insert(&self) -> Option<&InsertQuery> {
        match self {
            Statement::Insert(q) => Some(q),
            _ => None,
        }
    }

    pub fn as_update(&self) -> Option<&UpdateQuery> {
        match self {
            Statement::Update(q) => Some(q),
            _ => None,
        }
    }

    pub fn as_delete(&self) -> Option<&DeleteQuery> {
        match self {
            Statement::Delete(q) => Some(q),
            _ => None,
        }
    }
}

impl From<SelectQuery> for Statement {
    fn from(q: SelectQuery) -> Self {
        Statement::Select(q)
    }
}

impl From<InsertQuery> for Statement {
    fn from(q: InsertQuery) -> Self {
        Statement::Insert(q)
    }
}

impl From<UpdateQuery> for Statement {
    fn from(q: UpdateQuery) -> Self {
        Statement::Update(q)
    }
}

impl From<DeleteQuery> for Statement {
    fn from(q: DeleteQuery) -> Self {
        Statement::Delete(q)
    }
}

/// Renders the `n`-th (1-based) placeholder.
#[inline]
pub(crate) fn placeholder(n: usize) -> String {
    format!("?{}", n)
}

/// Builds the compiled query: base params first, then `values`.
pub(crate) fn compiled(base: &Query, sql: String, values: Vec<Value>) -> Query {
    let offset = base.params.len();
    let mut params = base.params.clone();
    params.extend(values.into_iter().enumerate().map(|(i, value)| Param {
        index: offset + i + 1,
        value,
    }));

    Query {
        sql,
        params,
        context: base.context.clone(),
        audit: base.audit,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_values_follow_call_order() {
        let mut query = Query::new("SELECT ?1, ?2");
        query.add_param(5, "a").add_param(1, "b");

        assert_eq!(
            query.param_values(),
            vec![Value::Text("a".to_string()), Value::Text("b".to_string())]
        );
        assert_eq!(query.params()[0].index, 5);
    }

    #[test]
    fn test_typed_params() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let mut query = Query::new("SELECT 1");
        query
            .add_int_param(1, 10)
            .add_string_param(2, "x")
            .add_boolean_param(3, true)
            .add_date_param(4, date)
            .add_int_array_param(5, vec![1, 2])
            .add_string_array_param(6, vec!["a".to_string()]);

        assert_eq!(
            query.param_values(),
            vec![
                Value::Int(10),
                Value::Text("x".to_string()),
                Value::Bool(true),
                Value::Date(date),
                Value::IntArray(vec![1, 2]),
                Value::TextArray(vec!["a".to_string()]),
            ]
        );
    }

    #[test]
    fn test_duplicate_indexes_are_kept() {
        let mut query = Query::new("SELECT 1");
        query.add_int_param(1, 1).add_int_param(1, 2);
        assert_eq!(query.params().len(), 2);
    }

    #[test]
    fn test_verb_is_leading_keyword() {
        assert_eq!(Query::new("  update producto SET x = 1").verb(), "UPDATE");
        assert_eq!(Query::new("").verb(), "");
    }

    #[test]
    fn test_set_audit() {
        let mut query = Query::new("DELETE FROM t WHERE id = ?1");
        assert!(!query.is_audit());
        query.set_audit(true);
        assert!(query.is_audit());
    }

    #[test]
    fn test_value_map_keeps_order_and_ignores_case() {
        let mut map = ValueMap::new();
        map.set("Nombre", Value::from("a"));
        map.set("precio", Value::Int(3));
        map.set("NOMBRE", Value::from("b"));

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["nombre", "precio"]);
        assert_eq!(map.get("nombre"), Some(&Value::from("b")));
        assert_eq!(map.len(), 2);
    }
}
