//! Free-form SELECT used for reports and for materializing a DataStore.

use super::{Parameterized, Query};
use crate::context::CallerContext;

/// A read query. The SQL text is used as given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    base: Query,
}

impl SelectQuery {
    /// Creates a SELECT from SQL text.
    ///
    /// ## Example
    /// ```rust
    /// use erp_core::{Parameterized, SelectQuery};
    ///
    /// let mut query = SelectQuery::new("SELECT * FROM producto WHERE ide_prod = ?1");
    /// query.add_int_param(1, 10);
    /// assert_eq!(query.param_values().len(), 1);
    /// ```
    pub fn new(sql: impl Into<String>) -> Self {
        SelectQuery {
            base: Query::new(sql),
        }
    }

    /// Attaches the caller context.
    pub fn with_context(mut self, context: CallerContext) -> Self {
        self.base.set_context(Some(context));
        self
    }

    pub fn sql(&self) -> &str {
        self.base.sql()
    }

    /// Returns the executable query. Never fails.
    pub fn compile(&self) -> Query {
        self.base.clone()
    }
}

impl Parameterized for SelectQuery {
    fn base(&self) -> &Query {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Query {
        &mut self.base
    }
}

impl From<&str> for SelectQuery {
    fn from(sql: &str) -> Self {
        SelectQuery::new(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_compile_keeps_sql_and_params() {
        let mut query = SelectQuery::new("SELECT * FROM producto WHERE nombre = ?1")
            .with_context(CallerContext::new().tenant(1));
        query.add_string_param(1, "Agua");

        let compiled = query.compile();
        assert_eq!(compiled.sql(), "SELECT * FROM producto WHERE nombre = ?1");
        assert_eq!(compiled.param_values(), vec![Value::from("Agua")]);
        assert_eq!(compiled.context().and_then(|c| c.tenant_id), Some(1));
    }
}
