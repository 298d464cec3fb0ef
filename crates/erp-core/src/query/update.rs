//! UPDATE builder.

use super::{compiled, placeholder, Parameterized, Query, ValueMap};
use crate::config::AuditColumns;
use crate::context::CallerContext;
use crate::error::{CoreResult, ValidationError};
use crate::validation::{validate_column_name, validate_table_name};
use crate::value::Value;

/// Keys `set_values` never copies from a client payload.
pub const UPDATE_DENYLIST: [&str; 10] = [
    "ip",
    "device",
    "login",
    "pagination",
    "ide_empr",
    "ide_sucu",
    "ide_usua",
    "fecha_ingre",
    "hora_ingre",
    "uuid",
];

/// An UPDATE of rows matching a WHERE fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    base: Query,
    table: String,
    primary_key: String,
    values: ValueMap,
    where_clause: Option<String>,
}

impl UpdateQuery {
    /// Creates an UPDATE seeded with the default audit column names.
    pub fn new(
        table: impl Into<String>,
        primary_key: impl Into<String>,
        context: Option<&CallerContext>,
    ) -> Self {
        Self::with_audit_columns(table, primary_key, context, &AuditColumns::default())
    }

    /// Creates an UPDATE that seeds the last-modified-by column when the
    /// context carries an acting user.
    pub fn with_audit_columns(
        table: impl Into<String>,
        primary_key: impl Into<String>,
        context: Option<&CallerContext>,
        audit: &AuditColumns,
    ) -> Self {
        let mut values = ValueMap::new();
        if let Some(user) = context.and_then(|c| c.acting_user.as_ref()) {
            values.set(&audit.updated_by, Value::Text(user.clone()));
        }

        let mut base = Query::default();
        base.set_context(context.cloned());

        UpdateQuery {
            base,
            table: table.into(),
            primary_key: primary_key.into(),
            values,
            where_clause: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    pub fn where_clause(&self) -> Option<&str> {
        self.where_clause.as_deref()
    }

    pub fn set_value(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.values.set(column, value.into());
        self
    }

    /// Copies every entry of a client payload except the denylisted keys.
    ///
    /// ## Example
    /// ```rust
    /// use erp_core::UpdateQuery;
    /// use serde_json::json;
    ///
    /// let payload = json!({"nombre": "Agua", "ide_empr": 99, "ip": "10.0.0.1"});
    /// let mut query = UpdateQuery::new("producto", "ide_prod", None);
    /// query.set_values(payload.as_object().unwrap());
    ///
    /// assert_eq!(query.values().keys().collect::<Vec<_>>(), vec!["nombre"]);
    /// ```
    pub fn set_values(&mut self, entry: &serde_json::Map<String, serde_json::Value>) -> &mut Self {
        for (key, value) in entry {
            if UPDATE_DENYLIST.iter().any(|d| d.eq_ignore_ascii_case(key)) {
                continue;
            }
            self.values.set(key, Value::from_json(value));
        }
        self
    }

    /// Drops every value whose column fails `keep`.
    pub fn retain_columns(&mut self, keep: impl Fn(&str) -> bool) -> &mut Self {
        self.values.retain(keep);
        self
    }

    /// Sets the WHERE fragment. Values belong in params, not in the text.
    pub fn set_where(&mut self, fragment: impl Into<String>) -> &mut Self {
        self.where_clause = Some(fragment.into());
        self
    }

    /// Builds `UPDATE <table> SET c = ?n, ... WHERE <fragment>`.
    ///
    /// SET placeholders are numbered after the params already added for
    /// the WHERE fragment.
    pub fn compile(&self) -> CoreResult<Query> {
        validate_table_name(&self.table)?;

        let where_clause = match self.where_clause.as_deref().map(str::trim) {
            Some(w) if !w.is_empty() => w,
            _ => {
                return Err(ValidationError::MissingWhereClause {
                    statement: "UPDATE".to_string(),
                    table: self.table.clone(),
                }
                .into())
            }
        };

        if self.values.is_empty() {
            return Err(ValidationError::NoValues {
                statement: "UPDATE".to_string(),
                table: self.table.clone(),
            }
            .into());
        }

        let offset = self.base.params().len();
        let mut assignments = Vec::with_capacity(self.values.len());
        let mut values = Vec::with_capacity(self.values.len());
        for (i, (column, value)) in self.values.iter().enumerate() {
            validate_column_name(column)?;
            assignments.push(format!("{} = {}", column, placeholder(offset + i + 1)));
            values.push(value.clone());
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            self.table,
            assignments.join(", "),
            where_clause
        );

        Ok(compiled(&self.base, sql, values))
    }
}

impl Parameterized for UpdateQuery {
    fn base(&self) -> &Query {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Query {
        &mut self.base
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use serde_json::json;

    #[test]
    fn test_seeds_only_updated_by() {
        let ctx = CallerContext::new().tenant(1).branch(2).user("ana");
        let query = UpdateQuery::new("producto", "ide_prod", Some(&ctx));

        assert_eq!(query.values().keys().collect::<Vec<_>>(), vec!["usuario_actua"]);
        assert_eq!(query.values().get("usuario_actua"), Some(&Value::from("ana")));
    }

    #[test]
    fn test_no_user_seeds_nothing() {
        let ctx = CallerContext::new().tenant(1);
        let query = UpdateQuery::new("producto", "ide_prod", Some(&ctx));
        assert!(query.values().is_empty());
    }

    #[test]
    fn test_set_values_skips_denylist() {
        let payload = json!({
            "nombre": "Agua",
            "precio": 1.5,
            "ip": "10.0.0.1",
            "device": "pos-1",
            "login": "ana",
            "pagination": {"page": 1},
            "ide_empr": 1,
            "IDE_SUCU": 2,
            "ide_usua": 3,
            "fecha_ingre": "2026-01-01",
            "hora_ingre": "10:00:00",
            "uuid": "abc"
        });

        let mut query = UpdateQuery::new("producto", "ide_prod", None);
        query.set_values(payload.as_object().unwrap());

        let mut keys: Vec<_> = query.values().keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["nombre", "precio"]);
        assert_eq!(query.values().get("precio"), Some(&Value::Float(1.5)));
    }

    #[test]
    fn test_where_params_come_first() {
        let mut query = UpdateQuery::new("producto", "ide_prod", None);
        query
            .set_value("nombre", "Agua")
            .set_where("ide_prod = ?1")
            .add_int_param(1, 10);

        let compiled = query.compile().unwrap();
        assert_eq!(compiled.sql(), "UPDATE producto SET nombre = ?2 WHERE ide_prod = ?1");
        assert_eq!(compiled.param_values(), vec![Value::Int(10), Value::from("Agua")]);
    }

    #[test]
    fn test_compile_requires_where() {
        let mut query = UpdateQuery::new("producto", "ide_prod", None);
        query.set_value("nombre", "Agua");
        assert!(matches!(
            query.compile(),
            Err(CoreError::Validation(ValidationError::MissingWhereClause { .. }))
        ));

        query.set_where("   ");
        assert!(query.compile().is_err());
    }

    #[test]
    fn test_compile_requires_values() {
        let mut query = UpdateQuery::new("producto", "ide_prod", None);
        query.set_where("ide_prod = ?1").add_int_param(1, 1);
        assert!(matches!(
            query.compile(),
            Err(CoreError::Validation(ValidationError::NoValues { .. }))
        ));
    }

    #[test]
    fn test_payload_key_cannot_inject_sql() {
        let payload = json!({"nombre = 'x', precio": 0});
        let mut query = UpdateQuery::new("producto", "ide_prod", None);
        query
            .set_values(payload.as_object().unwrap())
            .set_where("ide_prod = ?1")
            .add_int_param(1, 1);

        assert!(matches!(
            query.compile(),
            Err(CoreError::Validation(ValidationError::InvalidIdentifier { .. }))
        ));
    }

    #[test]
    fn test_retain_columns() {
        let ctx = CallerContext::new().user("ana");
        let mut query = UpdateQuery::new("producto", "ide_prod", Some(&ctx));
        query.set_value("nombre", "Agua");
        query.retain_columns(|c| c == "nombre");
        assert_eq!(query.values().keys().collect::<Vec<_>>(), vec!["nombre"]);
    }
}
