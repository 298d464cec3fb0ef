//! INSERT builder with audit-column seeding.

use chrono::Utc;

use super::{compiled, placeholder, Parameterized, Query, ValueMap};
use crate::config::AuditColumns;
use crate::context::CallerContext;
use crate::error::{CoreResult, ValidationError};
use crate::validation::{validate_column_name, validate_table_name};
use crate::value::Value;

/// An INSERT of one row.
///
/// ## Column List
/// - `columns` empty: every key of `values`, in insertion order
/// - `columns` set (DataStore batch insert): exactly `columns`, missing
///   values bound as NULL. Seeded audit columns outside this list are
///   dropped, so tables without audit columns still accept the row.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    base: Query,
    table: String,
    primary_key: String,
    values: ValueMap,
    columns: Vec<String>,
}

impl InsertQuery {
    /// Creates an INSERT seeded with the default audit column names.
    pub fn new(
        table: impl Into<String>,
        primary_key: impl Into<String>,
        context: Option<&CallerContext>,
    ) -> Self {
        Self::with_audit_columns(table, primary_key, context, &AuditColumns::default())
    }

    /// Creates an INSERT seeded from `context`.
    ///
    /// ## Seeding
    /// With a context: tenant, branch and creating-user columns when the
    /// context carries them, plus creation date and time from the server
    /// clock. Without a context nothing is seeded.
    pub fn with_audit_columns(
        table: impl Into<String>,
        primary_key: impl Into<String>,
        context: Option<&CallerContext>,
        audit: &AuditColumns,
    ) -> Self {
        let mut values = ValueMap::new();

        if let Some(ctx) = context {
            if let Some(tenant) = ctx.tenant_id {
                values.set(&audit.tenant, Value::Int(tenant));
            }
            if let Some(branch) = ctx.branch_id {
                values.set(&audit.branch, Value::Int(branch));
            }
            if let Some(user) = &ctx.acting_user {
                values.set(&audit.created_by, Value::Text(user.clone()));
            }
            let now = Utc::now();
            values.set(&audit.created_date, Value::Date(now.date_naive()));
            values.set(&audit.created_time, Value::Time(now.time()));
        }

        let mut base = Query::default();
        base.set_context(context.cloned());

        InsertQuery {
            base,
            table: table.into(),
            primary_key: primary_key.into(),
            values,
            columns: Vec::new(),
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

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Sets a column value, replacing any seeded value.
    pub fn set_value(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.values.set(column, value.into());
        self
    }

    /// Sets a column value unless it is NULL and a value is already present.
    ///
    /// Used when copying a fresh row so untouched cells keep their seeds.
    pub fn fill(&mut self, column: &str, value: Value) -> &mut Self {
        if !(value.is_null() && self.values.contains(column)) {
            self.values.set(column, value);
        }
        self
    }

    /// Fixes the column list written by this INSERT.
    pub fn set_columns(&mut self, columns: Vec<String>) -> &mut Self {
        self.columns = columns.into_iter().map(|c| c.to_lowercase()).collect();
        self
    }

    /// Builds `INSERT INTO <table> (<cols>) VALUES (?n, ...)`.
    pub fn compile(&self) -> CoreResult<Query> {
        validate_table_name(&self.table)?;

        let columns: Vec<&str> = if self.columns.is_empty() {
            self.values.keys().collect()
        } else {
            self.columns.iter().map(String::as_str).collect()
        };

        if columns.is_empty() {
            return Err(ValidationError::NoValues {
                statement: "INSERT".to_string(),
                table: self.table.clone(),
            }
            .into());
        }

        let offset = self.base.params().len();
        let mut placeholders = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            validate_column_name(column)?;
            placeholders.push(placeholder(offset + i + 1));
            values.push(self.values.get(column).cloned().unwrap_or_default());
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        );

        Ok(compiled(&self.base, sql, values))
    }
}

impl Parameterized for InsertQuery {
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
