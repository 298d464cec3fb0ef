//! DELETE builder.

use super::{compiled, Parameterized, Query};
use crate::context::CallerContext;
use crate::error::{CoreResult, ValidationError};
use crate::validation::validate_table_name;

/// A DELETE of rows matching a WHERE fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    base: Query,
    table: String,
    where_clause: Option<String>,
}

impl DeleteQuery {
    pub fn new(table: impl Into<String>) -> Self {
        DeleteQuery {
            base: Query::default(),
            table: table.into(),
            where_clause: None,
        }
    }

    /// Attaches the caller context (recorded by the audit log).
    pub fn with_context(mut self, context: Option<&CallerContext>) -> Self {
        self.base.set_context(context.cloned());
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn where_clause(&self) -> Option<&str> {
        self.where_clause.as_deref()
    }

    pub fn set_where(&mut self, fragment: impl Into<String>) -> &mut Self {
        self.where_clause = Some(fragment.into());
        self
    }

    /// Builds `DELETE FROM <table> WHERE <fragment>`.
    pub fn compile(&self) -> CoreResult<Query> {
        validate_table_name(&self.table)?;

        match self.where_clause.as_deref().map(str::trim) {
            Some(w) if !w.is_empty() => {
                let sql = format!("DELETE FROM {} WHERE {}", self.table, w);
                Ok(compiled(&self.base, sql, Vec::new()))
            }
            _ => Err(ValidationError::MissingWhereClause {
                statement: "DELETE".to_string(),
                table: self.table.clone(),
            }
            .into()),
        }
    }
}

impl Parameterized for DeleteQuery {
    fn base(&self) -> &Query {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Query {
        &mut self.base
    }
}
