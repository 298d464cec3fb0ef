//! # SQLite Execution Gateway
//!
//! Runs compiled erp-core queries against SQLite.
//!
//! ## Read Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  execute(&Query)                                                        │
//! │       │                                                                 │
//! │       ├── prepare(sql)        → column names + declared types          │
//! │       │                         (schema even when no row matches)      │
//! │       ├── bind params in call order                                     │
//! │       └── fetch_all           → cells decoded by storage class         │
//! │                                                                         │
//! │  Storage class   Declared type     Value                                │
//! │  ─────────────   ─────────────     ─────                                │
//! │  NULL            any               Null                                 │
//! │  INTEGER         BOOLEAN           Bool                                 │
//! │  INTEGER         other             Int                                  │
//! │  REAL            any               Float                                │
//! │  TEXT            DATE / TIME       Date / Time (Text if unparsable)    │
//! │  TEXT            DATETIME          Timestamp (Text if unparsable)      │
//! │  TEXT / BLOB     other             Text                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  execute_batch(&[Query])                                                │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    for each query, in order:                                            │
//! │      execute                                                            │
//! │      if query.is_audit(): INSERT INTO erp_audit_log (...)              │
//! │  COMMIT      ← any failure rolls back every statement and audit entry  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Declared Schema
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  describe("producto")  →  PRAGMA table_info(producto)                   │
//! │                                                                         │
//! │  type        "NUMERIC(12,2)"  → data_type, length 12, decimals 2       │
//! │  notnull     1                → required                                │
//! │  dflt_value  "0"              → default                                 │
//! │                                                                         │
//! │  Schema-qualified names use PRAGMA inv.table_info(producto).           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Array params are bound as JSON text, so SQL reads them with `json_each`:
//! `WHERE ide_prod IN (SELECT value FROM json_each(?1))`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::query::Query as SqlxQuery;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column as _, Executor, Row as _, Sqlite, SqlitePool, Statement as _, TypeInfo as _, ValueRef as _};
use tracing::{debug, info};

use erp_core::column::parse_precision;
use erp_core::validation::validate_table_name;
use erp_core::{Column, ExecutionGateway, GatewayError, Parameterized, Query, ResultSet, Value};

use crate::error::{DbError, DbResult};
use crate::repository::audit;

/// `ExecutionGateway` over a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteGateway {
    pool: SqlitePool,
}

impl SqliteGateway {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteGateway { pool }
    }

    /// Runs a read and returns its columns and rows.
    pub async fn fetch(&self, query: &Query) -> DbResult<ResultSet> {
        debug!(sql = %query.sql(), params = query.params().len(), "Executing query");

        let statement = (&self.pool).prepare(query.sql()).await?;
        let columns: Vec<Column> = statement
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| Column::new(c.name(), c.type_info().name()).with_order(i as u32))
            .collect();

        let values = query.param_values();
        let rows = bind_all(sqlx::query(query.sql()), &values)
            .fetch_all(&self.pool)
            .await?;

        let rows = rows
            .iter()
            .map(|row| decode_row(row, &columns))
            .collect::<DbResult<Vec<_>>>()?;

        debug!(columns = columns.len(), rows = rows.len(), "Query returned");
        Ok(ResultSet { columns, rows })
    }

    /// Reads the declared columns of `table` from the catalog.
    ///
    /// An unknown table yields no columns.
    pub async fn describe_table(&self, table: &str) -> DbResult<Vec<Column>> {
        validate_table_name(table)?;
        let sql = match table.split_once('.') {
            Some((schema, name)) => format!("PRAGMA {schema}.table_info({name})"),
            None => format!("PRAGMA table_info({table})"),
        };

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let cid: i64 = row.try_get("cid")?;
            let name: String = row.try_get("name")?;
            let declared: String = row.try_get("type")?;
            let notnull: i64 = row.try_get("notnull")?;
            let default: Option<String> = row.try_get("dflt_value")?;

            let (length, decimals) = parse_precision(&declared);
            let mut column = Column::new(name, declared)
                .with_order(cid as u32)
                .required(notnull != 0)
                .with_precision(length, decimals);
            if let Some(default) = default {
                column = column.with_default(default);
            }
            columns.push(column);
        }

        debug!(table = %table, columns = columns.len(), "Described table");
        Ok(columns)
    }

    /// Runs mutations in one transaction, recording audited ones.
    ///
    /// ## Returns
    /// Rows affected per statement, in input order.
    pub async fn run_batch(&self, queries: &[Query]) -> DbResult<Vec<u64>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let mut affected = Vec::with_capacity(queries.len());
        for query in queries {
            let values = query.param_values();
            let rows = bind_all(sqlx::query(query.sql()), &values)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            debug!(sql = %query.sql(), rows, "Statement executed");

            if query.is_audit() {
                audit::record(&mut *tx, query, rows).await?;
            }
            affected.push(rows);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            statements = queries.len(),
            rows_affected = affected.iter().sum::<u64>(),
            "Batch committed"
        );
        Ok(affected)
    }
}

#[async_trait]
impl ExecutionGateway for SqliteGateway {
    async fn execute(&self, query: &Query) -> Result<ResultSet, GatewayError> {
        Ok(self.fetch(query).await?)
    }

    async fn execute_batch(&self, queries: &[Query]) -> Result<Vec<u64>, GatewayError> {
        Ok(self.run_batch(queries).await?)
    }

    async fn describe(&self, table: &str) -> Result<Vec<Column>, GatewayError> {
        Ok(self.describe_table(table).await?)
    }
}

// =============================================================================
// Binding
// =============================================================================

type BoundQuery<'q> = SqlxQuery<'q, Sqlite, SqliteArguments<'q>>;

/// Binds every value positionally, in order.
pub(crate) fn bind_all<'q>(mut query: BoundQuery<'q>, values: &'q [Value]) -> BoundQuery<'q> {
    for value in values {
        query = bind_value(query, value);
    }
    query
}

fn bind_value<'q>(query: BoundQuery<'q>, value: &'q Value) -> BoundQuery<'q> {
    match value {
        Value::Null => query.bind(None::<i64>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.as_str()),
        Value::Date(d) => query.bind(*d),
        Value::Time(t) => query.bind(*t),
        Value::Timestamp(ts) => query.bind(*ts),
        Value::IntArray(items) => query.bind(serde_json::Value::from(items.clone()).to_string()),
        Value::TextArray(items) => query.bind(serde_json::Value::from(items.clone()).to_string()),
    }
}

// =============================================================================
// Decoding
// =============================================================================

fn decode_row(row: &SqliteRow, columns: &[Column]) -> DbResult<HashMap<String, Value>> {
    let mut cells = HashMap::with_capacity(columns.len());
    for (index, column) in columns.iter().enumerate() {
        cells.insert(column.name.clone(), decode_cell(row, index, &column.data_type)?);
    }
    Ok(cells)
}

fn decode_cell(row: &SqliteRow, index: usize, declared: &str) -> DbResult<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_string();
    let declared = declared.to_uppercase();

    let value = match storage.as_str() {
        "INTEGER" if declared == "BOOLEAN" => Value::Bool(row.try_get::<i64, _>(index)? != 0),
        "INTEGER" => Value::Int(row.try_get::<i64, _>(index)?),
        "REAL" => Value::Float(row.try_get::<f64, _>(index)?),
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get(index)?;
            Value::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => parse_text(row.try_get::<String, _>(index)?, &declared),
    };
    Ok(value)
}

/// Interprets TEXT storage using the declared column type.
fn parse_text(text: String, declared: &str) -> Value {
    match declared {
        "DATE" => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map(Value::Date)
            .unwrap_or(Value::Text(text)),
        "TIME" => NaiveTime::parse_from_str(&text, "%H:%M:%S%.f")
            .map(Value::Time)
            .unwrap_or(Value::Text(text)),
        "DATETIME" | "TIMESTAMP" => parse_timestamp(&text)
            .map(Value::Timestamp)
            .unwrap_or(Value::Text(text)),
        _ => Value::Text(text),
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

// =============================================================================
// Unit Tests
// =============================================================================
