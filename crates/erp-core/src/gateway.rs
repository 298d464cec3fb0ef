//! # Gateway Seams
//!
//! The two capabilities a DataStore needs from the outside world.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   DataStore ──execute()──► ExecutionGateway::execute(&Query)           │
//! │                         └► ExecutionGateway::describe(table)           │
//! │             ──save()─────► SequenceAllocator::allocate(t, pk, n)       │
//! │                         └► ExecutionGateway::execute_batch(&[Query])   │
//! │                                                                         │
//! │   erp-db implements both over SQLite; tests substitute fakes.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use async_trait::async_trait;

use crate::column::Column;
use crate::error::GatewayError;
use crate::query::Query;
use crate::value::Value;

/// Columns and rows returned by a read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    /// One map per row, keyed by lower-cased column name.
    pub rows: Vec<HashMap<String, Value>>,
}

/// Runs SQL and returns typed rows and column metadata.
///
/// Parameters are bound positionally in `Query::params()` order.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    /// Runs a read and returns its result set.
    async fn execute(&self, query: &Query) -> Result<ResultSet, GatewayError>;

    /// Runs mutations in order and returns rows affected per statement.
    async fn execute_batch(&self, queries: &[Query]) -> Result<Vec<u64>, GatewayError>;

    /// Declared schema of `table`: type, NOT NULL, precision and default.
    ///
    /// Gateways without catalog access report nothing, and result-set
    /// metadata is used as is.
    async fn describe(&self, _table: &str) -> Result<Vec<Column>, GatewayError> {
        Ok(Vec::new())
    }
}

/// Reserves contiguous blocks of unique integer keys.
#[async_trait]
pub trait SequenceAllocator: Send + Sync {
    /// Reserves `count` keys for `table.pk_column` and returns the first.
    ///
    /// `first..first + count` is unique and unused, also under concurrent
    /// callers.
    async fn allocate(&self, table: &str, pk_column: &str, count: usize)
        -> Result<i64, GatewayError>;
}
