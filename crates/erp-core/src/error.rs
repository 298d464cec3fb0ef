//! # Error Types
//!
//! Error types for change tracking and SQL generation.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  erp-core errors (this file)                                           │
//! │  ├── CoreError        - DataStore / Query misuse and I/O propagation   │
//! │  └── ValidationError  - Identifiers, empty names, unsafe statements    │
//! │                                                                         │
//! │  erp-db errors (separate crate)                                        │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ← GatewayError (boxed DbError)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation Rules
//! 1. Misuse (empty table name, unknown column) fails at the call site.
//! 2. Gateway errors pass through `CoreError::Execution` unchanged: the
//!    message is the gateway's own and `source()` yields the original error.
//! 3. A failed sequence allocation aborts `save()` before any key is assigned.

use thiserror::Error;

/// Error type returned by gateway and allocator implementations.
///
/// Boxed so the core never depends on a concrete driver. Callers that need
/// the concrete type can `downcast_ref` it (e.g. to `erp_db::DbError`).
pub type GatewayError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised by the Query family and the DataStore.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input validation failed (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A column name did not match any column of the current result set.
    ///
    /// ## When This Occurs
    /// - `set_value` / `get_value` with a misspelled column
    /// - Editing before `execute()` loaded a schema
    #[error("Unknown column '{column}'")]
    UnknownColumn { column: String },

    /// A row index past the end of the in-memory row set.
    #[error("Row index {index} out of range (row count: {len})")]
    RowOutOfRange { index: usize, len: usize },

    /// The DataStore has neither a table nor a custom query.
    #[error("DataStore is not configured: call set_data_store_table or set_data_store_query first")]
    NotConfigured,

    /// A row scheduled for UPDATE/DELETE carries no primary-key value.
    #[error("Row {index} has no value for primary key '{primary_key}'")]
    MissingPrimaryKey { index: usize, primary_key: String },

    /// The sequence allocator could not reserve keys.
    ///
    /// ## When This Occurs
    /// - Counter table missing or locked
    /// - Connectivity loss during `save()`
    ///
    /// No key has been written to any row when this is returned.
    #[error("Sequence allocation failed for {table}: {source}")]
    SequenceAllocation {
        table: String,
        #[source]
        source: GatewayError,
    },

    /// The execution gateway failed (bad SQL, constraint violation, I/O).
    #[error(transparent)]
    Execution(GatewayError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Validation failures detected before any SQL reaches the gateway.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A table or column name is not a plain SQL identifier.
    #[error("{field} '{value}' is not a valid SQL identifier")]
    InvalidIdentifier { field: String, value: String },

    /// UPDATE or DELETE compiled without a WHERE clause.
    #[error("{statement} on {table} requires a WHERE clause")]
    MissingWhereClause { statement: String, table: String },

    /// INSERT or UPDATE compiled without any column values.
    #[error("{statement} on {table} has no values")]
    NoValues { statement: String, table: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
