//! # erp-core: Change Tracking and SQL Generation
//!
//! Load a table into memory, edit it like a spreadsheet, persist only the
//! net changes as one ordered batch of INSERT/UPDATE/DELETE statements.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ERP Backend Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              HTTP controllers / report services                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ CallerContext + TrackingConfig         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ erp-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   query   │  │ datastore │  │    row    │  │  column   │  │   │
//! │  │   │ Select/   │  │ execute   │  │ RowState  │  │ metadata  │  │   │
//! │  │   │ Insert/...│  │ save      │  │ tracking  │  │ (ts-rs)   │  │   │
//! │  │   └───────────┘  └─────┬─────┘  └───────────┘  └───────────┘  │   │
//! │  │                        │ ExecutionGateway / SequenceAllocator   │   │
//! │  │   NO I/O • NO DRIVER • TRAITS AT THE EDGE                       │   │
//! │  └────────────────────────┼────────────────────────────────────────┘   │
//! │  ┌────────────────────────▼────────────────────────────────────────┐   │
//! │  │                    erp-db (SQLite via sqlx)                     │   │
//! │  │        SqliteGateway, SqliteSequenceAllocator, audit log        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`query`] - Query family and the `Statement` batch element
//! - [`datastore`] - The change-tracked recordset
//! - [`row`] - Row cells and `RowState`
//! - [`column`] - Column metadata shared with the UI grid
//! - [`value`] - Typed cell / parameter values
//! - [`gateway`] - Execution and sequence traits
//! - [`config`] / [`context`] - Injected settings and caller identity
//! - [`error`] / [`validation`] - Error types and identifier checks
//!
//! ## Example Usage
//!
//! ```rust
//! use erp_core::{Parameterized, UpdateQuery, Value};
//!
//! let mut update = UpdateQuery::new("producto", "ide_prod", None);
//! update
//!     .set_value("nombre", "Agua sin gas")
//!     .set_where("ide_prod = ?1")
//!     .add_int_param(1, 10);
//!
//! let query = update.compile().unwrap();
//! assert_eq!(query.sql(), "UPDATE producto SET nombre = ?2 WHERE ide_prod = ?1");
//! assert_eq!(query.param_values(), vec![Value::Int(10), Value::from("Agua sin gas")]);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod column;
pub mod config;
pub mod context;
pub mod datastore;
pub mod error;
pub mod gateway;
pub mod query;
pub mod row;
pub mod validation;
pub mod value;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use column::{Column, ColumnAlign};
pub use config::{AuditColumns, TrackingConfig};
pub use context::CallerContext;
pub use datastore::{DataStore, SaveSummary};
pub use error::{CoreError, CoreResult, GatewayError, ValidationError};
pub use gateway::{ExecutionGateway, ResultSet, SequenceAllocator};
pub use query::{
    DeleteQuery, InsertQuery, Param, Parameterized, Query, SelectQuery, Statement, UpdateQuery,
    ValueMap,
};
pub use row::{ChangedColumns, Row, RowState};
pub use value::Value;
