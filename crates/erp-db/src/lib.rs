//! # erp-db: SQLite Execution Layer for the ERP DataStore
//!
//! Connects the pure erp-core DataStore to a real database: runs its
//! SELECTs and mutation batches, reserves primary keys, and keeps the
//! audit log.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ERP Data Flow                                   │
//! │                                                                         │
//! │  Screen / report handler                                               │
//! │       │  set_value / insert / delete / save                            │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  erp-core::DataStore  (row states, SQL generation, no I/O)      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │ ExecutionGateway           │ SequenceAllocator                 │
//! │       ▼                            ▼                                    │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     erp-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌───────────────┐  ┌──────────────────┐   │   │
//! │  │   │ SqliteGateway │  │ SqliteSequence│  │ AuditLogRepo     │   │   │
//! │  │   │ (gateway.rs)  │  │ Allocator     │  │ (repository/)    │   │   │
//! │  │   └───────────────┘  └───────────────┘  └──────────────────┘   │   │
//! │  │   Database (pool.rs) · ErpConfig (config.rs) · migrations      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)  ── business tables + erp_sequences + erp_audit_log      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - TOML file + environment configuration
//! - [`pool`] - Connection pool creation and wiring
//! - [`gateway`] - `ExecutionGateway` over SQLite
//! - [`sequence`] - `SequenceAllocator` over `erp_sequences`
//! - [`repository`] - Audit log access
//! - [`migrations`] - Embedded schema migrations
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use erp_core::CallerContext;
//! use erp_db::{Database, ErpConfig};
//!
//! let config = ErpConfig::load(None)?;
//! let db = Database::with_tracking(config.db_config(), config.tracking.clone()).await?;
//!
//! let mut ds = db.data_store(Some(CallerContext::new().tenant(1).user("ana")));
//! ds.set_data_store_table("producto", "ide_prod")?;
//! ds.execute().await?;
//!
//! ds.set_value(0, "nombre", "Agua sin gas")?;
//! let summary = ds.save().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod gateway;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod sequence;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::ErpConfig;
pub use error::{DbError, DbResult};
pub use gateway::SqliteGateway;
pub use pool::{Database, DbConfig};
pub use repository::audit::{AuditEntry, AuditLogRepository};
pub use sequence::SqliteSequenceAllocator;

// =============================================================================
// DataStore Round Trips
// =============================================================================
