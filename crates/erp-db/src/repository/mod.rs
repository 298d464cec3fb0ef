//! # Repository Module
//!
//! Repositories over the support tables owned by this crate.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.audit_log()                                                         │
//! │       │  list_recent / list_for_tenant / get / count                   │
//! │       ▼                                                                 │
//! │  AuditLogRepository ──► erp_audit_log                                  │
//! │                                                                         │
//! │  Business tables are reached through the DataStore, not repositories.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`audit::AuditLogRepository`] - Audited statement history

pub mod audit;
