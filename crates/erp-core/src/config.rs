//! # Tracking Configuration
//!
//! Resolved settings handed to every DataStore at construction.
//!
//! ## Injection, Not Discovery
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  startup:   ErpConfig::load(..)?   (erp-db: file + env, awaited)       │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │             Arc<TrackingConfig>    (resolved value)                    │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  request:   DataStore::new(gateway, allocator, config.clone())         │
//! │                                                                         │
//! │  A DataStore never loads or mutates configuration itself.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## TOML Shape
//! ```toml
//! [tracking]
//! audit_mutations = true
//!
//! [tracking.audit_columns]
//! tenant = "ide_empr"
//! branch = "ide_sucu"
//! created_by = "usuario_ingre"
//! created_date = "fecha_ingre"
//! created_time = "hora_ingre"
//! updated_by = "usuario_actua"
//! ```

use serde::{Deserialize, Serialize};

/// Names of the columns seeded from the caller context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditColumns {
    /// Tenant id column (insert only).
    #[serde(default = "default_tenant")]
    pub tenant: String,

    /// Branch id column (insert only).
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Creating user column (insert only).
    #[serde(default = "default_created_by")]
    pub created_by: String,

    /// Creation date column, seeded with the server date (insert only).
    #[serde(default = "default_created_date")]
    pub created_date: String,

    /// Creation time column, seeded with the server time (insert only).
    #[serde(default = "default_created_time")]
    pub created_time: String,

    /// Last-modified-by column (update only).
    #[serde(default = "default_updated_by")]
    pub updated_by: String,
}

fn default_tenant() -> String {
    "ide_empr".to_string()
}

fn default_branch() -> String {
    "ide_sucu".to_string()
}

fn default_created_by() -> String {
    "usuario_ingre".to_string()
}

fn default_created_date() -> String {
    "fecha_ingre".to_string()
}

fn default_created_time() -> String {
    "hora_ingre".to_string()
}

fn default_updated_by() -> String {
    "usuario_actua".to_string()
}

impl Default for AuditColumns {
    fn default() -> Self {
        AuditColumns {
            tenant: default_tenant(),
            branch: default_branch(),
            created_by: default_created_by(),
            created_date: default_created_date(),
            created_time: default_created_time(),
            updated_by: default_updated_by(),
        }
    }
}

/// Settings for change tracking and SQL generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Whether mutations built by `save()` are flagged for the audit log.
    #[serde(default)]
    pub audit_mutations: bool,

    /// Columns seeded from the caller context.
    #[serde(default)]
    pub audit_columns: AuditColumns,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_audit_columns() {
        let cols = AuditColumns::default();
        assert_eq!(cols.tenant, "ide_empr");
        assert_eq!(cols.updated_by, "usuario_actua");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrackingConfig =
            serde_json::from_str(r#"{"audit_columns": {"tenant": "company_id"}}"#).unwrap();
        assert!(!config.audit_mutations);
        assert_eq!(config.audit_columns.tenant, "company_id");
        assert_eq!(config.audit_columns.branch, "ide_sucu");
    }
}
