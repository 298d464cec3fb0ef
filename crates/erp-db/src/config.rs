//! # ERP Configuration
//!
//! Database location, pool sizing and change-tracking settings.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ERP_DATABASE_PATH=/var/lib/erp/erp.db                              │
//! │     ERP_MAX_CONNECTIONS=10                                             │
//! │     ERP_AUDIT_MUTATIONS=true                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/erp/erp.toml (Linux)                                     │
//! │     ~/Library/Application Support/com.erp.platform/erp.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     ./erp.db, 5 connections, no audit log                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # erp.toml
//! [database]
//! path = "/var/lib/erp/erp.db"
//! max_connections = 10
//!
//! [tracking]
//! audit_mutations = true
//!
//! [tracking.audit_columns]
//! tenant = "ide_empr"
//! updated_by = "usuario_actua"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use erp_core::validation::validate_column_name;
use erp_core::TrackingConfig;

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

// =============================================================================
// Database Settings
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite database file.
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Whether to apply migrations on connect.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_path() -> PathBuf {
    PathBuf::from("./erp.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_path(),
            max_connections: default_max_connections(),
            run_migrations: true,
        }
    }
}

// =============================================================================
// ERP Config
// =============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErpConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub tracking: TrackingConfig,
}

impl ErpConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (erp.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ERP config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load ERP config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document.
    pub fn from_toml(contents: &str) -> DbResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> DbResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DbError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| DbError::Config(e.to_string()))?;
        std::fs::write(&path, contents)?;

        info!(?path, "ERP config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(DbError::Config("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(DbError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        // Audit column names end up in generated SQL.
        let cols = &self.tracking.audit_columns;
        for name in [
            &cols.tenant,
            &cols.branch,
            &cols.created_by,
            &cols.created_date,
            &cols.created_time,
            &cols.updated_by,
        ] {
            validate_column_name(name)?;
        }

        Ok(())
    }

    /// Pool settings for [`crate::Database::with_tracking`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .run_migrations(self.database.run_migrations)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("ERP_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("ERP_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid ERP_MAX_CONNECTIONS"),
            }
        }

        if let Ok(audit) = std::env::var("ERP_AUDIT_MUTATIONS") {
            match audit.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.tracking.audit_mutations = true,
                "0" | "false" | "no" => self.tracking.audit_mutations = false,
                _ => warn!(value = %audit, "Ignoring invalid ERP_AUDIT_MUTATIONS"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "erp", "platform")
            .map(|dirs| dirs.config_dir().join("erp.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ErpConfig::default();
        assert_eq!(config.database.path, PathBuf::from("./erp.db"));
        assert_eq!(config.database.max_connections, 5);
        assert!(!config.tracking.audit_mutations);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = ErpConfig::from_toml(
            r#"
            [database]
            max_connections = 12

            [tracking]
            audit_mutations = true

            [tracking.audit_columns]
            tenant = "company_id"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.max_connections, 12);
        assert_eq!(config.database.path, PathBuf::from("./erp.db"));
        assert!(config.tracking.audit_mutations);
        assert_eq!(config.tracking.audit_columns.tenant, "company_id");
        assert_eq!(config.tracking.audit_columns.branch, "ide_sucu");
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = ErpConfig::from_toml("[database\npath = 3").unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn test_validation() {
        let mut config = ErpConfig::default();
        config.database.max_connections = 0;
        assert!(matches!(config.validate(), Err(DbError::Config(_))));

        let mut config = ErpConfig::default();
        config.tracking.audit_columns.updated_by = "usuario; --".to_string();
        assert!(matches!(config.validate(), Err(DbError::Validation(_))));
    }

    #[test]
    fn test_db_config() {
        let mut config = ErpConfig::default();
        config.database.path = PathBuf::from("/tmp/erp-test.db");
        config.database.run_migrations = false;

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/tmp/erp-test.db"));
        assert_eq!(db.max_connections, 5);
        assert!(!db.run_migrations);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            ErpConfig::load_or_default(Some(PathBuf::from("/nonexistent/dir/erp.toml")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&ErpConfig::default()).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[tracking.audit_columns]"));
    }
}
