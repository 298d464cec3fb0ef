//! # Audit Log Repository
//!
//! Records audited statements and reads them back.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SINGLE TRANSACTION (SqliteGateway)                    │
//! │                                                                         │
//! │  1. UPDATE producto SET nombre = ?2 WHERE ide_prod = ?1                │
//! │                                                                         │
//! │  2. INSERT INTO erp_audit_log (id, statement, sql_text, params, ...)   │
//! │     VALUES (<uuid>, 'UPDATE', <sql>, '[10,"Agua"]', <ctx fields>)      │
//! │                                                                         │
//! │  COMMIT ← the statement is never applied without its audit entry       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use erp_core::{Parameterized, Query};

use crate::error::{DbError, DbResult};

/// One audited statement.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct AuditEntry {
    pub id: String,
    /// SQL verb ("INSERT", "UPDATE", "DELETE", ...).
    pub statement: String,
    pub sql_text: String,
    /// JSON array of bound values, in bind order.
    pub params: String,
    pub tenant_id: Option<i64>,
    pub branch_id: Option<i64>,
    pub acting_user: Option<String>,
    pub ip: Option<String>,
    pub device: Option<String>,
    pub rows_affected: i64,
    pub created_at: DateTime<Utc>,
}

/// Writes the audit entry for `query` on the given connection.
///
/// Called inside the batch transaction, so the entry commits or rolls
/// back together with the statement.
pub(crate) async fn record(
    conn: &mut SqliteConnection,
    query: &Query,
    rows_affected: u64,
) -> DbResult<AuditEntry> {
    let params = serde_json::to_string(&query.param_values())
        .map_err(|e| DbError::Internal(e.to_string()))?;
    let ctx = query.context().cloned().unwrap_or_default();

    let entry = AuditEntry {
        id: Uuid::new_v4().to_string(),
        statement: query.verb(),
        sql_text: query.sql().to_string(),
        params,
        tenant_id: ctx.tenant_id,
        branch_id: ctx.branch_id,
        acting_user: ctx.acting_user,
        ip: ctx.ip,
        device: ctx.device,
        rows_affected: rows_affected as i64,
        created_at: Utc::now(),
    };

    debug!(
        id = %entry.id,
        statement = %entry.statement,
        rows_affected,
        "Recording audit entry"
    );

    sqlx::query(
        r#"
        INSERT INTO erp_audit_log (
            id, statement, sql_text, params, tenant_id, branch_id,
            acting_user, ip, device, rows_affected, created_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9, ?10, ?11
        )
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.statement)
    .bind(&entry.sql_text)
    .bind(&entry.params)
    .bind(entry.tenant_id)
    .bind(entry.branch_id)
    .bind(&entry.acting_user)
    .bind(&entry.ip)
    .bind(&entry.device)
    .bind(entry.rows_affected)
    .bind(entry.created_at)
    .execute(conn)
    .await?;

    Ok(entry)
}

/// Read access to the audit log.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: SqlitePool,
}

impl AuditLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AuditLogRepository { pool }
    }

    /// Newest entries first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, statement, sql_text, params, tenant_id, branch_id,
                   acting_user, ip, device, rows_affected, created_at
            FROM erp_audit_log
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Newest entries first, for one tenant.
    pub async fn list_for_tenant(&self, tenant_id: i64, limit: u32) -> DbResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, statement, sql_text, params, tenant_id, branch_id,
                   acting_user, ip, device, rows_affected, created_at
            FROM erp_audit_log
            WHERE tenant_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Gets one entry by id.
    pub async fn get(&self, id: &str) -> DbResult<AuditEntry> {
        sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, statement, sql_text, params, tenant_id, branch_id,
                   acting_user, ip, device, rows_affected, created_at
            FROM erp_audit_log
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("AuditEntry", id))
    }

    /// Total number of entries.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM erp_audit_log")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use erp_core::CallerContext;

    #[tokio::test]
    async fn test_record_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.audit_log();
        assert_eq!(repo.count().await.unwrap(), 0);

        let mut query = Query::new("DELETE FROM producto WHERE ide_prod = ?1")
            .with_context(CallerContext::new().tenant(4).user("luis"));
        query.add_int_param(1, 7);

        let mut conn = db.pool().acquire().await.unwrap();
        let written = record(&mut conn, &query, 1).await.unwrap();
        drop(conn);

        let read = repo.get(&written.id).await.unwrap();
        assert_eq!(read.statement, "DELETE");
        assert_eq!(read.params, "[7]");
        assert_eq!(read.tenant_id, Some(4));
        assert_eq!(read.acting_user.as_deref(), Some("luis"));
        assert_eq!(read.branch_id, None);

        assert_eq!(repo.list_for_tenant(4, 10).await.unwrap().len(), 1);
        assert!(repo.list_for_tenant(5, 10).await.unwrap().is_empty());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_entry() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.audit_log().get("nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
