//! # Sequence Allocator
//!
//! Reserves contiguous blocks of primary keys in `erp_sequences`.
//!
//! ## One Atomic Statement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  allocate("producto", "ide_prod", 3)                                    │
//! │                                                                         │
//! │  INSERT INTO erp_sequences (table_name, column_name, next_value)       │
//! │  SELECT ?1, ?2, COALESCE(MAX(ide_prod), 0) + 1 + ?3 FROM producto      │
//! │  WHERE true                                                             │
//! │  ON CONFLICT DO UPDATE                                                  │
//! │     SET next_value = MAX(next_value, excluded.next_value - ?3) + ?3    │
//! │  RETURNING next_value - ?3            ← first key of the block         │
//! │                                                                         │
//! │  first counter  : seeded from MAX(pk) + 1 of the target table          │
//! │  later counters : never behind MAX(pk) + 1, never handed out twice     │
//! │                                                                         │
//! │  No read-then-write: SQLite serializes the upsert, so concurrent       │
//! │  callers always get disjoint ranges.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use erp_core::validation::{validate_block_size, validate_column_name, validate_table_name};
use erp_core::{GatewayError, SequenceAllocator};

use crate::error::DbResult;

/// `SequenceAllocator` backed by the `erp_sequences` table.
#[derive(Debug, Clone)]
pub struct SqliteSequenceAllocator {
    pool: SqlitePool,
}

impl SqliteSequenceAllocator {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteSequenceAllocator { pool }
    }

    /// Reserves `count` keys and returns the first.
    ///
    /// ## Arguments
    /// * `table` - Target table, optionally schema-qualified
    /// * `pk_column` - Its integer primary-key column
    /// * `count` - Block size, at least 1
    pub async fn reserve(&self, table: &str, pk_column: &str, count: usize) -> DbResult<i64> {
        validate_table_name(table)?;
        validate_column_name(pk_column)?;
        validate_block_size(count)?;

        let sql = format!(
            r#"
            INSERT INTO erp_sequences (table_name, column_name, next_value)
            SELECT ?1, ?2, COALESCE(MAX({pk}), 0) + 1 + ?3 FROM {table} WHERE true
            ON CONFLICT (table_name, column_name) DO UPDATE SET
                next_value = MAX(erp_sequences.next_value, excluded.next_value - ?3) + ?3,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            RETURNING next_value - ?3
            "#,
            pk = pk_column,
            table = table,
        );

        let first: i64 = sqlx::query_scalar(&sql)
            .bind(table)
            .bind(pk_column.to_lowercase())
            .bind(count as i64)
            .fetch_one(&self.pool)
            .await?;

        debug!(table = %table, pk = %pk_column, first, count, "Reserved key block");
        Ok(first)
    }

    /// Next key that would be handed out, if a counter exists.
    pub async fn peek(&self, table: &str, pk_column: &str) -> DbResult<Option<i64>> {
        let next: Option<i64> = sqlx::query_scalar(
            "SELECT next_value FROM erp_sequences WHERE table_name = ?1 AND column_name = ?2",
        )
        .bind(table)
        .bind(pk_column.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(next)
    }
}

#[async_trait]
impl SequenceAllocator for SqliteSequenceAllocator {
    async fn allocate(
        &self,
        table: &str,
        pk_column: &str,
        count: usize,
    ) -> Result<i64, GatewayError> {
        Ok(self.reserve(table, pk_column, count).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};

    async fn db_with_rows(max_id: i64) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query("CREATE TABLE producto (ide_prod INTEGER PRIMARY KEY, nombre TEXT)")
            .execute(db.pool())
            .await
            .unwrap();
        if max_id > 0 {
            sqlx::query("INSERT INTO producto (ide_prod, nombre) VALUES (?1, 'x')")
                .bind(max_id)
                .execute(db.pool())
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_first_block_starts_after_max_key() {
        let db = db_with_rows(41).await;
        let seq = db.sequences();

        assert_eq!(seq.reserve("producto", "ide_prod", 3).await.unwrap(), 42);
        assert_eq!(seq.peek("producto", "ide_prod").await.unwrap(), Some(45));
    }

    #[tokio::test]
    async fn test_empty_table_starts_at_one() {
        let db = db_with_rows(0).await;
        assert_eq!(db.sequences().reserve("producto", "ide_prod", 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_blocks_are_disjoint_and_increasing() {
        let db = db_with_rows(0).await;
        let seq = db.sequences();

        let a = seq.reserve("producto", "ide_prod", 2).await.unwrap();
        let b = seq.reserve("producto", "ide_prod", 5).await.unwrap();
        let c = seq.reserve("producto", "ide_prod", 1).await.unwrap();

        assert_eq!((a, b, c), (1, 3, 8));
    }

    #[tokio::test]
    async fn test_counter_catches_up_with_external_inserts() {
        let db = db_with_rows(0).await;
        let seq = db.sequences();
        assert_eq!(seq.reserve("producto", "ide_prod", 1).await.unwrap(), 1);

        sqlx::query("INSERT INTO producto (ide_prod, nombre) VALUES (100, 'external')")
            .execute(db.pool())
            .await
            .unwrap();

        assert_eq!(seq.reserve("producto", "ide_prod", 1).await.unwrap(), 101);
    }

    #[tokio::test]
    async fn test_rejects_unsafe_names_and_empty_blocks() {
        let db = db_with_rows(0).await;
        let seq = db.sequences();

        assert!(matches!(
            seq.reserve("producto; DROP TABLE x", "ide_prod", 1).await,
            Err(DbError::Validation(_))
        ));
        assert!(matches!(
            seq.reserve("producto", "ide_prod", 0).await,
            Err(DbError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_table_is_an_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let allocator: &dyn SequenceAllocator = &db.sequences();

        let err = allocator.allocate("no_such_table", "id", 1).await.unwrap_err();
        assert!(err.downcast_ref::<DbError>().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_get_disjoint_blocks() {
        let path = std::env::temp_dir().join(format!("erp-seq-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(path.clone()).max_connections(8))
            .await
            .unwrap();
        sqlx::query("CREATE TABLE producto (ide_prod INTEGER PRIMARY KEY, nombre TEXT)")
            .execute(db.pool())
            .await
            .unwrap();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let seq = db.sequences();
                tokio::spawn(async move { seq.reserve("producto", "ide_prod", 3).await })
            })
            .collect();

        let mut firsts = Vec::with_capacity(handles.len());
        for handle in handles {
            firsts.push(handle.await.unwrap().unwrap());
        }
        firsts.sort_unstable();

        assert_eq!(firsts[0], 1);
        for pair in firsts.windows(2) {
            assert!(pair[1] >= pair[0] + 3, "blocks overlap: {pair:?}");
        }
        assert_eq!(db.sequences().peek("producto", "ide_prod").await.unwrap(), Some(97));

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
