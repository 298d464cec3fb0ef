//! # DataStore
//!
//! A disconnected recordset: load rows, edit them in memory, then reconcile
//! every change in one ordered batch.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DataStore Lifecycle                             │
//! │                                                                         │
//! │  configure                                                              │
//! │  ─────────                                                              │
//! │  set_data_store_table("producto", "ide_prod")   (table mode)           │
//! │  set_data_store_query(select, pk)               (read-only mode)       │
//! │  set_where_table / set_select_columns_table / set_order_column         │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  execute().await ──► gateway.execute(SELECT) ──► columns + Clean rows  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  edit (sync, in memory)                                                 │
//! │  set_value / insert / delete                                            │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  save().await                                                           │
//! │   1. allocator.allocate(table, pk, #inserted)   (one call)             │
//! │   2. pending = [Insert..., Update..., Delete...]                       │
//! │   3. gateway.execute_batch(compiled pending)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! let mut ds = DataStore::new(gateway, allocator, config).with_context(ctx);
//! ds.set_data_store_table("producto", "ide_prod")?;
//! ds.execute().await?;
//!
//! ds.set_value(0, "nombre", "Agua sin gas")?;
//! let row = ds.insert();
//! ds.set_value(row, "nombre", "Jugo")?;
//!
//! let summary = ds.save().await?;
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::column::Column;
use crate::config::TrackingConfig;
use crate::context::CallerContext;
use crate::error::{CoreError, CoreResult};
use crate::gateway::{ExecutionGateway, SequenceAllocator};
use crate::query::{
    DeleteQuery, InsertQuery, Parameterized, Query, SelectQuery, Statement, UpdateQuery,
};
use crate::row::{Row, RowState};
use crate::validation::{validate_column_name, validate_table_name};
use crate::value::Value;

/// Counts reported by `save()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Sum of rows affected over the whole batch.
    pub rows_affected: u64,
}

impl SaveSummary {
    /// Number of statements sent.
    pub fn statements(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// In-memory, change-tracked recordset bound to a table or a query.
pub struct DataStore {
    gateway: Arc<dyn ExecutionGateway>,
    allocator: Arc<dyn SequenceAllocator>,
    config: Arc<TrackingConfig>,
    context: Option<CallerContext>,

    table: Option<String>,
    primary_key: Option<String>,
    order_column: Option<String>,
    where_clause: Option<String>,
    select_columns: Option<String>,
    custom_query: Option<SelectQuery>,
    read_only: bool,
    auto_increment_pk: bool,
    audit: bool,

    columns: Vec<Column>,
    rows: Vec<Row>,
    cursor: usize,
    pending: Vec<Statement>,
}

impl DataStore {
    /// Creates an unconfigured DataStore.
    ///
    /// ## Arguments
    /// * `gateway` - Runs reads and mutation batches
    /// * `allocator` - Reserves primary keys for inserted rows
    /// * `config` - Resolved tracking settings (audit toggle, audit columns)
    pub fn new(
        gateway: Arc<dyn ExecutionGateway>,
        allocator: Arc<dyn SequenceAllocator>,
        config: Arc<TrackingConfig>,
    ) -> Self {
        let audit = config.audit_mutations;
        DataStore {
            gateway,
            allocator,
            config,
            context: None,
            table: None,
            primary_key: None,
            order_column: None,
            where_clause: None,
            select_columns: None,
            custom_query: None,
            read_only: false,
            auto_increment_pk: false,
            audit,
            columns: Vec::new(),
            rows: Vec::new(),
            cursor: 0,
            pending: Vec::new(),
        }
    }

    /// Sets the caller context used to seed audit columns.
    pub fn with_context(mut self, context: CallerContext) -> Self {
        self.context = Some(context);
        self
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Binds the DataStore to a table.
    ///
    /// The order column defaults to the primary key.
    pub fn set_data_store_table(
        &mut self,
        table: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> CoreResult<&mut Self> {
        let table = table.into();
        let primary_key = primary_key.into().to_lowercase();
        validate_table_name(&table)?;
        validate_column_name(&primary_key)?;

        self.table = Some(table);
        self.primary_key = Some(primary_key);
        self.custom_query = None;
        Ok(self)
    }

    /// Appends `AND <fragment>` to the generated SELECT.
    ///
    /// The fragment is used verbatim; values belong in bound params.
    pub fn set_where_table(&mut self, fragment: impl Into<String>) -> &mut Self {
        self.where_clause = Some(fragment.into());
        self
    }

    /// Replaces `*` in the generated SELECT with the given columns.
    pub fn set_select_columns_table(&mut self, columns: &[&str]) -> CoreResult<&mut Self> {
        for column in columns {
            validate_column_name(column)?;
        }
        self.select_columns = Some(columns.join(", "));
        Ok(self)
    }

    /// Sets the ORDER BY column of the generated SELECT.
    pub fn set_order_column(&mut self, column: &str) -> CoreResult<&mut Self> {
        validate_column_name(column)?;
        self.order_column = Some(column.to_lowercase());
        Ok(self)
    }

    /// Loads from a caller-supplied SELECT.
    ///
    /// Permanently switches this instance to read-only: `save()` produces
    /// no statements from here on.
    pub fn set_data_store_query(
        &mut self,
        query: SelectQuery,
        primary_key: impl Into<String>,
    ) -> &mut Self {
        self.custom_query = Some(query);
        self.primary_key = Some(primary_key.into().to_lowercase());
        self.read_only = true;
        self
    }

    /// When true, `save()` never allocates keys and never writes the
    /// primary-key column on insert.
    pub fn set_auto_increment_primary_key(&mut self, auto_increment: bool) -> &mut Self {
        self.auto_increment_pk = auto_increment;
        self
    }

    /// Sets the audit flag of every generated mutation.
    pub fn set_audit(&mut self, audit: bool) -> &mut Self {
        self.audit = audit;
        self
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Builds the SELECT that `execute()` runs.
    ///
    /// ```text
    /// SELECT <cols|*> FROM <table> WHERE 1=1 [AND <where>] ORDER BY <order>
    /// ```
    pub fn select_query(&self) -> CoreResult<SelectQuery> {
        if let Some(query) = &self.custom_query {
            return Ok(query.clone());
        }

        let table = self.table.as_deref().ok_or(CoreError::NotConfigured)?;
        let order = self
            .order_column
            .as_deref()
            .or(self.primary_key.as_deref())
            .ok_or(CoreError::NotConfigured)?;

        let mut sql = format!(
            "SELECT {} FROM {} WHERE 1=1",
            self.select_columns.as_deref().unwrap_or("*"),
            table
        );
        if let Some(fragment) = self.where_clause.as_deref().filter(|w| !w.trim().is_empty()) {
            sql.push_str(" AND ");
            sql.push_str(fragment);
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(order);

        let query = SelectQuery::new(sql);
        Ok(match &self.context {
            Some(ctx) => query.with_context(ctx.clone()),
            None => query,
        })
    }

    /// Loads columns and rows, replacing any previous content.
    ///
    /// Gateway errors are returned unchanged, without retry.
    pub async fn execute(&mut self) -> CoreResult<()> {
        let query = self.select_query()?.compile();
        debug!(sql = %query.sql(), params = query.params().len(), "Executing DataStore select");

        let result = self
            .gateway
            .execute(&query)
            .await
            .map_err(CoreError::Execution)?;

        let mut columns = result.columns;
        if let (None, Some(table)) = (&self.custom_query, &self.table) {
            let declared = self
                .gateway
                .describe(table)
                .await
                .map_err(CoreError::Execution)?;
            for column in &mut columns {
                if let Some(decl) = declared.iter().find(|d| d.matches(&column.name)) {
                    column.merge_declared(decl);
                }
            }
        }

        self.columns = columns;
        self.rows = result.rows.into_iter().map(Row::loaded).collect();
        if !self.rows.is_empty() {
            self.cursor = 0;
        }

        debug!(
            columns = self.columns.len(),
            rows = self.rows.len(),
            "DataStore loaded"
        );
        Ok(())
    }

    // =========================================================================
    // Navigation and Editing
    // =========================================================================

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor to `index`.
    pub fn move_to(&mut self, index: usize) -> CoreResult<()> {
        self.check_row(index)?;
        self.cursor = index;
        Ok(())
    }

    /// Statements produced by the last `prepare_save()` / `save()`.
    pub fn pending(&self) -> &[Statement] {
        &self.pending
    }

    /// Position of a column in the schema, ignoring case.
    pub fn get_index_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.matches(name))
    }

    /// First row whose primary key equals `value` (strict equality).
    pub fn get_index_row(&self, value: &Value) -> Option<usize> {
        let pk = self.primary_key.as_deref()?;
        self.rows.iter().position(|row| row.get(pk) == value)
    }

    /// Reads a cell.
    pub fn get_value(&self, index: usize, column: &str) -> CoreResult<&Value> {
        let name = self.column_name(column)?;
        self.check_row(index)?;
        Ok(self.rows[index].get(name))
    }

    /// Writes a cell and tracks the change.
    ///
    /// A clean or updated row becomes `Updated` with `column` recorded once.
    /// Pending inserts and deletes only store the value.
    pub fn set_value(
        &mut self,
        index: usize,
        column: &str,
        value: impl Into<Value>,
    ) -> CoreResult<()> {
        let name = self.column_name(column)?.to_string();
        self.check_row(index)?;
        self.rows[index].set(&name, value.into());
        Ok(())
    }

    /// Prepends an empty pending-insert row and returns its index (0).
    pub fn insert(&mut self) -> usize {
        self.rows.insert(0, Row::fresh(&self.columns));
        self.cursor = 0;
        0
    }

    /// Marks a row deleted. A pending insert is discarded instead: it stays
    /// in memory and is never persisted.
    pub fn delete(&mut self, index: usize) -> CoreResult<()> {
        self.check_row(index)?;
        self.rows[index].mark_deleted();
        Ok(())
    }

    fn column_name(&self, column: &str) -> CoreResult<&str> {
        self.columns
            .iter()
            .find(|c| c.matches(column))
            .map(|c| c.name.as_str())
            .ok_or_else(|| CoreError::UnknownColumn {
                column: column.to_string(),
            })
    }

    fn check_row(&self, index: usize) -> CoreResult<()> {
        if index >= self.rows.len() {
            return Err(CoreError::RowOutOfRange {
                index,
                len: self.rows.len(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Builds the pending batch without executing it.
    ///
    /// ## Order
    /// Inserts (in row order), then updates, then deletes. Inserted rows
    /// receive `first + i` from a single allocator call unless the primary
    /// key is auto-increment.
    ///
    /// ## Errors
    /// - `NotConfigured` if no table is set
    /// - `MissingPrimaryKey` for an updated/deleted row without a key
    /// - `SequenceAllocation` if the allocator fails; no key is assigned
    pub async fn prepare_save(&mut self) -> CoreResult<&[Statement]> {
        self.pending.clear();

        if self.read_only {
            debug!("DataStore is read-only, nothing to save");
            return Ok(&self.pending);
        }

        let table = self.table.clone().ok_or(CoreError::NotConfigured)?;
        let pk = self.primary_key.clone().ok_or(CoreError::NotConfigured)?;

        let updates = self.build_updates(&table, &pk)?;
        let deletes = self.build_deletes(&table, &pk)?;
        let inserts = self.build_inserts(&table, &pk).await?;

        debug!(
            table = %table,
            inserts = inserts.len(),
            updates = updates.len(),
            deletes = deletes.len(),
            "Prepared DataStore batch"
        );

        self.pending.extend(inserts.into_iter().map(Statement::Insert));
        self.pending.extend(updates.into_iter().map(Statement::Update));
        self.pending.extend(deletes.into_iter().map(Statement::Delete));
        Ok(&self.pending)
    }

    /// Prepares the batch and runs it through the gateway.
    ///
    /// Row states are not reset; call `execute()` again for a clean view.
    pub async fn save(&mut self) -> CoreResult<SaveSummary> {
        self.prepare_save().await?;

        let mut summary = SaveSummary::default();
        for statement in &self.pending {
            match statement {
                Statement::Insert(_) => summary.inserted += 1,
                Statement::Update(_) => summary.updated += 1,
                Statement::Delete(_) => summary.deleted += 1,
                Statement::Select(_) => {}
            }
        }

        if self.pending.is_empty() {
            return Ok(summary);
        }

        let queries = self
            .pending
            .iter()
            .map(Statement::compile)
            .collect::<CoreResult<Vec<Query>>>()?;

        let affected = self
            .gateway
            .execute_batch(&queries)
            .await
            .map_err(CoreError::Execution)?;
        summary.rows_affected = affected.iter().sum();

        info!(
            table = self.table.as_deref().unwrap_or_default(),
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            rows_affected = summary.rows_affected,
            "DataStore saved"
        );
        Ok(summary)
    }

    async fn build_inserts(&mut self, table: &str, pk: &str) -> CoreResult<Vec<InsertQuery>> {
        let indexes: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.is_inserted())
            .map(|(i, _)| i)
            .collect();

        if indexes.is_empty() {
            return Ok(Vec::new());
        }

        let mut columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.name.clone())
            .filter(|name| !(self.auto_increment_pk && name == pk))
            .collect();
        if !self.auto_increment_pk && !columns.iter().any(|c| c == pk) {
            columns.insert(0, pk.to_string());
        }

        // Every name is checked before keys are consumed.
        for column in &columns {
            validate_column_name(column)?;
        }

        if !self.auto_increment_pk {
            let first = self
                .allocator
                .allocate(table, pk, indexes.len())
                .await
                .map_err(|source| CoreError::SequenceAllocation {
                    table: table.to_string(),
                    source,
                })?;
            debug!(table = %table, first, count = indexes.len(), "Allocated primary keys");

            for (offset, &index) in indexes.iter().enumerate() {
                self.rows[index].assign(pk, Value::Int(first + offset as i64));
            }
        }

        let mut inserts = Vec::with_capacity(indexes.len());
        for index in indexes {
            let row = &self.rows[index];
            let mut query = InsertQuery::with_audit_columns(
                table,
                pk,
                self.context.as_ref(),
                &self.config.audit_columns,
            );
            query.set_columns(columns.clone());
            for column in &columns {
                query.fill(column, row.get(column).clone());
            }
            query.set_audit(self.audit);
            inserts.push(query);
        }
        Ok(inserts)
    }

    fn build_updates(&self, table: &str, pk: &str) -> CoreResult<Vec<UpdateQuery>> {
        let mut updates = Vec::new();
        for (index, row) in self.rows.iter().enumerate() {
            let RowState::Updated(changed) = row.state() else {
                continue;
            };
            let key = self.key_of(index, row, pk)?;

            let mut query = UpdateQuery::with_audit_columns(
                table,
                pk,
                self.context.as_ref(),
                &self.config.audit_columns,
            );
            for column in changed.iter() {
                query.set_value(column, row.get(column).clone());
            }
            query.retain_columns(|c| {
                changed.contains(c) || self.columns.iter().any(|col| col.matches(c))
            });
            query.set_where(format!("{} = ?1", pk));
            query.add_param(1, key);
            query.set_audit(self.audit);
            updates.push(query);
        }
        Ok(updates)
    }

    fn build_deletes(&self, table: &str, pk: &str) -> CoreResult<Vec<DeleteQuery>> {
        let mut deletes = Vec::new();
        for (index, row) in self.rows.iter().enumerate() {
            if !row.is_deleted() {
                continue;
            }
            let key = self.key_of(index, row, pk)?;

            let mut query = DeleteQuery::new(table).with_context(self.context.as_ref());
            query.set_where(format!("{} = ?1", pk));
            query.add_param(1, key);
            query.set_audit(self.audit);
            deletes.push(query);
        }
        Ok(deletes)
    }

    /// Key the row had when loaded; an edited key targets the old row.
    fn key_of(&self, index: usize, row: &Row, pk: &str) -> CoreResult<Value> {
        let key = row.original(pk);
        if key.is_null() {
            return Err(CoreError::MissingPrimaryKey {
                index,
                primary_key: pk.to_string(),
            });
        }
        Ok(key.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::ResultSet;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    #[derive(Default)]
    struct FakeGateway {
        result: ResultSet,
        declared: Vec<Column>,
        described: Mutex<Vec<String>>,
        selects: Mutex<Vec<Query>>,
        batches: Mutex<Vec<Vec<Query>>>,
        fail: bool,
    }

    #[async_trait]
    impl ExecutionGateway for FakeGateway {
        async fn execute(&self, query: &Query) -> Result<ResultSet, GatewayError> {
            if self.fail {
                return Err("relation \"producto\" does not exist".into());
            }
            self.selects.lock().unwrap().push(query.clone());
            Ok(self.result.clone())
        }

        async fn execute_batch(&self, queries: &[Query]) -> Result<Vec<u64>, GatewayError> {
            self.batches.lock().unwrap().push(queries.to_vec());
            Ok(vec![1; queries.len()])
        }

        async fn describe(&self, table: &str) -> Result<Vec<Column>, GatewayError> {
            self.described.lock().unwrap().push(table.to_string());
            Ok(self.declared.clone())
        }
    }

    struct FakeAllocator {
        first: i64,
        calls: Mutex<Vec<(String, String, usize)>>,
        fail: bool,
    }

    impl FakeAllocator {
        fn starting_at(first: i64) -> Self {
            FakeAllocator {
                first,
                calls: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            FakeAllocator {
                fail: true,
                ..Self::starting_at(0)
            }
        }
    }

    #[async_trait]
    impl SequenceAllocator for FakeAllocator {
        async fn allocate(
            &self,
            table: &str,
            pk_column: &str,
            count: usize,
        ) -> Result<i64, GatewayError> {
            if self.fail {
                return Err("database is locked".into());
            }
            self.calls
                .lock()
                .unwrap()
                .push((table.to_string(), pk_column.to_string(), count));
            Ok(self.first)
        }
    }

    fn productos() -> ResultSet {
        let columns = vec![
            Column::new("IDE_PROD", "INTEGER").with_order(0),
            Column::new("NOMBRE", "TEXT").with_order(1),
        ];
        let rows = [(1, "Agua"), (2, "Cola")]
            .into_iter()
            .map(|(id, nombre)| {
                let mut row = HashMap::new();
                row.insert("ide_prod".to_string(), Value::Int(id));
                row.insert("nombre".to_string(), Value::from(nombre));
                row
            })
            .collect();
        ResultSet { columns, rows }
    }

    fn store_with(
        gateway: Arc<FakeGateway>,
        allocator: Arc<FakeAllocator>,
        config: TrackingConfig,
    ) -> DataStore {
        DataStore::new(gateway, allocator, Arc::new(config))
    }

    async fn loaded_store() -> (DataStore, Arc<FakeGateway>, Arc<FakeAllocator>) {
        let gateway = Arc::new(FakeGateway {
            result: productos(),
            ..Default::default()
        });
        let allocator = Arc::new(FakeAllocator::starting_at(100));
        let mut ds = store_with(gateway.clone(), allocator.clone(), TrackingConfig::default());
        ds.set_data_store_table("producto", "ide_prod").unwrap();
        ds.execute().await.unwrap();
        (ds, gateway, allocator)
    }

    // -------------------------------------------------------------------------
    // Configuration and execute
    // -------------------------------------------------------------------------

    #[test]
    fn test_select_query_shape() {
        let gateway = Arc::new(FakeGateway::default());
        let allocator = Arc::new(FakeAllocator::starting_at(1));
        let mut ds = store_with(gateway, allocator, TrackingConfig::default());

        assert!(matches!(ds.select_query(), Err(CoreError::NotConfigured)));

        ds.set_data_store_table("producto", "ide_prod").unwrap();
        assert_eq!(
            ds.select_query().unwrap().sql(),
            "SELECT * FROM producto WHERE 1=1 ORDER BY ide_prod"
        );

        ds.set_where_table("activo = true");
        ds.set_select_columns_table(&["ide_prod", "nombre"]).unwrap();
        ds.set_order_column("nombre").unwrap();
        assert_eq!(
            ds.select_query().unwrap().sql(),
            "SELECT ide_prod, nombre FROM producto WHERE 1=1 AND activo = true ORDER BY nombre"
        );
    }

    #[test]
    fn test_configuration_rejects_bad_names() {
        let gateway = Arc::new(FakeGateway::default());
        let allocator = Arc::new(FakeAllocator::starting_at(1));
        let mut ds = store_with(gateway, allocator, TrackingConfig::default());

        assert!(ds.set_data_store_table("", "ide_prod").is_err());
        assert!(ds.set_select_columns_table(&["nombre; --"]).is_err());
    }

    #[tokio::test]
    async fn test_execute_loads_rows() {
        let (ds, gateway, _) = loaded_store().await;

        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.columns().len(), 2);
        assert_eq!(ds.cursor(), 0);
        assert_eq!(ds.get_value(1, "nombre").unwrap(), &Value::from("Cola"));
        assert_eq!(gateway.selects.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_propagates_gateway_error() {
        let gateway = Arc::new(FakeGateway {
            fail: true,
            ..Default::default()
        });
        let allocator = Arc::new(FakeAllocator::starting_at(1));
        let mut ds = store_with(gateway, allocator, TrackingConfig::default());
        ds.set_data_store_table("producto", "ide_prod").unwrap();

        let err = ds.execute().await.unwrap_err();
        assert!(matches!(err, CoreError::Execution(_)));
        assert_eq!(err.to_string(), "relation \"producto\" does not exist");
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_set_then_get_records_column_once() {
        let (mut ds, _, _) = loaded_store().await;

        ds.set_value(0, "nombre", "Agua mineral").unwrap();
        ds.set_value(0, "NOMBRE", "Agua sin gas").unwrap();

        assert_eq!(ds.get_value(0, "Nombre").unwrap(), &Value::from("Agua sin gas"));
        let changed = ds.rows()[0].changed_columns().unwrap();
        assert_eq!(changed.as_slice(), &["nombre".to_string()]);
    }

    #[tokio::test]
    async fn test_lookups_ignore_case() {
        let (ds, _, _) = loaded_store().await;

        assert_eq!(ds.get_index_column("NOMBRE"), Some(1));
        assert_eq!(ds.get_index_column("precio"), None);
        assert_eq!(ds.get_index_row(&Value::Int(2)), Some(1));
        assert_eq!(ds.get_index_row(&Value::from("2")), None);
    }

    #[tokio::test]
    async fn test_unknown_column_and_bad_index() {
        let (mut ds, _, _) = loaded_store().await;

        assert!(matches!(
            ds.set_value(0, "precio", 1_i64),
            Err(CoreError::UnknownColumn { .. })
        ));
        assert!(matches!(
            ds.get_value(5, "nombre"),
            Err(CoreError::RowOutOfRange { index: 5, len: 2 })
        ));
        assert!(ds.delete(9).is_err());
        assert!(ds.move_to(1).is_ok());
        assert_eq!(ds.cursor(), 1);
    }

    #[tokio::test]
    async fn test_insert_prepends_null_row() {
        let (mut ds, _, _) = loaded_store().await;
        ds.move_to(1).unwrap();

        let index = ds.insert();
        assert_eq!(index, 0);
        assert_eq!(ds.cursor(), 0);
        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.get_value(0, "nombre").unwrap(), &Value::Null);
        assert!(ds.rows()[0].is_inserted());
    }

    // -------------------------------------------------------------------------
    // Save
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_save_without_edits_is_empty() {
        let (mut ds, gateway, allocator) = loaded_store().await;

        let summary = ds.save().await.unwrap();
        assert_eq!(summary, SaveSummary::default());
        assert!(ds.pending().is_empty());
        assert!(gateway.batches.lock().unwrap().is_empty());
        assert!(allocator.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inserted_rows_share_one_allocation() {
        let (mut ds, _, allocator) = loaded_store().await;

        for nombre in ["c", "b", "a"] {
            let row = ds.insert();
            ds.set_value(row, "nombre", nombre).unwrap();
        }
        let pending = ds.prepare_save().await.unwrap().to_vec();

        assert_eq!(
            *allocator.calls.lock().unwrap(),
            vec![("producto".to_string(), "ide_prod".to_string(), 3)]
        );
        // row i in insert-filter order receives first + i
        let keys: Vec<_> = pending
            .iter()
            .map(|s| s.as_insert().unwrap().values().get("ide_prod").cloned())
            .collect();
        assert_eq!(
            keys,
            vec![Some(Value::Int(100)), Some(Value::Int(101)), Some(Value::Int(102))]
        );
        assert_eq!(ds.get_value(0, "ide_prod").unwrap(), &Value::Int(100));
        assert_eq!(ds.get_value(0, "nombre").unwrap(), &Value::from("a"));
    }

    #[tokio::test]
    async fn test_insert_then_delete_is_never_persisted() {
        let (mut ds, _, allocator) = loaded_store().await;

        let row = ds.insert();
        ds.set_value(row, "nombre", "Te").unwrap();
        ds.delete(row).unwrap();
        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.rows()[row].state(), &RowState::Discarded);

        assert!(ds.prepare_save().await.unwrap().is_empty());
        assert!(allocator.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_custom_query_is_read_only() {
        let (mut ds, gateway, allocator) = loaded_store().await;
        ds.set_data_store_query(SelectQuery::new("SELECT * FROM producto"), "ide_prod");
        ds.execute().await.unwrap();

        ds.set_value(0, "nombre", "x").unwrap();
        ds.insert();
        ds.delete(2).unwrap();

        assert!(ds.prepare_save().await.unwrap().is_empty());
        let summary = ds.save().await.unwrap();
        assert_eq!(summary.statements(), 0);
        assert!(gateway.batches.lock().unwrap().is_empty());
        assert!(allocator.calls.lock().unwrap().is_empty());

        // switching back to a table does not re-enable mutations
        ds.set_data_store_table("producto", "ide_prod").unwrap();
        ds.execute().await.unwrap();
        ds.set_value(0, "nombre", "y").unwrap();
        assert!(ds.prepare_save().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_producto() {
        let (mut ds, gateway, allocator) = loaded_store().await;

        ds.set_value(0, "nombre", "Agua sin gas").unwrap();
        let row = ds.insert();
        ds.set_value(row, "nombre", "Jugo").unwrap();
        // the originally-second row is now at index 2
        ds.delete(2).unwrap();

        let summary = ds.save().await.unwrap();
        assert_eq!(
            summary,
            SaveSummary {
                inserted: 1,
                updated: 1,
                deleted: 1,
                rows_affected: 3,
            }
        );
        assert_eq!(
            *allocator.calls.lock().unwrap(),
            vec![("producto".to_string(), "ide_prod".to_string(), 1)]
        );

        let pending = ds.pending();
        assert_eq!(pending.len(), 3);

        let insert = pending[0].as_insert().unwrap();
        assert_eq!(insert.values().get("ide_prod"), Some(&Value::Int(100)));
        assert_eq!(insert.values().get("nombre"), Some(&Value::from("Jugo")));

        let update = pending[1].as_update().unwrap();
        assert_eq!(update.values().keys().collect::<Vec<_>>(), vec!["nombre"]);

        let delete = pending[2].as_delete().unwrap();
        assert_eq!(delete.param_values(), vec![Value::Int(2)]);

        let batches = gateway.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        let sql: Vec<_> = batches[0].iter().map(|q| q.sql().to_string()).collect();
        assert_eq!(
            sql,
            vec![
                "INSERT INTO producto (ide_prod, nombre) VALUES (?1, ?2)".to_string(),
                "UPDATE producto SET nombre = ?2 WHERE ide_prod = ?1".to_string(),
                "DELETE FROM producto WHERE ide_prod = ?1".to_string(),
            ]
        );
        assert_eq!(
            batches[0][1].param_values(),
            vec![Value::Int(1), Value::from("Agua sin gas")]
        );
    }

    #[tokio::test]
    async fn test_update_branch_pushes_update_query() {
        let (mut ds, _, _) = loaded_store().await;
        ds.set_value(1, "nombre", "Cola light").unwrap();

        let pending = ds.prepare_save().await.unwrap();
        assert_eq!(pending.len(), 1);
        let update = pending[0].as_update().expect("update branch must push an UpdateQuery");
        assert_eq!(update.table(), "producto");
        assert_eq!(update.where_clause(), Some("ide_prod = ?1"));
        assert_eq!(update.param_values(), vec![Value::Int(2)]);
        assert_eq!(update.values().get("nombre"), Some(&Value::from("Cola light")));
    }

    #[tokio::test]
    async fn test_auto_increment_skips_allocator_and_pk() {
        let (mut ds, gateway, allocator) = loaded_store().await;
        ds.set_auto_increment_primary_key(true);

        let row = ds.insert();
        ds.set_value(row, "nombre", "Te").unwrap();
        ds.save().await.unwrap();

        assert!(allocator.calls.lock().unwrap().is_empty());
        let batches = gateway.batches.lock().unwrap();
        assert_eq!(batches[0][0].sql(), "INSERT INTO producto (nombre) VALUES (?1)");
    }

    #[tokio::test]
    async fn test_allocator_failure_aborts_before_keys_assigned() {
        let gateway = Arc::new(FakeGateway {
            result: productos(),
            ..Default::default()
        });
        let allocator = Arc::new(FakeAllocator::failing());
        let mut ds = store_with(gateway.clone(), allocator, TrackingConfig::default());
        ds.set_data_store_table("producto", "ide_prod").unwrap();
        ds.execute().await.unwrap();

        let row = ds.insert();
        let err = ds.save().await.unwrap_err();

        assert!(matches!(err, CoreError::SequenceAllocation { .. }));
        assert_eq!(ds.get_value(row, "ide_prod").unwrap(), &Value::Null);
        assert!(gateway.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_context_seeds_and_audit_flag() {
        let gateway = Arc::new(FakeGateway {
            result: ResultSet {
                columns: vec![
                    Column::new("ide_prod", "INTEGER"),
                    Column::new("nombre", "TEXT"),
                    Column::new("ide_empr", "INTEGER"),
                    Column::new("usuario_actua", "TEXT"),
                ],
                rows: productos().rows,
            },
            ..Default::default()
        });
        let allocator = Arc::new(FakeAllocator::starting_at(10));
        let config = TrackingConfig {
            audit_mutations: true,
            ..Default::default()
        };
        let ctx = CallerContext::new().tenant(7).branch(3).user("ana");
        let mut ds = store_with(gateway, allocator, config).with_context(ctx);
        ds.set_data_store_table("producto", "ide_prod").unwrap();
        ds.execute().await.unwrap();

        ds.set_value(0, "nombre", "x").unwrap();
        ds.insert();

        let pending = ds.prepare_save().await.unwrap();
        let insert = pending[0].as_insert().unwrap();
        // only schema columns are written; ide_sucu is not in this table
        assert_eq!(
            insert.columns(),
            &["ide_prod", "nombre", "ide_empr", "usuario_actua"].map(String::from)
        );
        assert_eq!(insert.values().get("ide_empr"), Some(&Value::Int(7)));
        assert!(insert.is_audit());

        let update = pending[1].as_update().unwrap();
        assert_eq!(
            update.values().keys().collect::<Vec<_>>(),
            vec!["usuario_actua", "nombre"]
        );
        assert!(update.is_audit());
    }

    #[tokio::test]
    async fn test_missing_primary_key_fails_before_allocation() {
        let gateway = Arc::new(FakeGateway {
            result: ResultSet {
                columns: vec![Column::new("nombre", "TEXT")],
                rows: vec![HashMap::from([("nombre".to_string(), Value::from("a"))])],
            },
            ..Default::default()
        });
        let allocator = Arc::new(FakeAllocator::starting_at(1));
        let mut ds = store_with(gateway, allocator.clone(), TrackingConfig::default());
        ds.set_data_store_table("producto", "ide_prod").unwrap();
        ds.execute().await.unwrap();

        ds.delete(0).unwrap();
        ds.insert();
        assert!(matches!(
            ds.prepare_save().await,
            Err(CoreError::MissingPrimaryKey { index: 1, .. })
        ));
        assert!(allocator.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edited_key_targets_loaded_row() {
        let (mut ds, _, _) = loaded_store().await;
        ds.set_value(0, "ide_prod", 5).unwrap();
        ds.set_value(0, "nombre", "Agua mineral").unwrap();
        ds.set_value(1, "ide_prod", 9).unwrap();
        ds.delete(1).unwrap();

        let pending = ds.prepare_save().await.unwrap();
        let update = pending[0].as_update().unwrap();
        assert_eq!(update.where_clause(), Some("ide_prod = ?1"));
        assert_eq!(update.values().get("ide_prod"), Some(&Value::Int(5)));
        assert_eq!(update.param_values()[0], Value::Int(1));

        let delete = pending[1].as_delete().unwrap();
        assert_eq!(delete.param_values(), vec![Value::Int(2)]);
    }

    #[tokio::test]
    async fn test_bad_column_name_fails_before_allocation() {
        let gateway = Arc::new(FakeGateway {
            result: ResultSet {
                columns: vec![
                    Column::new("ide_prod", "INTEGER"),
                    Column::new("mal nombre", "TEXT"),
                ],
                rows: Vec::new(),
            },
            ..Default::default()
        });
        let allocator = Arc::new(FakeAllocator::starting_at(1));
        let mut ds = store_with(gateway.clone(), allocator.clone(), TrackingConfig::default());
        ds.set_data_store_table("producto", "ide_prod").unwrap();
        ds.execute().await.unwrap();

        let row = ds.insert();
        assert!(matches!(ds.save().await, Err(CoreError::Validation(_))));
        assert!(allocator.calls.lock().unwrap().is_empty());
        assert_eq!(ds.get_value(row, "ide_prod").unwrap(), &Value::Null);
        assert!(gateway.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_execute_merges_declared_schema() {
        let gateway = Arc::new(FakeGateway {
            result: productos(),
            declared: vec![Column::new("nombre", "VARCHAR(80)")
                .required(true)
                .with_precision(Some(80), None)
                .with_default("'sin nombre'")],
            ..Default::default()
        });
        let allocator = Arc::new(FakeAllocator::starting_at(1));
        let mut ds = store_with(gateway.clone(), allocator, TrackingConfig::default());
        ds.set_data_store_table("producto", "ide_prod").unwrap();
        ds.execute().await.unwrap();

        assert_eq!(*gateway.described.lock().unwrap(), vec!["producto".to_string()]);
        let nombre = &ds.columns()[1];
        assert_eq!(nombre.data_type, "VARCHAR(80)");
        assert_eq!(nombre.length, Some(80));
        assert!(nombre.required);
        assert_eq!(nombre.default.as_deref(), Some("'sin nombre'"));
        assert_eq!(nombre.label, "NOMBRE");
        assert!(!ds.columns()[0].required);

        ds.set_data_store_query(SelectQuery::new("SELECT * FROM producto"), "ide_prod");
        ds.execute().await.unwrap();
        assert_eq!(gateway.described.lock().unwrap().len(), 1);
        assert_eq!(ds.columns()[1].data_type, "TEXT");
    }
}
