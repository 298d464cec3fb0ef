//! # Row State
//!
//! One in-memory row and its pending change.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          RowState                                       │
//! │                                                                         │
//! │            set_value                 set_value (records column once)   │
//! │   Clean ─────────────► Updated([c]) ◄──────┐                           │
//! │     │                     │   └────────────┘                           │
//! │     │ delete              │ delete                                     │
//! │     └────────► Deleted ◄──┘                                            │
//! │                                                                         │
//! │   insert() ──► Inserted ──set_value──► Inserted                        │
//! │                   │ delete                                              │
//! │                   └──────► Discarded   (kept in memory, never saved)   │
//! │                                                                         │
//! │   Inserted and Deleted are exclusive by construction. save() never     │
//! │   resets the state; re-execute() to start clean.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use crate::column::Column;
use crate::value::Value;

static NULL: Value = Value::Null;

/// Ordered, duplicate-free list of changed column names.
///
/// Never empty: it is created with the first changed column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedColumns(Vec<String>);

impl ChangedColumns {
    fn first(column: &str) -> Self {
        ChangedColumns(vec![column.to_string()])
    }

    fn record(&mut self, column: &str) {
        if !self.contains(column) {
            self.0.push(column.to_string());
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.iter().any(|c| c.eq_ignore_ascii_case(column))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Pending change of a row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RowState {
    /// As loaded.
    #[default]
    Clean,
    /// Created with `insert()`; written by the next save.
    Inserted,
    /// Loaded, then edited.
    Updated(ChangedColumns),
    /// Loaded, then marked deleted.
    Deleted,
    /// Inserted, then deleted before any save. Never persisted.
    Discarded,
}

/// Cells keyed by lower-cased column name, plus the row state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: HashMap<String, Value>,
    /// Loaded value of every cell edited since load.
    originals: HashMap<String, Value>,
    state: RowState,
}

impl Row {
    /// A clean row as returned by the gateway.
    pub fn loaded(values: HashMap<String, Value>) -> Self {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        Row {
            values,
            originals: HashMap::new(),
            state: RowState::Clean,
        }
    }

    /// A pending-insert row with every schema column set to NULL.
    pub fn fresh(columns: &[Column]) -> Self {
        Row {
            values: columns
                .iter()
                .map(|c| (c.name.clone(), Value::Null))
                .collect(),
            originals: HashMap::new(),
            state: RowState::Inserted,
        }
    }

    pub fn state(&self) -> &RowState {
        &self.state
    }

    /// Returns the cell, NULL when the row has no such key.
    pub fn get(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&NULL)
    }

    /// Returns the cell as it was loaded, ignoring later edits.
    ///
    /// Pending inserts have no loaded state; their current cell is returned.
    pub fn original(&self, column: &str) -> &Value {
        self.originals
            .get(column)
            .unwrap_or_else(|| self.get(column))
    }

    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    /// Changed columns, when the row is `Updated`.
    pub fn changed_columns(&self) -> Option<&ChangedColumns> {
        match &self.state {
            RowState::Updated(changed) => Some(changed),
            _ => None,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self.state, RowState::Inserted)
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self.state, RowState::Deleted)
    }

    /// Stores a cell and advances the state machine.
    pub(crate) fn set(&mut self, column: &str, value: Value) {
        let previous = self.values.insert(column.to_string(), value);

        if !matches!(self.state, RowState::Inserted | RowState::Discarded)
            && !self.originals.contains_key(column)
        {
            self.originals
                .insert(column.to_string(), previous.unwrap_or(Value::Null));
        }

        match self.state {
            RowState::Clean => self.state = RowState::Updated(ChangedColumns::first(column)),
            RowState::Updated(ref mut changed) => changed.record(column),
            RowState::Inserted | RowState::Deleted | RowState::Discarded => {}
        }
    }

    /// Stores a cell without touching the state (assigned keys).
    pub(crate) fn assign(&mut self, column: &str, value: Value) {
        self.values.insert(column.to_string(), value);
    }

    /// Marks a loaded row deleted. A pending insert is discarded instead.
    pub(crate) fn mark_deleted(&mut self) {
        self.state = match self.state {
            RowState::Inserted | RowState::Discarded => RowState::Discarded,
            _ => RowState::Deleted,
        };
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
