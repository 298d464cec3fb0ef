//! # Column Metadata
//!
//! Static schema descriptor for one result-set field.
//!
//! ## Two Audiences, One Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Column                                         │
//! │                                                                         │
//! │  SQL generation (erp-core)          UI grid (frontend, via ts-rs)      │
//! │  ─────────────────────────          ─────────────────────────────      │
//! │  name          ← lower-cased key    label, header, accessorKey         │
//! │  dataType                           visible, order, size, align        │
//! │                                     mask, component, upperCase, ...    │
//! │                                                                         │
//! │  The DataStore depends only on `name`. Everything else is carried      │
//! │  through unchanged from the execution gateway to the client.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Horizontal alignment hint for the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ColumnAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Metadata for one column of a result set.
///
/// Immutable per result set and shared by all rows of that set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Lower-cased column name. The stable key for row lookups.
    pub name: String,

    /// Identifier of the source table, when the engine reports one.
    pub table_id: Option<i64>,

    /// Engine-specific type identifier.
    pub data_type_id: Option<i64>,

    /// Declared SQL type (e.g. "INTEGER", "TEXT").
    pub data_type: String,

    pub label: String,

    /// Whether the column is NOT NULL.
    pub required: bool,

    pub visible: bool,

    /// Display position (0-based ordinal in the result set).
    pub order: u32,

    pub length: Option<u32>,

    pub decimals: Option<u32>,

    pub disabled: bool,

    /// Default value expression, as text.
    pub default: Option<String>,

    pub mask: Option<String>,

    /// Whether the grid offers a filter for this column.
    pub filter: bool,

    pub comment: Option<String>,

    /// Editor component name ("Text", "Number", "Checkbox", "Calendar").
    pub component: String,

    pub upper_case: bool,

    pub unique: bool,

    pub orderable: bool,

    /// Preferred width in pixels.
    pub size: Option<u32>,

    pub align: ColumnAlign,

    pub header: String,

    pub accessor_key: String,
}

impl Column {
    /// Creates a column with display defaults derived from its name and type.
    ///
    /// ## Defaults
    /// - `name`, `header`, `accessor_key` = lower-cased name
    /// - `label` = name as given
    /// - `component` / `align` derived from `data_type`
    /// - visible, filterable and orderable
    ///
    /// ## Example
    /// ```rust
    /// use erp_core::Column;
    ///
    /// let col = Column::new("Nombre", "TEXT");
    /// assert_eq!(col.name, "nombre");
    /// assert_eq!(col.component, "Text");
    /// ```
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let label: String = name.into();
        let name = label.to_lowercase();
        let data_type: String = data_type.into();
        let component = component_for(&data_type).to_string();
        let align = align_for(&data_type);

        Column {
            header: name.clone(),
            accessor_key: name.clone(),
            name,
            table_id: None,
            data_type_id: None,
            data_type,
            label,
            required: false,
            visible: true,
            order: 0,
            length: None,
            decimals: None,
            disabled: false,
            default: None,
            mask: None,
            filter: true,
            comment: None,
            component,
            upper_case: false,
            unique: false,
            orderable: true,
            size: None,
            align,
        }
    }

    /// Sets the display order.
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Marks the column as NOT NULL.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the declared length and decimals (e.g. NUMERIC(12,2)).
    pub fn with_precision(mut self, length: Option<u32>, decimals: Option<u32>) -> Self {
        self.length = length;
        self.decimals = decimals;
        self
    }

    /// Sets the default value expression.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Takes the schema facts of the table declaration for this column.
    ///
    /// Type, nullability, precision and default come from `declared`; name,
    /// label and display settings stay as reported by the result set. An
    /// empty declared type keeps the reported one.
    pub fn merge_declared(&mut self, declared: &Column) {
        if !declared.data_type.is_empty() {
            self.data_type = declared.data_type.clone();
            self.component = declared.component.clone();
            self.align = declared.align;
        }
        self.required = declared.required;
        self.length = declared.length;
        self.decimals = declared.decimals;
        self.default = declared.default.clone();
    }

    /// Returns true if this column matches `name`, ignoring case.
    #[inline]
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Parses `VARCHAR(80)` / `NUMERIC(12,2)` style declarations.
///
/// ## Returns
/// `(length, decimals)`; both `None` when the type carries no precision.
pub fn parse_precision(declared: &str) -> (Option<u32>, Option<u32>) {
    let open = match declared.find('(') {
        Some(i) => i,
        None => return (None, None),
    };
    let close = declared.rfind(')').unwrap_or(declared.len());
    if close <= open {
        return (None, None);
    }

    let mut parts = declared[open + 1..close].split(',').map(|p| p.trim().parse::<u32>().ok());
    let length = parts.next().flatten();
    let decimals = parts.next().flatten();
    (length, decimals)
}

fn base_type(data_type: &str) -> String {
    data_type
        .split('(')
        .next()
        .unwrap_or_default()
        .trim()
        .to_uppercase()
}

fn component_for(data_type: &str) -> &'static str {
    match base_type(data_type).as_str() {
        "BOOL" | "BOOLEAN" => "Checkbox",
        "DATE" | "DATETIME" | "TIMESTAMP" | "TIMESTAMPTZ" => "Calendar",
        "TIME" => "Time",
        "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "INT4" | "INT8" | "REAL" | "NUMERIC"
        | "DECIMAL" | "FLOAT" | "DOUBLE" => "Number",
        _ => "Text",
    }
}

fn align_for(data_type: &str) -> ColumnAlign {
    match component_for(data_type) {
        "Number" => ColumnAlign::Right,
        "Checkbox" => ColumnAlign::Center,
        _ => ColumnAlign::Left,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_lower_cased() {
        let col = Column::new("IDE_PROD", "INTEGER");
        assert_eq!(col.name, "ide_prod");
        assert_eq!(col.accessor_key, "ide_prod");
        assert_eq!(col.label, "IDE_PROD");
        assert!(col.matches("Ide_Prod"));
    }

    #[test]
    fn test_display_defaults_follow_type() {
        assert_eq!(Column::new("precio", "NUMERIC(12,2)").align, ColumnAlign::Right);
        assert_eq!(Column::new("activo", "BOOLEAN").component, "Checkbox");
        assert_eq!(Column::new("fecha", "DATE").component, "Calendar");
        assert_eq!(Column::new("nombre", "TEXT").align, ColumnAlign::Left);
    }

    #[test]
    fn test_parse_precision() {
        assert_eq!(parse_precision("VARCHAR(80)"), (Some(80), None));
        assert_eq!(parse_precision("NUMERIC(12, 2)"), (Some(12), Some(2)));
        assert_eq!(parse_precision("TEXT"), (None, None));
    }

    #[test]
    fn test_merge_declared_keeps_display() {
        let mut col = Column::new("PRECIO", "NULL").with_order(3);
        let declared = Column::new("precio", "NUMERIC(12,2)")
            .required(true)
            .with_precision(Some(12), Some(2))
            .with_default("0");

        col.merge_declared(&declared);
        assert_eq!(col.data_type, "NUMERIC(12,2)");
        assert_eq!(col.align, ColumnAlign::Right);
        assert_eq!((col.length, col.decimals), (Some(12), Some(2)));
        assert!(col.required);
        assert_eq!(col.default.as_deref(), Some("0"));
        assert_eq!(col.label, "PRECIO");
        assert_eq!(col.order, 3);

        col.merge_declared(&Column::new("precio", ""));
        assert_eq!(col.data_type, "NUMERIC(12,2)");
        assert!(!col.required);
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let json = serde_json::to_value(Column::new("nombre", "TEXT")).unwrap();
        assert_eq!(json["accessorKey"], "nombre");
        assert_eq!(json["dataType"], "TEXT");
        assert_eq!(json["upperCase"], false);
        assert_eq!(json["align"], "left");
    }
}
