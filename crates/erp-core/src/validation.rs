//! # Validation Module
//!
//! Identifier checks applied before any SQL text is assembled.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      What Reaches SQL Text                              │
//! │                                                                         │
//! │  Table names, column names  ──► THIS MODULE ──► formatted into SQL     │
//! │  Cell values                ──► Param list  ──► bound by the gateway   │
//! │  set_where_table fragment   ──► caller-owned, appended verbatim        │
//! │                                                                         │
//! │  Column names may arrive from raw HTTP input (UpdateQuery::set_values) │
//! │  so they are checked at compile time, not only at configuration time.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use erp_core::validation::{validate_identifier, validate_table_name};
//!
//! assert!(validate_table_name("inv.producto").is_ok());
//! assert!(validate_identifier("column", "nombre; DROP TABLE x").is_err());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest identifier accepted (PostgreSQL's NAMEDATALEN - 1).
pub const MAX_IDENTIFIER_LEN: usize = 63;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a plain SQL identifier.
///
/// ## Rules
/// - Must not be empty
/// - At most 63 characters
/// - First character is an ASCII letter or underscore
/// - Remaining characters are ASCII letters, digits or underscores
///
/// ## Arguments
/// * `field` - What the identifier names (used in the error message)
/// * `value` - The identifier to check
pub fn validate_identifier(field: &str, value: &str) -> ValidationResult<()> {
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let mut chars = value.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start || !valid_rest || value.len() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::InvalidIdentifier {
            field: field.to_string(),
            value: value.to_string(),
        });
    }

    Ok(())
}

/// Validates a table name, optionally schema-qualified (`schema.table`).
///
/// ## Example
/// ```rust
/// use erp_core::validation::validate_table_name;
///
/// assert!(validate_table_name("producto").is_ok());
/// assert!(validate_table_name("inv.producto").is_ok());
/// assert!(validate_table_name("").is_err());
/// assert!(validate_table_name("a.b.c").is_err());
/// ```
pub fn validate_table_name(table: &str) -> ValidationResult<()> {
    let table = table.trim();

    if table.is_empty() {
        return Err(ValidationError::Required {
            field: "table name".to_string(),
        });
    }

    let parts: Vec<&str> = table.split('.').collect();
    if parts.len() > 2 {
        return Err(ValidationError::InvalidIdentifier {
            field: "table name".to_string(),
            value: table.to_string(),
        });
    }

    for part in parts {
        validate_identifier("table name", part).map_err(|_| ValidationError::InvalidIdentifier {
            field: "table name".to_string(),
            value: table.to_string(),
        })?;
    }

    Ok(())
}

/// Validates a column name.
pub fn validate_column_name(column: &str) -> ValidationResult<()> {
    validate_identifier("column name", column)
}

/// Validates a requested key block size for the sequence allocator.
///
/// ## Rules
/// - Must be at least 1
/// - Must fit in an i64 counter increment
pub fn validate_block_size(count: usize) -> ValidationResult<()> {
    if count == 0 || count > i64::MAX as usize {
        return Err(ValidationError::OutOfRange {
            field: "sequence block size".to_string(),
            min: 1,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("column", "nombre").is_ok());
        assert!(validate_identifier("column", "_tmp").is_ok());
        assert!(validate_identifier("column", "ide_prod2").is_ok());

        assert!(validate_identifier("column", "").is_err());
        assert!(validate_identifier("column", "2col").is_err());
        assert!(validate_identifier("column", "has space").is_err());
        assert!(validate_identifier("column", "x\"; --").is_err());
        assert!(validate_identifier("column", &"a".repeat(64)).is_err());
    }

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("producto").is_ok());
        assert!(validate_table_name("inv.producto").is_ok());

        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("   ").is_err());
        assert!(validate_table_name("inv.").is_err());
        assert!(validate_table_name("a.b.c").is_err());
        assert!(validate_table_name("producto p").is_err());
    }

    #[test]
    fn test_empty_table_name_is_required_error() {
        let err = validate_table_name("").unwrap_err();
        assert!(matches!(err, ValidationError::Required { .. }));
    }

    #[test]
    fn test_validate_block_size() {
        assert!(validate_block_size(1).is_ok());
        assert!(validate_block_size(500).is_ok());
        assert!(validate_block_size(0).is_err());
    }
}
