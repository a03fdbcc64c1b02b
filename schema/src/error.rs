//! Error types for table construction and flattening.

use thiserror::Error;

use crate::PropKind;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while building or flattening property tables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// An array property has no element template immediately before it.
    #[error("array {table}.{prop} has no preceding element template")]
    ArrayWithoutElement { table: String, prop: String },

    /// An element template is not followed by the array that owns it.
    #[error("element template {table}.{prop} is not followed by an array")]
    DanglingElement { table: String, prop: String },

    /// An array element template has a kind that cannot be an element.
    #[error("array element {table}.{prop} cannot be of kind {kind}")]
    InvalidElementKind {
        table: String,
        prop: String,
        kind: PropKind,
    },

    /// Bit width is not valid for the property kind.
    #[error("{kind} property {prop} cannot use {bits} bits")]
    InvalidBitWidth {
        prop: String,
        kind: PropKind,
        bits: u8,
    },

    /// Quantized float range is empty or not finite.
    #[error("property {prop} has invalid range [{low}, {high}]")]
    InvalidRange { prop: String, low: f32, high: f32 },

    /// Array element count is outside the transferable range.
    #[error("array {prop} declares {count} elements, allowed 1..={max}")]
    InvalidElementCount { prop: String, count: usize, max: usize },

    /// Two properties in one table share a (case-insensitive) name.
    #[error("table {table} declares {prop} more than once")]
    DuplicateProp { table: String, prop: String },

    /// A nested-table property has no table attached.
    #[error("nested table property {prop} has no table")]
    MissingTable { prop: String },

    /// A collapsible nested table also carries a visibility proxy.
    #[error("collapsible table property {prop} cannot have a visibility proxy")]
    CollapsibleWithProxy { prop: String },

    /// A name is empty or contains a NUL byte.
    #[error("invalid name {name:?}")]
    InvalidName { name: String },

    /// Flattening produced more properties than the index space allows.
    #[error("table {table} flattens to {count} properties, maximum is {max}")]
    TooManyProps {
        table: String,
        count: usize,
        max: usize,
    },

    /// Flattening expanded more nested tables than the proxy tree allows.
    #[error("table {table} expands to more than {max} nested tables")]
    TooManyNodes { table: String, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_location() {
        let err = SchemaError::ArrayWithoutElement {
            table: "DT_Player".into(),
            prop: "ammo".into(),
        };
        assert_eq!(
            err.to_string(),
            "array DT_Player.ammo has no preceding element template"
        );
    }

    #[test]
    fn display_bit_width() {
        let err = SchemaError::InvalidBitWidth {
            prop: "health".into(),
            kind: PropKind::Int,
            bits: 40,
        };
        let msg = err.to_string();
        assert!(msg.contains("int"));
        assert!(msg.contains("40"));
    }
}
