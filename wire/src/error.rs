//! Error types for wire format operations.

use std::fmt;

use bitstream::BitError;
use schema::SchemaError;
use thiserror::Error;

/// Result type for wire format operations.
pub type WireResult<T> = Result<T, WireError>;

/// Errors raised while framing property indices or transferring tables.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum WireError {
    /// The underlying bit cursor failed.
    #[error(transparent)]
    Bitstream(#[from] BitError),

    /// A received table failed validation.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Property indices must be written in strictly increasing order.
    #[error("property index {index} does not follow {last}")]
    IndexNotIncreasing { index: usize, last: i64 },

    /// Property index beyond the maximum table size.
    #[error("property index {index} out of range (max {max})")]
    IndexOutOfRange { index: usize, max: usize },

    /// Unsupported protocol version.
    #[error("unsupported protocol version: {found}")]
    UnsupportedVersion { found: u16 },

    /// Unknown property type code.
    #[error("unknown property type code: {raw}")]
    UnknownKind { raw: u8 },

    /// A transmitted name is not valid UTF-8.
    #[error("{field} name is not valid UTF-8")]
    InvalidName { field: &'static str },

    /// Limits exceeded.
    #[error("{kind} limit exceeded: {actual} > {limit}")]
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// A nested-table property names a table that was not transmitted.
    #[error("table {referenced_by} references unknown table {table}")]
    UnknownTable { table: String, referenced_by: String },

    /// Nested-table references form a cycle.
    #[error("table {table} contains itself")]
    CyclicTable { table: String },

    /// The same table name was transmitted twice.
    #[error("table {table} transmitted more than once")]
    DuplicateTable { table: String },
}

/// Specific wire limits that can be exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    TableCount,
    PropCount,
    NameLength,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TableCount => "table count",
            Self::PropCount => "property count",
            Self::NameLength => "name length",
        };
        f.write_str(name)
    }
}
