//! Error types for codec operations.

use bitstream::BitError;
use schema::{PropKind, SchemaError};
use thiserror::Error;
use wire::WireError;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding, decoding, merging or binding entity streams.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// Bitstream error.
    #[error(transparent)]
    Bitstream(#[from] BitError),

    /// Wire framing error.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Table construction or flattening error.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A stream referenced a property index the flat table does not have.
    #[error("property index {index} out of range (flat table has {len})")]
    PropIndexOutOfRange { index: usize, len: usize },

    /// A stream ended early or carried a malformed index sequence.
    #[error("entity stream overflowed at bit {bits_read}")]
    StreamOverflow { bits_read: usize },

    /// A remote property does not match the local receive property.
    #[error("{table}.{prop}: remote sends {remote}, local expects {local}")]
    SchemaMismatch {
        table: String,
        prop: String,
        remote: String,
        local: String,
    },

    /// A remote property has no local receive counterpart.
    #[error("{table}.{prop} has no matching receive property")]
    MissingRecvProp { table: String, prop: String },

    /// The property kind has no value codec.
    #[error("property {prop} of kind {kind} cannot be encoded directly")]
    UnsupportedKind { prop: String, kind: PropKind },

    /// An accessor returned a value of the wrong kind.
    #[error("property {prop} expects a {expected} value, accessor produced {found}")]
    ValueMismatch {
        prop: String,
        expected: PropKind,
        found: PropKind,
    },

    /// A decoded array length exceeds the declared element count.
    #[error("array {prop} carries {len} elements, declared maximum is {max}")]
    ArrayLengthOutOfRange { prop: String, len: usize, max: usize },

    /// A property that must be read from the source object has no accessor.
    #[error("property {prop} has no value accessor")]
    MissingAccessor { prop: String },

    /// A flat table has more properties than the configured limit.
    #[error("table {table} has {count} properties, limit is {max}")]
    TooManyProps {
        table: String,
        count: usize,
        max: usize,
    },

    /// Source and destination layouts differ in a same-process copy.
    #[error("layout hash {found:#018x} does not match decoder {expected:#018x}")]
    DecoderMismatch { expected: u64, found: u64 },

    /// The registry operation is not allowed in its current phase.
    #[error("cannot {operation} while the decoder registry is {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: &'static str,
    },

    /// No decoder is registered for the table name.
    #[error("no decoder bound for table {table}")]
    UnknownTable { table: String },
}
