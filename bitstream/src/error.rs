//! Error types for bitstream operations.

use thiserror::Error;

/// Result type for bitstream operations.
pub type BitResult<T> = Result<T, BitError>;

/// Errors that can occur during bit-level encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitError {
    /// Attempted to read past the end of the buffer.
    #[error("attempted to read {requested} bits but only {available} bits available")]
    EndOfBuffer {
        /// Number of bits requested.
        requested: usize,
        /// Number of bits available.
        available: usize,
    },

    /// Invalid bit count for the operation.
    #[error("invalid bit count {bits}, maximum allowed is {max_bits}")]
    InvalidBitCount {
        /// The invalid bit count provided.
        bits: usize,
        /// Maximum allowed bits for this operation.
        max_bits: usize,
    },

    /// Value exceeds the range representable by the specified number of bits.
    #[error("value {value} cannot be represented in {bits} bits")]
    ValueOutOfRange {
        /// The value that was out of range.
        value: u64,
        /// Number of bits available.
        bits: usize,
    },

    /// A varint kept its continuation bit set past the maximum length.
    #[error("varint exceeds {max_bytes} bytes")]
    InvalidVarint {
        /// Maximum number of 8-bit groups for the target width.
        max_bytes: usize,
    },

    /// A seek landed outside the readable range.
    #[error("seek to bit {target} is outside 0..={len}")]
    SeekOutOfRange {
        /// Requested absolute bit position.
        target: i64,
        /// Readable length in bits.
        len: usize,
    },

    /// A NUL-terminated string ran past its maximum length.
    #[error("string is not terminated within {max_len} bytes")]
    StringTooLong {
        /// Maximum number of bytes before the terminator.
        max_len: usize,
    },
}
