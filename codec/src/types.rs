//! Core types for the codec.

use bitstream::{BitReader, BitWriter};

/// A simulation tick number.
///
/// Change frames record the tick at which each property last changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnapshotTick(u32);

impl SnapshotTick {
    /// Creates a new snapshot tick.
    #[must_use]
    pub const fn new(tick: u32) -> Self {
        Self(tick)
    }

    /// Returns the raw tick value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns `true` if this tick is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for SnapshotTick {
    fn from(tick: u32) -> Self {
        Self(tick)
    }
}

impl From<SnapshotTick> for u32 {
    fn from(tick: SnapshotTick) -> Self {
        tick.0
    }
}

/// An encoded entity stream: `(index, payload)` pairs followed by a terminator.
///
/// The bit length is tracked separately because streams rarely end on a byte
/// boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedProps {
    bytes: Vec<u8>,
    bits: usize,
}

impl EncodedProps {
    /// Wraps raw bytes. `bits` is clamped to the bytes available.
    #[must_use]
    pub fn new(bytes: Vec<u8>, bits: usize) -> Self {
        let bits = bits.min(bytes.len() * 8);
        Self { bytes, bits }
    }

    /// Takes ownership of a finished writer.
    #[must_use]
    pub fn from_writer(out: BitWriter) -> Self {
        let (bytes, bits) = out.into_parts();
        Self { bytes, bits }
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub const fn bit_len(&self) -> usize {
        self.bits
    }

    /// Returns true if the stream holds no bits at all (not even a terminator).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Returns a reader positioned at the first bit.
    #[must_use]
    pub fn reader(&self) -> BitReader<'_> {
        BitReader::with_bit_len(&self.bytes, self.bits)
    }

    /// Consumes the stream, returning bytes and bit length.
    #[must_use]
    pub fn into_parts(self) -> (Vec<u8>, usize) {
        (self.bytes, self.bits)
    }
}
