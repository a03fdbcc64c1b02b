//! Bit-level writer for encoding packed binary data.

use crate::error::{BitError, BitResult};

/// Maximum number of 8-bit groups in a 32-bit varint.
pub const MAX_VARINT32_BYTES: usize = 5;
/// Maximum number of 8-bit groups in a 64-bit varint.
pub const MAX_VARINT64_BYTES: usize = 10;

/// A growable, MSB-first bit writer.
///
/// Bits are packed from the most significant bit of each byte downwards. The
/// exact number of meaningful bits is tracked separately from the byte buffer,
/// so streams that are not byte aligned can be copied and concatenated
/// without introducing padding.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    /// Creates a new empty `BitWriter`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `BitWriter` with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            bit_len: 0,
        }
    }

    /// Returns the number of bits written so far.
    #[must_use]
    pub const fn bits_written(&self) -> usize {
        self.bit_len
    }

    /// Returns the bytes written so far. The trailing partial byte is zero padded.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Writes a single bit.
    pub fn write_bool(&mut self, value: bool) {
        let offset = self.bit_len % 8;
        if offset == 0 {
            self.bytes.push(0);
        }
        if value {
            if let Some(last) = self.bytes.last_mut() {
                *last |= 0x80 >> offset;
            }
        }
        self.bit_len += 1;
    }

    /// Writes up to 64 bits from an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::InvalidBitCount`] if `bits > 64`.
    /// Returns [`BitError::ValueOutOfRange`] if `value` doesn't fit in `bits`.
    pub fn write_bits(&mut self, value: u64, bits: u8) -> BitResult<()> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount {
                bits: bits as usize,
                max_bits: 64,
            });
        }
        if bits < 64 && value >> bits != 0 {
            return Err(BitError::ValueOutOfRange {
                value,
                bits: bits as usize,
            });
        }
        self.push_bits(value, bits);
        Ok(())
    }

    /// Writes the raw IEEE-754 representation of `value`.
    pub fn write_f32(&mut self, value: f32) {
        self.push_bits(u64::from(value.to_bits()), 32);
    }

    /// Writes whole bytes at the current (possibly unaligned) position.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.bit_len % 8 == 0 {
            self.bytes.extend_from_slice(bytes);
            self.bit_len += bytes.len() * 8;
            return;
        }
        for &byte in bytes {
            self.push_bits(u64::from(byte), 8);
        }
    }

    /// Writes `bytes` followed by a NUL terminator.
    pub fn write_cstring(&mut self, bytes: &[u8]) {
        self.write_bytes(bytes);
        self.push_bits(0, 8);
    }

    /// Writes an unsigned varint in 8-bit groups (7 payload bits + continuation).
    pub fn write_varu32(&mut self, value: u32) {
        self.write_varu64(u64::from(value));
    }

    /// Writes a zig-zag encoded signed varint.
    pub fn write_vars32(&mut self, value: i32) {
        self.write_varu32(zigzag_encode32(value));
    }

    /// Writes a 64-bit unsigned varint.
    pub fn write_varu64(&mut self, mut value: u64) {
        while value > 0x7F {
            self.push_bits((value & 0x7F) | 0x80, 8);
            value >>= 7;
        }
        self.push_bits(value, 8);
    }

    /// Writes a zig-zag encoded 64-bit signed varint.
    pub fn write_vars64(&mut self, value: i64) {
        self.write_varu64(zigzag_encode64(value));
    }

    /// Copies `bits` bits starting at bit `start` of `src` (MSB-first).
    ///
    /// # Errors
    ///
    /// Returns [`BitError::EndOfBuffer`] if the range exceeds `src`.
    pub fn write_bit_range(&mut self, src: &[u8], start: usize, bits: usize) -> BitResult<()> {
        let available = (src.len() * 8).saturating_sub(start);
        if bits > available {
            return Err(BitError::EndOfBuffer {
                requested: bits,
                available,
            });
        }
        let mut pos = start;
        let end = start + bits;
        while pos < end {
            let offset = pos % 8;
            let take = (8 - offset).min(end - pos);
            let byte = src[pos / 8];
            let chunk = (byte >> (8 - offset - take)) & (0xFF >> (8 - take));
            self.push_bits(u64::from(chunk), take as u8);
            pos += take;
        }
        Ok(())
    }

    /// Finishes writing and returns the byte buffer.
    ///
    /// If the last byte is incomplete, it is padded with zeros on the right.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }

    /// Finishes writing and returns the byte buffer together with the exact bit length.
    #[must_use]
    pub fn into_parts(self) -> (Vec<u8>, usize) {
        (self.bytes, self.bit_len)
    }

    fn push_bits(&mut self, value: u64, bits: u8) {
        for i in (0..bits).rev() {
            self.write_bool((value >> i) & 1 == 1);
        }
    }
}

pub(crate) const fn zigzag_encode32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

pub(crate) const fn zigzag_encode64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_writer() {
        let writer = BitWriter::new();
        assert_eq!(writer.bits_written(), 0);
        assert!(writer.finish().is_empty());
    }

    #[test]
    fn write_single_bit_true() {
        let mut writer = BitWriter::new();
        writer.write_bool(true);
        assert_eq!(writer.bits_written(), 1);
        assert_eq!(writer.finish(), vec![0b1000_0000]);
    }

    #[test]
    fn write_bits_msb_first() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b101, 3).unwrap();
        writer.write_bits(0b1_1111, 5).unwrap();
        writer.write_bits(0b1, 1).unwrap();
        assert_eq!(writer.bits_written(), 9);
        assert_eq!(writer.finish(), vec![0b1011_1111, 0b1000_0000]);
    }

    #[test]
    fn write_bits_rejects_out_of_range() {
        let mut writer = BitWriter::new();
        let err = writer.write_bits(256, 8).unwrap_err();
        assert!(matches!(err, BitError::ValueOutOfRange { value: 256, bits: 8 }));
        assert_eq!(writer.bits_written(), 0);
    }

    #[test]
    fn write_bits_rejects_too_wide() {
        let mut writer = BitWriter::new();
        let err = writer.write_bits(0, 65).unwrap_err();
        assert!(matches!(err, BitError::InvalidBitCount { bits: 65, .. }));
    }

    #[test]
    fn zero_bits_is_noop() {
        let mut writer = BitWriter::new();
        writer.write_bits(0, 0).unwrap();
        assert_eq!(writer.bits_written(), 0);
    }

    #[test]
    fn unaligned_bytes() {
        let mut writer = BitWriter::new();
        writer.write_bool(true);
        writer.write_bytes(&[0xFF, 0x00]);
        let (bytes, bits) = writer.into_parts();
        assert_eq!(bits, 17);
        assert_eq!(bytes, vec![0xFF, 0x80, 0x00]);
    }

    #[test]
    fn varint_group_count() {
        let mut writer = BitWriter::new();
        writer.write_varu32(0x7F);
        assert_eq!(writer.bits_written(), 8);
        writer.write_varu32(0x80);
        assert_eq!(writer.bits_written(), 24);
        writer.write_varu32(u32::MAX);
        assert_eq!(writer.bits_written(), 24 + 8 * MAX_VARINT32_BYTES);
    }

    #[test]
    fn zigzag_mapping() {
        assert_eq!(zigzag_encode32(0), 0);
        assert_eq!(zigzag_encode32(-1), 1);
        assert_eq!(zigzag_encode32(1), 2);
        assert_eq!(zigzag_encode32(i32::MIN), u32::MAX);
        assert_eq!(zigzag_encode64(-2), 3);
    }

    #[test]
    fn bit_range_copy_unaligned() {
        let mut src = BitWriter::new();
        src.write_bits(0b110, 3).unwrap();
        src.write_bits(0xABC, 12).unwrap();
        let src = src.finish();

        let mut dst = BitWriter::new();
        dst.write_bool(false);
        dst.write_bit_range(&src, 3, 12).unwrap();
        assert_eq!(dst.bits_written(), 13);

        let mut expected = BitWriter::new();
        expected.write_bool(false);
        expected.write_bits(0xABC, 12).unwrap();
        assert_eq!(dst, expected);
    }

    #[test]
    fn bit_range_copy_out_of_bounds() {
        let mut dst = BitWriter::new();
        let err = dst.write_bit_range(&[0xFF], 4, 5).unwrap_err();
        assert!(matches!(
            err,
            BitError::EndOfBuffer {
                requested: 5,
                available: 4
            }
        ));
    }
}
