//! Bit-level reader for decoding packed binary data.

use crate::error::{BitError, BitResult};
use crate::writer::{MAX_VARINT32_BYTES, MAX_VARINT64_BYTES};

/// A bit-level reader over a borrowed, MSB-first buffer.
///
/// Every failed read or seek latches the overflow flag in addition to
/// returning an error, so callers that batch many reads can check
/// [`is_overflowed`](Self::is_overflowed) once at the end.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_len: usize,
    pos: usize,
    overflowed: bool,
}

impl<'a> BitReader<'a> {
    /// Creates a reader over every bit of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_len: data.len() * 8,
            pos: 0,
            overflowed: false,
        }
    }

    /// Creates a reader limited to the first `bits` bits of `data`.
    #[must_use]
    pub fn with_bit_len(data: &'a [u8], bits: usize) -> Self {
        Self {
            data,
            bit_len: bits.min(data.len() * 8),
            pos: 0,
            overflowed: false,
        }
    }

    /// Returns the underlying buffer.
    #[must_use]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the readable length in bits.
    #[must_use]
    pub const fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Returns the number of bits consumed so far.
    #[must_use]
    pub const fn bits_read(&self) -> usize {
        self.pos
    }

    /// Returns the number of bits left to read.
    #[must_use]
    pub const fn bits_remaining(&self) -> usize {
        self.bit_len - self.pos
    }

    /// Returns true if no bits remain.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pos >= self.bit_len
    }

    /// Returns true once any read or seek has gone out of range.
    #[must_use]
    pub const fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Latches the overflow flag without moving the cursor.
    pub fn force_overflow(&mut self) {
        self.overflowed = true;
    }

    /// Reads a single bit.
    pub fn read_bool(&mut self) -> BitResult<bool> {
        self.ensure(1)?;
        let bit = self.bit_at(self.pos);
        self.pos += 1;
        Ok(bit)
    }

    /// Reads up to 64 bits as an unsigned integer.
    pub fn read_bits(&mut self, bits: u8) -> BitResult<u64> {
        if bits > 64 {
            self.overflowed = true;
            return Err(BitError::InvalidBitCount {
                bits: bits as usize,
                max_bits: 64,
            });
        }
        self.ensure(bits as usize)?;
        let mut value = 0u64;
        for _ in 0..bits {
            value = (value << 1) | u64::from(self.bit_at(self.pos));
            self.pos += 1;
        }
        Ok(value)
    }

    /// Reads a raw IEEE-754 single.
    pub fn read_f32(&mut self) -> BitResult<f32> {
        Ok(f32::from_bits(self.read_bits(32)? as u32))
    }

    /// Reads `len` whole bytes from the current (possibly unaligned) position.
    pub fn read_bytes(&mut self, len: usize) -> BitResult<Vec<u8>> {
        self.ensure(len.saturating_mul(8))?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(self.read_bits(8)? as u8);
        }
        Ok(out)
    }

    /// Reads a NUL-terminated string of at most `max_len` bytes (terminator excluded).
    pub fn read_cstring(&mut self, max_len: usize) -> BitResult<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let byte = self.read_bits(8)? as u8;
            if byte == 0 {
                return Ok(out);
            }
            if out.len() == max_len {
                self.overflowed = true;
                return Err(BitError::StringTooLong { max_len });
            }
            out.push(byte);
        }
    }

    /// Reads an unsigned varint written by [`BitWriter::write_varu32`](crate::BitWriter::write_varu32).
    pub fn read_varu32(&mut self) -> BitResult<u32> {
        Ok(self.read_varint(MAX_VARINT32_BYTES)? as u32)
    }

    /// Reads a zig-zag encoded signed varint.
    pub fn read_vars32(&mut self) -> BitResult<i32> {
        let raw = self.read_varu32()?;
        Ok(((raw >> 1) as i32) ^ -((raw & 1) as i32))
    }

    /// Reads a 64-bit unsigned varint.
    pub fn read_varu64(&mut self) -> BitResult<u64> {
        self.read_varint(MAX_VARINT64_BYTES)
    }

    /// Reads a zig-zag encoded 64-bit signed varint.
    pub fn read_vars64(&mut self) -> BitResult<i64> {
        let raw = self.read_varu64()?;
        Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
    }

    /// Advances the cursor by `bits` without decoding.
    pub fn skip_bits(&mut self, bits: usize) -> BitResult<()> {
        self.ensure(bits)?;
        self.pos += bits;
        Ok(())
    }

    /// Moves the cursor to an absolute bit position.
    pub fn seek(&mut self, position: usize) -> BitResult<()> {
        if position > self.bit_len {
            self.overflowed = true;
            return Err(BitError::SeekOutOfRange {
                target: position as i64,
                len: self.bit_len,
            });
        }
        self.pos = position;
        Ok(())
    }

    /// Moves the cursor relative to its current position.
    pub fn seek_relative(&mut self, delta: isize) -> BitResult<()> {
        let target = self.pos as i64 + delta as i64;
        if target < 0 || target > self.bit_len as i64 {
            self.overflowed = true;
            return Err(BitError::SeekOutOfRange {
                target,
                len: self.bit_len,
            });
        }
        self.pos = target as usize;
        Ok(())
    }

    /// Consumes `bits` bits from both readers and reports whether they differ.
    pub fn compare_bits(&mut self, other: &mut BitReader<'_>, bits: usize) -> BitResult<bool> {
        self.ensure(bits)?;
        other.ensure(bits)?;
        let mut differ = false;
        let mut remaining = bits;
        while remaining > 0 {
            let take = remaining.min(64) as u8;
            differ |= self.read_bits(take)? != other.read_bits(take)?;
            remaining -= take as usize;
        }
        Ok(differ)
    }

    fn read_varint(&mut self, max_bytes: usize) -> BitResult<u64> {
        let mut value = 0u64;
        for group in 0..max_bytes {
            let byte = self.read_bits(8)?;
            value |= (byte & 0x7F).checked_shl(7 * group as u32).unwrap_or(0);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        self.overflowed = true;
        Err(BitError::InvalidVarint { max_bytes })
    }

    fn ensure(&mut self, bits: usize) -> BitResult<()> {
        let available = self.bits_remaining();
        if bits > available {
            self.overflowed = true;
            return Err(BitError::EndOfBuffer {
                requested: bits,
                available,
            });
        }
        Ok(())
    }

    fn bit_at(&self, pos: usize) -> bool {
        (self.data[pos / 8] >> (7 - pos % 8)) & 1 == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BitWriter;

    #[test]
    fn empty_reader() {
        let reader = BitReader::new(&[]);
        assert!(reader.is_empty());
        assert_eq!(reader.bits_remaining(), 0);
    }

    #[test]
    fn read_past_end_latches_overflow() {
        let mut reader = BitReader::new(&[0xFF]);
        reader.read_bits(6).unwrap();
        let err = reader.read_bits(3).unwrap_err();
        assert!(matches!(
            err,
            BitError::EndOfBuffer {
                requested: 3,
                available: 2
            }
        ));
        assert!(reader.is_overflowed());
        assert_eq!(reader.bits_read(), 6);
    }

    #[test]
    fn bit_len_limits_reads() {
        let mut reader = BitReader::with_bit_len(&[0xFF, 0xFF], 9);
        assert_eq!(reader.read_bits(9).unwrap(), 0x1FF);
        assert!(reader.read_bool().is_err());
    }

    #[test]
    fn seek_and_rewind() {
        let mut reader = BitReader::new(&[0b1010_0000]);
        assert!(reader.read_bool().unwrap());
        reader.seek_relative(-1).unwrap();
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        reader.seek(1).unwrap();
        assert_eq!(reader.read_bits(2).unwrap(), 0b01);
        assert!(!reader.is_overflowed());
    }

    #[test]
    fn seek_out_of_range() {
        let mut reader = BitReader::new(&[0]);
        assert!(reader.seek_relative(-1).is_err());
        assert!(reader.is_overflowed());

        let mut reader = BitReader::new(&[0]);
        assert!(reader.seek(9).is_err());
        assert!(reader.seek(8).is_ok());
        assert!(reader.is_empty());
    }

    #[test]
    fn varint_roundtrip() {
        let mut writer = BitWriter::new();
        writer.write_bool(true);
        writer.write_varu32(300);
        writer.write_vars32(-5);
        writer.write_varu64(u64::MAX);
        writer.write_vars64(i64::MIN);
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_varu32().unwrap(), 300);
        assert_eq!(reader.read_vars32().unwrap(), -5);
        assert_eq!(reader.read_varu64().unwrap(), u64::MAX);
        assert_eq!(reader.read_vars64().unwrap(), i64::MIN);
    }

    #[test]
    fn varint_too_long() {
        let bytes = [0xFF; 6];
        let mut reader = BitReader::new(&bytes);
        let err = reader.read_varu32().unwrap_err();
        assert!(matches!(err, BitError::InvalidVarint { max_bytes: 5 }));
        assert!(reader.is_overflowed());
    }

    #[test]
    fn cstring_roundtrip_and_limit() {
        let mut writer = BitWriter::new();
        writer.write_bool(false);
        writer.write_cstring(b"DT_Player");
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        reader.read_bool().unwrap();
        assert_eq!(reader.read_cstring(64).unwrap(), b"DT_Player");

        let mut reader = BitReader::new(&bytes);
        reader.read_bool().unwrap();
        let err = reader.read_cstring(4).unwrap_err();
        assert!(matches!(err, BitError::StringTooLong { max_len: 4 }));
    }

    #[test]
    fn compare_bits_detects_difference() {
        let mut a = BitReader::new(&[0xAB, 0xCD]);
        let mut b = BitReader::new(&[0xAB, 0xCC]);
        assert!(!a.compare_bits(&mut b, 8).unwrap());
        assert!(a.compare_bits(&mut b, 8).unwrap());
        assert_eq!(a.bits_read(), 16);
        assert_eq!(b.bits_read(), 16);
    }

    #[test]
    fn f32_roundtrip() {
        let mut writer = BitWriter::new();
        writer.write_bits(1, 3).unwrap();
        writer.write_f32(-12.75);
        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);
        reader.read_bits(3).unwrap();
        assert!((reader.read_f32().unwrap() - -12.75).abs() < f32::EPSILON);
    }
}
