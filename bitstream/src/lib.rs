//! MSB-first bit cursor used by the netprop property codec.
//!
//! This crate provides [`BitWriter`] and [`BitReader`] for bit-level encoding and decoding.
//! It is designed for bounded, panic-free operation with explicit error handling.
//!
//! # Design Principles
//!
//! - **No unsafe code** - Safety is paramount.
//! - **Bounded operations** - All reads/writes are bounds-checked.
//! - **No domain knowledge** - This crate knows nothing about entities, tables, or properties.
//! - **Sticky overflow** - A failed read returns an error *and* latches an overflow
//!   flag, so batch decoders can also validate once at the end.
//!
//! # Example
//!
//! ```
//! use bitstream::{BitWriter, BitReader};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bool(true);
//! writer.write_bits(42, 7).unwrap();
//! writer.write_varu32(300);
//!
//! let (bytes, bits) = writer.into_parts();
//!
//! let mut reader = BitReader::with_bit_len(&bytes, bits);
//! assert_eq!(reader.read_bool().unwrap(), true);
//! assert_eq!(reader.read_bits(7).unwrap(), 42);
//! assert_eq!(reader.read_varu32().unwrap(), 300);
//! assert!(reader.is_empty());
//! ```

mod error;
mod reader;
mod writer;

pub use error::{BitError, BitResult};
pub use reader::BitReader;
pub use writer::{BitWriter, MAX_VARINT32_BYTES, MAX_VARINT64_BYTES};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        let _ = BitWriter::new();
        let _ = BitReader::new(&[]);
        let _: BitResult<()> = Ok(());
        assert_eq!(MAX_VARINT32_BYTES, 5);
        assert_eq!(MAX_VARINT64_BYTES, 10);
    }

    #[test]
    fn empty_roundtrip() {
        let writer = BitWriter::new();
        let bytes = writer.finish();
        assert!(bytes.is_empty());

        let reader = BitReader::new(&bytes);
        assert!(reader.is_empty());
    }

    #[test]
    fn bits_roundtrip_various_sizes() {
        let test_cases = [
            (0b1010u64, 4),
            (0xFFu64, 8),
            (0xABCDu64, 16),
            (0x1234_5678u64, 32),
            (u64::MAX, 64),
        ];

        for (value, bits) in test_cases {
            let mut writer = BitWriter::new();
            writer.write_bool(true);
            writer.write_bits(value, bits).unwrap();
            let bytes = writer.finish();

            let mut reader = BitReader::new(&bytes);
            assert!(reader.read_bool().unwrap());
            let read_value = reader.read_bits(bits).unwrap();
            assert_eq!(
                read_value, value,
                "roundtrip failed for {bits}-bit value {value}"
            );
        }
    }

    #[test]
    fn copied_range_reads_back() {
        let mut source = BitWriter::new();
        source.write_bits(0b01, 2).unwrap();
        source.write_varu32(70_000);
        source.write_bits(0b111, 3).unwrap();
        let (src, _) = source.into_parts();

        let mut reader = BitReader::new(&src);
        reader.skip_bits(2).unwrap();
        let start = reader.bits_read();
        reader.read_varu32().unwrap();
        let len = reader.bits_read() - start;

        let mut copy = BitWriter::new();
        copy.write_bit_range(&src, start, len).unwrap();
        let bytes = copy.finish();
        assert_eq!(BitReader::new(&bytes).read_varu32().unwrap(), 70_000);
    }
}
