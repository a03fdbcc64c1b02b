//! 32- and 64-bit integer properties.
//!
//! Fixed-width integers write their low `bits` bits; signed values are sign
//! extended on decode. `VARINT` integers use the bitstream varints (zig-zag
//! for signed values) and ignore `bits`.

use bitstream::{BitReader, BitWriter};
use schema::{PropFlags, SendProp};

use crate::error::CodecResult;

pub(crate) fn encode_int<T>(prop: &SendProp<T>, value: i32, out: &mut BitWriter) -> CodecResult<()> {
    let flags = prop.flags();
    let unsigned = flags.contains(PropFlags::UNSIGNED);
    if flags.contains(PropFlags::VARINT) {
        if unsigned {
            out.write_varu32(value as u32);
        } else {
            out.write_vars32(value);
        }
        return Ok(());
    }

    let bits = prop.bits();
    debug_assert!(
        int_fits(value, bits, unsigned),
        "{} = {value} does not fit in {bits} bits",
        prop.name()
    );
    out.write_bits(u64::from(value as u32) & mask(bits), bits)?;
    Ok(())
}

pub(crate) fn decode_int<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<i32> {
    let flags = prop.flags();
    let unsigned = flags.contains(PropFlags::UNSIGNED);
    if flags.contains(PropFlags::VARINT) {
        return Ok(if unsigned {
            input.read_varu32()? as i32
        } else {
            input.read_vars32()?
        });
    }

    let bits = prop.bits();
    let raw = input.read_bits(bits)? as u32;
    if unsigned || bits >= 32 {
        return Ok(raw as i32);
    }
    let shift = 32 - u32::from(bits);
    Ok(((raw << shift) as i32) >> shift)
}

pub(crate) fn compare_int<T>(
    prop: &SendProp<T>,
    a: &mut BitReader<'_>,
    b: &mut BitReader<'_>,
) -> CodecResult<bool> {
    if prop.flags().contains(PropFlags::VARINT) {
        return Ok(decode_int(prop, a)? != decode_int(prop, b)?);
    }
    Ok(a.compare_bits(b, usize::from(prop.bits()))?)
}

pub(crate) fn skip_int<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<()> {
    if prop.flags().contains(PropFlags::VARINT) {
        decode_int(prop, input)?;
    } else {
        input.skip_bits(usize::from(prop.bits()))?;
    }
    Ok(())
}

/// Signed fixed-width 64-bit values are written as a sign bit, the low 32 bits
/// of the magnitude, then the rest of the magnitude in `bits - 33` bits.
/// Unsigned values skip the sign bit.
pub(crate) fn encode_int64<T>(prop: &SendProp<T>, value: i64, out: &mut BitWriter) -> CodecResult<()> {
    let flags = prop.flags();
    let unsigned = flags.contains(PropFlags::UNSIGNED);
    if flags.contains(PropFlags::VARINT) {
        if unsigned {
            out.write_varu64(value as u64);
        } else {
            out.write_vars64(value);
        }
        return Ok(());
    }

    let (magnitude, high_bits) = if unsigned {
        (value as u64, prop.bits() - 32)
    } else {
        out.write_bool(value < 0);
        (value.unsigned_abs(), prop.bits() - 33)
    };
    let high = magnitude >> 32;
    debug_assert!(
        high & !mask(high_bits) == 0,
        "{} = {value} does not fit in {} bits",
        prop.name(),
        prop.bits()
    );
    out.write_bits(magnitude & 0xFFFF_FFFF, 32)?;
    out.write_bits(high & mask(high_bits), high_bits)?;
    Ok(())
}

pub(crate) fn decode_int64<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<i64> {
    let flags = prop.flags();
    let unsigned = flags.contains(PropFlags::UNSIGNED);
    if flags.contains(PropFlags::VARINT) {
        return Ok(if unsigned {
            input.read_varu64()? as i64
        } else {
            input.read_vars64()?
        });
    }

    if unsigned {
        let low = input.read_bits(32)?;
        let high = input.read_bits(prop.bits() - 32)?;
        return Ok(((high << 32) | low) as i64);
    }
    let negative = input.read_bool()?;
    let low = input.read_bits(32)?;
    let high = input.read_bits(prop.bits() - 33)?;
    let magnitude = ((high << 32) | low) as i64;
    Ok(if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    })
}

pub(crate) fn compare_int64<T>(
    prop: &SendProp<T>,
    a: &mut BitReader<'_>,
    b: &mut BitReader<'_>,
) -> CodecResult<bool> {
    if prop.flags().contains(PropFlags::VARINT) {
        return Ok(decode_int64(prop, a)? != decode_int64(prop, b)?);
    }
    Ok(a.compare_bits(b, usize::from(prop.bits()))?)
}

pub(crate) fn skip_int64<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<()> {
    if prop.flags().contains(PropFlags::VARINT) {
        decode_int64(prop, input)?;
    } else {
        input.skip_bits(usize::from(prop.bits()))?;
    }
    Ok(())
}

const fn mask(bits: u8) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

fn int_fits(value: i32, bits: u8, unsigned: bool) -> bool {
    if bits >= 32 {
        return true;
    }
    if unsigned {
        (value as u32) >> bits == 0
    } else {
        let half = 1i64 << (bits - 1);
        (-half..half).contains(&i64::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unit;

    fn int_prop(bits: u8, flags: PropFlags) -> SendProp<Unit> {
        SendProp::int("value", bits, flags, |_| 0)
    }

    fn int64_prop(bits: u8, flags: PropFlags) -> SendProp<Unit> {
        SendProp::int64("value", bits, flags, |_| 0)
    }

    fn roundtrip(prop: &SendProp<Unit>, value: i32) -> (i32, usize) {
        let mut out = BitWriter::new();
        encode_int(prop, value, &mut out).unwrap();
        let (bytes, bits) = out.into_parts();
        let mut input = BitReader::with_bit_len(&bytes, bits);
        (decode_int(prop, &mut input).unwrap(), bits)
    }

    fn roundtrip64(prop: &SendProp<Unit>, value: i64) -> (i64, usize) {
        let mut out = BitWriter::new();
        encode_int64(prop, value, &mut out).unwrap();
        let (bytes, bits) = out.into_parts();
        let mut input = BitReader::with_bit_len(&bytes, bits);
        (decode_int64(prop, &mut input).unwrap(), bits)
    }

    #[test]
    fn unsigned_fixed_width() {
        let prop = int_prop(8, PropFlags::UNSIGNED);
        assert_eq!(roundtrip(&prop, 200), (200, 8));
    }

    #[test]
    fn signed_fixed_width_sign_extends() {
        let prop = int_prop(6, PropFlags::NONE);
        assert_eq!(roundtrip(&prop, -32), (-32, 6));
        assert_eq!(roundtrip(&prop, 31), (31, 6));
        assert_eq!(roundtrip(&prop, -1), (-1, 6));
    }

    #[test]
    fn full_width_values() {
        let signed = int_prop(32, PropFlags::NONE);
        assert_eq!(roundtrip(&signed, i32::MIN).0, i32::MIN);
        let unsigned = int_prop(32, PropFlags::UNSIGNED);
        assert_eq!(roundtrip(&unsigned, -1).0, -1);
    }

    #[test]
    fn varint_ignores_bits() {
        let prop = int_prop(0, PropFlags::VARINT);
        assert_eq!(roundtrip(&prop, -3), (-3, 8));
        let unsigned = int_prop(0, PropFlags::VARINT | PropFlags::UNSIGNED);
        assert_eq!(roundtrip(&unsigned, 300), (300, 16));
    }

    #[test]
    fn int64_signed_layout() {
        let prop = int64_prop(40, PropFlags::NONE);
        let (value, bits) = roundtrip64(&prop, -(1i64 << 36) - 5);
        assert_eq!(value, -(1i64 << 36) - 5);
        assert_eq!(bits, 40);
    }

    #[test]
    fn int64_unsigned_layout() {
        let prop = int64_prop(48, PropFlags::UNSIGNED);
        assert_eq!(roundtrip64(&prop, 0x7FFF_1234_5678), (0x7FFF_1234_5678, 48));
    }

    #[test]
    fn int64_varint() {
        let prop = int64_prop(0, PropFlags::VARINT);
        assert_eq!(roundtrip64(&prop, i64::MIN).0, i64::MIN);
    }

    #[test]
    fn compare_detects_difference() {
        let prop = int_prop(8, PropFlags::UNSIGNED);
        let encode = |v| {
            let mut out = BitWriter::new();
            encode_int(&prop, v, &mut out).unwrap();
            out.into_parts()
        };
        let (a, a_bits) = encode(10);
        let (b, b_bits) = encode(11);
        let mut ra = BitReader::with_bit_len(&a, a_bits);
        let mut rb = BitReader::with_bit_len(&b, b_bits);
        assert!(compare_int(&prop, &mut ra, &mut rb).unwrap());
        let mut ra = BitReader::with_bit_len(&a, a_bits);
        let mut rc = BitReader::with_bit_len(&a, a_bits);
        assert!(!compare_int(&prop, &mut ra, &mut rc).unwrap());
    }

    #[test]
    fn skip_consumes_width() {
        let prop = int64_prop(40, PropFlags::NONE);
        let mut out = BitWriter::new();
        encode_int64(&prop, 9, &mut out).unwrap();
        out.write_bool(true);
        let (bytes, bits) = out.into_parts();
        let mut input = BitReader::with_bit_len(&bytes, bits);
        skip_int64(&prop, &mut input).unwrap();
        assert!(input.read_bool().unwrap());
    }

    #[test]
    fn fits_checks_range() {
        assert!(int_fits(127, 8, false));
        assert!(!int_fits(128, 8, false));
        assert!(int_fits(255, 8, true));
        assert!(!int_fits(256, 8, true));
    }
}
