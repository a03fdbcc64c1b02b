//! Vector properties.
//!
//! Components share the float encoding of the property. A `NORMAL` vector
//! sends only x and y plus the sign of z; the receiver rebuilds z from unit
//! length.

use bitstream::{BitReader, BitWriter};
use schema::{ObjectId, PropFlags, SendProp};

use super::float::{compare_float, decode_float, encode_float, skip_float, NORMAL_RESOLUTION};
use crate::error::CodecResult;

pub(crate) fn encode_vector<T>(
    prop: &SendProp<T>,
    value: [f32; 3],
    out: &mut BitWriter,
    object_id: ObjectId,
) -> CodecResult<()> {
    encode_float(prop, value[0], out, object_id)?;
    encode_float(prop, value[1], out, object_id)?;
    if prop.flags().contains(PropFlags::NORMAL) {
        out.write_bool(value[2] <= -NORMAL_RESOLUTION);
    } else {
        encode_float(prop, value[2], out, object_id)?;
    }
    Ok(())
}

pub(crate) fn decode_vector<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<[f32; 3]> {
    let x = decode_float(prop, input)?;
    let y = decode_float(prop, input)?;
    let z = if prop.flags().contains(PropFlags::NORMAL) {
        let sum = x * x + y * y;
        let z = if sum < 1.0 { (1.0 - sum).sqrt() } else { 0.0 };
        if input.read_bool()? {
            -z
        } else {
            z
        }
    } else {
        decode_float(prop, input)?
    };
    Ok([x, y, z])
}

pub(crate) fn compare_vector<T>(
    prop: &SendProp<T>,
    a: &mut BitReader<'_>,
    b: &mut BitReader<'_>,
) -> CodecResult<bool> {
    let mut differ = compare_float(prop, a, b)?;
    differ |= compare_float(prop, a, b)?;
    if prop.flags().contains(PropFlags::NORMAL) {
        differ |= a.compare_bits(b, 1)?;
    } else {
        differ |= compare_float(prop, a, b)?;
    }
    Ok(differ)
}

pub(crate) fn skip_vector<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<()> {
    skip_float(prop, input)?;
    skip_float(prop, input)?;
    if prop.flags().contains(PropFlags::NORMAL) {
        input.skip_bits(1)?;
    } else {
        skip_float(prop, input)?;
    }
    Ok(())
}

pub(crate) fn encode_vector_xy<T>(
    prop: &SendProp<T>,
    value: [f32; 2],
    out: &mut BitWriter,
    object_id: ObjectId,
) -> CodecResult<()> {
    encode_float(prop, value[0], out, object_id)?;
    encode_float(prop, value[1], out, object_id)
}

pub(crate) fn decode_vector_xy<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<[f32; 2]> {
    Ok([decode_float(prop, input)?, decode_float(prop, input)?])
}

pub(crate) fn compare_vector_xy<T>(
    prop: &SendProp<T>,
    a: &mut BitReader<'_>,
    b: &mut BitReader<'_>,
) -> CodecResult<bool> {
    let x = compare_float(prop, a, b)?;
    let y = compare_float(prop, a, b)?;
    Ok(x || y)
}

pub(crate) fn skip_vector_xy<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<()> {
    skip_float(prop, input)?;
    skip_float(prop, input)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unit;

    fn vector_prop(flags: PropFlags) -> SendProp<Unit> {
        SendProp::vector("value", 12, -10.0, 10.0, flags, |_| [0.0; 3])
    }

    fn encode(prop: &SendProp<Unit>, value: [f32; 3]) -> (Vec<u8>, usize) {
        let mut out = BitWriter::new();
        encode_vector(prop, value, &mut out, 0).unwrap();
        out.into_parts()
    }

    #[test]
    fn ranged_vector_roundtrip() {
        let prop = vector_prop(PropFlags::NONE);
        let (bytes, bits) = encode(&prop, [1.0, -2.0, 9.5]);
        assert_eq!(bits, 36);
        let mut input = BitReader::with_bit_len(&bytes, bits);
        let decoded = decode_vector(&prop, &mut input).unwrap();
        for (got, want) in decoded.iter().zip([1.0, -2.0, 9.5]) {
            assert!((got - want).abs() < 0.01, "{got} vs {want}");
        }
    }

    #[test]
    fn normal_vector_rebuilds_z() {
        let prop = vector_prop(PropFlags::NORMAL);
        let (bytes, bits) = encode(&prop, [0.6, 0.0, -0.8]);
        assert_eq!(bits, 12 + 12 + 1);
        let mut input = BitReader::with_bit_len(&bytes, bits);
        let [x, y, z] = decode_vector(&prop, &mut input).unwrap();
        assert!((x - 0.6).abs() < 0.001);
        assert_eq!(y, 0.0);
        assert!((z + 0.8).abs() < 0.002);
    }

    #[test]
    fn skip_and_compare_consume_the_same_bits() {
        let prop = vector_prop(PropFlags::COORD);
        let (a, a_bits) = encode(&prop, [1.5, 0.0, -3.0]);
        let (b, b_bits) = encode(&prop, [1.5, 0.0, -3.0]);

        let mut input = BitReader::with_bit_len(&a, a_bits);
        skip_vector(&prop, &mut input).unwrap();
        assert!(input.is_empty());

        let mut ra = BitReader::with_bit_len(&a, a_bits);
        let mut rb = BitReader::with_bit_len(&b, b_bits);
        assert!(!compare_vector(&prop, &mut ra, &mut rb).unwrap());
        assert!(ra.is_empty() && rb.is_empty());
    }

    #[test]
    fn vector_xy_roundtrip() {
        let prop: SendProp<Unit> = SendProp::vector_xy("xy", 0, 0.0, 0.0, PropFlags::NOSCALE, |_| [0.0; 2]);
        let mut out = BitWriter::new();
        encode_vector_xy(&prop, [0.25, -7.0], &mut out, 0).unwrap();
        let (bytes, bits) = out.into_parts();
        let mut input = BitReader::with_bit_len(&bytes, bits);
        assert_eq!(decode_vector_xy(&prop, &mut input).unwrap(), [0.25, -7.0]);
    }
}
