//! Per-kind property codecs.
//!
//! Every kind supports the same operations: encode, decode, compare two
//! encodings, skip, and test for the zero value. The functions here dispatch
//! on [`PropKind`]; the kind modules hold the bit layouts.

mod array;
mod float;
mod int;
mod string;
mod vector;

use bitstream::{BitReader, BitWriter};
use schema::{ObjectId, PropKind, PropValue, RecvProp, RecvProxyData, SendProp};

use crate::error::{CodecError, CodecResult};
use crate::limits::CodecLimits;
use crate::types::EncodedProps;

pub(crate) use array::decode_array_values;

/// Encodes one scalar value with `prop`'s encoding.
pub fn encode_value<T>(
    prop: &SendProp<T>,
    value: &PropValue,
    out: &mut BitWriter,
    object_id: ObjectId,
) -> CodecResult<()> {
    match (prop.kind(), value) {
        (PropKind::Int, PropValue::Int(v)) => int::encode_int(prop, *v, out),
        (PropKind::Int64, PropValue::Int64(v)) => int::encode_int64(prop, *v, out),
        (PropKind::Float, PropValue::Float(v)) => float::encode_float(prop, *v, out, object_id),
        (PropKind::Vector, PropValue::Vector(v)) => vector::encode_vector(prop, *v, out, object_id),
        (PropKind::VectorXY, PropValue::VectorXY(v)) => {
            vector::encode_vector_xy(prop, *v, out, object_id)
        }
        (PropKind::String, PropValue::String(v)) => string::encode_string(v, out, prop.name()),
        (kind @ (PropKind::Array | PropKind::DataTable), _) => Err(unsupported(prop, kind)),
        (expected, value) => Err(CodecError::ValueMismatch {
            prop: prop.name().to_owned(),
            expected,
            found: value.kind(),
        }),
    }
}

/// Reads `prop` from `object` through its accessors and encodes it.
pub fn encode_prop<T>(
    prop: &SendProp<T>,
    object: &T,
    object_id: ObjectId,
    out: &mut BitWriter,
) -> CodecResult<()> {
    match prop.kind() {
        PropKind::Array => array::encode_array(prop, object, object_id, out),
        PropKind::DataTable => Err(unsupported(prop, PropKind::DataTable)),
        _ => {
            let value = prop.value(object, 0).ok_or_else(|| CodecError::MissingAccessor {
                prop: prop.name().to_owned(),
            })?;
            encode_value(prop, &value, out, object_id)
        }
    }
}

/// Decodes one scalar value. Strings longer than `max_string_len` bytes are truncated.
pub fn decode_value<T>(
    prop: &SendProp<T>,
    input: &mut BitReader<'_>,
    max_string_len: usize,
) -> CodecResult<PropValue> {
    Ok(match prop.kind() {
        PropKind::Int => PropValue::Int(int::decode_int(prop, input)?),
        PropKind::Int64 => PropValue::Int64(int::decode_int64(prop, input)?),
        PropKind::Float => PropValue::Float(float::decode_float(prop, input)?),
        PropKind::Vector => PropValue::Vector(vector::decode_vector(prop, input)?),
        PropKind::VectorXY => PropValue::VectorXY(vector::decode_vector_xy(prop, input)?),
        PropKind::String => {
            PropValue::String(string::decode_string(input, max_string_len, prop.name())?)
        }
        kind @ (PropKind::Array | PropKind::DataTable) => return Err(unsupported(prop, kind)),
    })
}

/// Decodes `prop` and stores it into `dst` through `recv`.
///
/// With no receive property the value is decoded and dropped, so the stream
/// stays aligned.
pub fn decode_prop<T, R>(
    prop: &SendProp<T>,
    recv: Option<&RecvProp<R>>,
    dst: &mut R,
    object_id: ObjectId,
    input: &mut BitReader<'_>,
    limits: &CodecLimits,
) -> CodecResult<()> {
    if prop.kind() == PropKind::Array {
        return array::decode_array(prop, recv, dst, object_id, input, limits);
    }
    let value = decode_value(prop, input, string_keep(limits, recv))?;
    if let Some(recv) = recv {
        recv.apply(
            dst,
            &RecvProxyData {
                value,
                element: 0,
                object_id,
            },
        );
    }
    Ok(())
}

/// Compares the next encoding of `prop` in two streams and reports whether
/// they differ. Both readers end past their encoding either way.
pub fn compare_deltas<T>(
    prop: &SendProp<T>,
    a: &mut BitReader<'_>,
    b: &mut BitReader<'_>,
) -> CodecResult<bool> {
    if prop.kind() == PropKind::Array {
        return array::compare_array(prop, a, b);
    }
    compare_scalar(prop, a, b)
}

/// Returns true if `prop` holds its kind's zero value on `object`.
pub fn is_zero<T>(prop: &SendProp<T>, object: &T, object_id: ObjectId) -> CodecResult<bool> {
    match prop.kind() {
        PropKind::Array => Ok(array::live_len(prop, object, object_id) == 0),
        PropKind::DataTable => Err(unsupported(prop, PropKind::DataTable)),
        _ => prop
            .value(object, 0)
            .map(|value| value.is_zero())
            .ok_or_else(|| CodecError::MissingAccessor {
                prop: prop.name().to_owned(),
            }),
    }
}

/// Reads the next encoding of `prop` and reports whether it decodes to zero.
pub fn is_encoded_zero<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<bool> {
    Ok(match prop.kind() {
        PropKind::Array => array::skip_array(prop, input)? == 0,
        PropKind::String => string::skip_string(input)? == 0,
        _ => decode_value(prop, input, 0)?.is_zero(),
    })
}

/// Stores the zero value of `prop` into `dst`. Arrays are resized to empty.
pub fn decode_zero<T, R>(
    prop: &SendProp<T>,
    recv: Option<&RecvProp<R>>,
    dst: &mut R,
    object_id: ObjectId,
) -> CodecResult<()> {
    let Some(recv) = recv else {
        return Ok(());
    };
    match prop.kind() {
        PropKind::Array => recv.resize(dst, object_id, 0),
        kind => {
            let value = PropValue::zero(kind).ok_or_else(|| unsupported(prop, kind))?;
            recv.apply(
                dst,
                &RecvProxyData {
                    value,
                    element: 0,
                    object_id,
                },
            );
        }
    }
    Ok(())
}

/// Advances past the next encoding of `prop` without decoding it.
pub fn skip_prop<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<()> {
    if prop.kind() == PropKind::Array {
        array::skip_array(prop, input)?;
        return Ok(());
    }
    skip_scalar(prop, input)
}

/// Copies the next encoding of `prop` from `input` to `out` bit for bit.
///
/// Returns the number of bits copied.
pub fn copy_prop_data<T>(
    prop: &SendProp<T>,
    input: &mut BitReader<'_>,
    out: &mut BitWriter,
) -> CodecResult<usize> {
    let start = input.bits_read();
    skip_prop(prop, input)?;
    let bits = input.bits_read() - start;
    out.write_bit_range(input.data(), start, bits)?;
    Ok(bits)
}

/// Extracts the raw encoding of `prop` as a standalone bit buffer.
pub fn decode_bits<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<EncodedProps> {
    let mut out = BitWriter::new();
    copy_prop_data(prop, input, &mut out)?;
    Ok(EncodedProps::from_writer(out))
}

/// Copies `prop` from `src` to `dst` without going through the bit encoding.
pub fn fast_copy<T, R>(
    prop: &SendProp<T>,
    recv: &RecvProp<R>,
    src: &T,
    dst: &mut R,
    object_id: ObjectId,
) -> CodecResult<()> {
    match prop.kind() {
        PropKind::Array => array::fast_copy_array(prop, recv, src, dst, object_id),
        PropKind::DataTable => Err(unsupported(prop, PropKind::DataTable)),
        _ => {
            let value = prop.value(src, 0).ok_or_else(|| CodecError::MissingAccessor {
                prop: prop.name().to_owned(),
            })?;
            recv.apply(
                dst,
                &RecvProxyData {
                    value: clip_string(value, recv.string_buffer().saturating_sub(1)),
                    element: 0,
                    object_id,
                },
            );
            Ok(())
        }
    }
}

/// Human-readable name of a property kind.
#[must_use]
pub const fn type_name(kind: PropKind) -> &'static str {
    kind.type_name()
}

pub(crate) fn compare_scalar<T>(
    prop: &SendProp<T>,
    a: &mut BitReader<'_>,
    b: &mut BitReader<'_>,
) -> CodecResult<bool> {
    match prop.kind() {
        PropKind::Int => int::compare_int(prop, a, b),
        PropKind::Int64 => int::compare_int64(prop, a, b),
        PropKind::Float => float::compare_float(prop, a, b),
        PropKind::Vector => vector::compare_vector(prop, a, b),
        PropKind::VectorXY => vector::compare_vector_xy(prop, a, b),
        PropKind::String => string::compare_string(a, b),
        kind @ (PropKind::Array | PropKind::DataTable) => Err(unsupported(prop, kind)),
    }
}

pub(crate) fn skip_scalar<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<()> {
    match prop.kind() {
        PropKind::Int => int::skip_int(prop, input),
        PropKind::Int64 => int::skip_int64(prop, input),
        PropKind::Float => float::skip_float(prop, input),
        PropKind::Vector => vector::skip_vector(prop, input),
        PropKind::VectorXY => vector::skip_vector_xy(prop, input),
        PropKind::String => string::skip_string(input).map(|_| ()),
        kind @ (PropKind::Array | PropKind::DataTable) => Err(unsupported(prop, kind)),
    }
}

/// Bytes of a decoded string that fit both the codec limit and the receive buffer.
pub(crate) fn string_keep<R>(limits: &CodecLimits, recv: Option<&RecvProp<R>>) -> usize {
    let buffer = recv.map_or(usize::MAX, RecvProp::string_buffer);
    limits.max_string_bytes.min(buffer).saturating_sub(1)
}

pub(crate) fn clip_string(value: PropValue, keep: usize) -> PropValue {
    match value {
        PropValue::String(s) if s.len() > keep => {
            let mut bytes = s.into_bytes();
            bytes.truncate(keep);
            PropValue::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        other => other,
    }
}

fn unsupported<T>(prop: &SendProp<T>, kind: PropKind) -> CodecError {
    CodecError::UnsupportedKind {
        prop: prop.name().to_owned(),
        kind,
    }
}
