//! Array properties: an element count followed by that many elements.
//!
//! The count field is just wide enough for the declared element count. Each
//! element is encoded with the array's element template.

use bitstream::{BitReader, BitWriter};
use log::warn;
use schema::{ObjectId, PropValue, RecvProp, RecvProxyData, SchemaError, SendProp};

use super::{clip_string, compare_scalar, decode_value, encode_value, skip_scalar, string_keep};
use crate::error::{CodecError, CodecResult};
use crate::limits::CodecLimits;

pub(crate) fn element_of<T>(prop: &SendProp<T>) -> CodecResult<&SendProp<T>> {
    prop.element().ok_or_else(|| {
        CodecError::Schema(SchemaError::ArrayWithoutElement {
            table: String::new(),
            prop: prop.name().to_owned(),
        })
    })
}

/// Live length of the array on `object`, clamped to the declared maximum.
pub(crate) fn live_len<T>(prop: &SendProp<T>, object: &T, object_id: ObjectId) -> usize {
    let max = prop.num_elements();
    match prop.array_length(object, object_id) {
        Some(len) if len > max => {
            warn!(
                "{}: object {object_id} reports {len} elements, clamping to {max}",
                prop.name()
            );
            max
        }
        Some(len) => len,
        None => max,
    }
}

pub(crate) fn encode_array<T>(
    prop: &SendProp<T>,
    object: &T,
    object_id: ObjectId,
    out: &mut BitWriter,
) -> CodecResult<()> {
    let element = element_of(prop)?;
    let len = live_len(prop, object, object_id);
    out.write_bits(len as u64, prop.array_length_bits())?;
    for index in 0..len {
        let value = element
            .value(object, index)
            .ok_or_else(|| CodecError::MissingAccessor {
                prop: element.name().to_owned(),
            })?;
        encode_value(element, &value, out, object_id)?;
    }
    Ok(())
}

pub(crate) fn read_len<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<usize> {
    let len = input.read_bits(prop.array_length_bits())? as usize;
    if len > prop.num_elements() {
        return Err(CodecError::ArrayLengthOutOfRange {
            prop: prop.name().to_owned(),
            len,
            max: prop.num_elements(),
        });
    }
    Ok(len)
}

pub(crate) fn decode_array<T, R>(
    prop: &SendProp<T>,
    recv: Option<&RecvProp<R>>,
    dst: &mut R,
    object_id: ObjectId,
    input: &mut BitReader<'_>,
    limits: &CodecLimits,
) -> CodecResult<()> {
    let element = element_of(prop)?;
    let len = read_len(prop, input)?;
    if let Some(recv) = recv {
        recv.resize(dst, object_id, len);
    }
    let recv_element = recv.and_then(RecvProp::element);
    let keep = string_keep(limits, recv_element);
    for index in 0..len {
        let value = decode_value(element, input, keep)?;
        if let Some(recv_element) = recv_element {
            recv_element.apply(
                dst,
                &RecvProxyData {
                    value,
                    element: index,
                    object_id,
                },
            );
        }
    }
    Ok(())
}

/// Decodes every element without storing them anywhere.
pub(crate) fn decode_array_values<T>(
    prop: &SendProp<T>,
    input: &mut BitReader<'_>,
    keep: usize,
) -> CodecResult<Vec<PropValue>> {
    let element = element_of(prop)?;
    let len = read_len(prop, input)?;
    (0..len).map(|_| decode_value(element, input, keep)).collect()
}

/// Arrays differ if their lengths differ or any shared element differs. Both
/// readers always end past their whole array.
pub(crate) fn compare_array<T>(
    prop: &SendProp<T>,
    a: &mut BitReader<'_>,
    b: &mut BitReader<'_>,
) -> CodecResult<bool> {
    let element = element_of(prop)?;
    let len_a = read_len(prop, a)?;
    let len_b = read_len(prop, b)?;
    let shared = len_a.min(len_b);

    let mut differ = len_a != len_b;
    for _ in 0..shared {
        differ |= compare_scalar(element, a, b)?;
    }
    for _ in shared..len_a {
        skip_scalar(element, a)?;
    }
    for _ in shared..len_b {
        skip_scalar(element, b)?;
    }
    Ok(differ)
}

/// Skips the array and returns its element count.
pub(crate) fn skip_array<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<usize> {
    let element = element_of(prop)?;
    let len = read_len(prop, input)?;
    for _ in 0..len {
        skip_scalar(element, input)?;
    }
    Ok(len)
}

/// Copies elements straight from `src` to `dst` without quantizing them.
pub(crate) fn fast_copy_array<T, R>(
    prop: &SendProp<T>,
    recv: &RecvProp<R>,
    src: &T,
    dst: &mut R,
    object_id: ObjectId,
) -> CodecResult<()> {
    let element = element_of(prop)?;
    let len = live_len(prop, src, object_id);
    recv.resize(dst, object_id, len);
    let Some(recv_element) = recv.element() else {
        return Ok(());
    };
    let keep = recv_element.string_buffer().saturating_sub(1);
    for index in 0..len {
        let value = element
            .value(src, index)
            .ok_or_else(|| CodecError::MissingAccessor {
                prop: element.name().to_owned(),
            })?;
        recv_element.apply(
            dst,
            &RecvProxyData {
                value: clip_string(value, keep),
                element: index,
                object_id,
            },
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{PropFlags, PropKind, PropTemplate, SendTable};

    struct Ammo {
        slots: Vec<i32>,
    }

    fn ammo_table() -> std::sync::Arc<SendTable<Ammo>> {
        SendTable::builder("DT_Ammo")
            .array_with_length(
                "slots",
                3,
                PropTemplate::int(8, PropFlags::NONE),
                |ammo: &Ammo, i| PropValue::Int(ammo.slots[i]),
                |ammo, _| ammo.slots.len(),
            )
            .build()
            .unwrap()
    }

    fn encode(slots: Vec<i32>) -> (Vec<u8>, usize) {
        let table = ammo_table();
        let prop = table.find_prop("slots").unwrap();
        let mut out = BitWriter::new();
        encode_array(prop, &Ammo { slots }, 0, &mut out).unwrap();
        out.into_parts()
    }

    #[test]
    fn encodes_live_length() {
        let (bytes, bits) = encode(vec![1, 2, 3]);
        assert_eq!(bits, 2 + 3 * 8);
        let table = ammo_table();
        let prop = table.find_prop("slots").unwrap();
        let mut input = BitReader::with_bit_len(&bytes, bits);
        let values = decode_array_values(prop, &mut input, 0).unwrap();
        assert_eq!(values, vec![PropValue::Int(1), PropValue::Int(2), PropValue::Int(3)]);
    }

    #[test]
    fn compare_reports_element_difference() {
        let table = ammo_table();
        let prop = table.find_prop("slots").unwrap();
        let (a, a_bits) = encode(vec![1, 2, 3]);
        let (b, b_bits) = encode(vec![1, 2, 4]);
        let mut ra = BitReader::with_bit_len(&a, a_bits);
        let mut rb = BitReader::with_bit_len(&b, b_bits);
        assert!(compare_array(prop, &mut ra, &mut rb).unwrap());
        assert!(ra.is_empty() && rb.is_empty());
    }

    #[test]
    fn compare_reports_length_difference_and_skips_tail() {
        let table = ammo_table();
        let prop = table.find_prop("slots").unwrap();
        let (a, a_bits) = encode(vec![1, 2]);
        let (b, b_bits) = encode(vec![1, 2, 3]);
        let mut ra = BitReader::with_bit_len(&a, a_bits);
        let mut rb = BitReader::with_bit_len(&b, b_bits);
        assert!(compare_array(prop, &mut ra, &mut rb).unwrap());
        assert!(ra.is_empty() && rb.is_empty());
    }

    #[test]
    fn rejects_count_above_declared() {
        let table: std::sync::Arc<SendTable<Ammo>> = SendTable::builder("DT_Wide")
            .array(
                "slots",
                5,
                PropTemplate::int(8, PropFlags::NONE),
                |ammo: &Ammo, i| PropValue::Int(ammo.slots[i]),
            )
            .build()
            .unwrap();
        let prop = table.find_prop("slots").unwrap();
        assert_eq!(prop.array_length_bits(), 3);

        let mut out = BitWriter::new();
        out.write_bits(7, 3).unwrap();
        let (bytes, bits) = out.into_parts();
        let mut input = BitReader::with_bit_len(&bytes, bits);
        let err = read_len(prop, &mut input).unwrap_err();
        assert_eq!(
            err,
            CodecError::ArrayLengthOutOfRange {
                prop: "slots".into(),
                len: 7,
                max: 5,
            }
        );
    }

    #[test]
    fn element_kind_comes_from_template() {
        let table = ammo_table();
        let prop = table.find_prop("slots").unwrap();
        assert_eq!(element_of(prop).unwrap().kind(), PropKind::Int);
    }
}
