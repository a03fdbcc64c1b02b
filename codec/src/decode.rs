//! Entity decoding.

use bitstream::BitReader;
use schema::ObjectId;
use wire::DeltaBitsReader;

use crate::binding::RecvDecoder;
use crate::error::{CodecError, CodecResult};
use crate::props;
use crate::types::EncodedProps;

/// Decodes `props` into `dst`.
///
/// Properties the decoder has no receive property for are decoded and
/// dropped. A stream that ends early or carries an invalid index sequence is
/// rejected, but properties before the fault have already been applied.
pub fn decode<R>(
    decoder: &RecvDecoder<R>,
    props: &EncodedProps,
    dst: &mut R,
    object_id: ObjectId,
) -> CodecResult<()> {
    let limit = decoder.len().min(decoder.limits().max_properties);
    walk_props(props, |index, input| {
        if index >= limit {
            return Err(CodecError::PropIndexOutOfRange {
                index,
                len: decoder.len(),
            });
        }
        let prop = decoder.prop(index).ok_or(CodecError::PropIndexOutOfRange {
            index,
            len: decoder.len(),
        })?;
        props::decode_prop(
            prop,
            decoder.recv_prop(index),
            dst,
            object_id,
            input,
            decoder.limits(),
        )
    })
}

/// Stores the zero value of every property into `dst`.
pub fn decode_zero<R>(decoder: &RecvDecoder<R>, dst: &mut R, object_id: ObjectId) -> CodecResult<()> {
    for (index, prop) in decoder.flat().props().iter().enumerate() {
        props::decode_zero(prop, decoder.recv_prop(index), dst, object_id)?;
    }
    Ok(())
}

/// Walks the `(index, payload)` pairs of `props`.
///
/// `visit` must consume exactly the payload of `index`. Fails with
/// [`CodecError::StreamOverflow`] if the stream was truncated.
pub(crate) fn walk_props<F>(props: &EncodedProps, mut visit: F) -> CodecResult<()>
where
    F: FnMut(usize, &mut BitReader<'_>) -> CodecResult<()>,
{
    let mut input = props.reader();
    let mut reader = DeltaBitsReader::new(&mut input);
    let result = walk_entries(&mut reader, &mut visit);
    if result.is_err() {
        reader.force_finished();
    }
    drop(reader);
    result?;
    ensure_not_overflowed(&input)
}

fn walk_entries<F>(reader: &mut DeltaBitsReader<'_, '_>, visit: &mut F) -> CodecResult<()>
where
    F: FnMut(usize, &mut BitReader<'_>) -> CodecResult<()>,
{
    while let Some(index) = reader.next_index()? {
        visit(index, reader.input())?;
    }
    Ok(())
}

pub(crate) fn ensure_not_overflowed(input: &BitReader<'_>) -> CodecResult<()> {
    if input.is_overflowed() {
        return Err(CodecError::StreamOverflow {
            bits_read: input.bits_read(),
        });
    }
    Ok(())
}
