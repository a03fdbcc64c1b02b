//! Stream-level delta operations: merging, diffing, filtering and inspection.
//!
//! All of these work on encoded streams without decoding values into an
//! object. Payloads are copied bit for bit, so merged streams decode exactly
//! like their sources.

use bitstream::BitWriter;
use schema::{FlatTable, PropKind, PropValue, SendProp};
use wire::{DeltaBitsReader, DeltaBitsWriter};

use crate::decode::{ensure_not_overflowed, walk_props};
use crate::error::{CodecError, CodecResult};
use crate::limits::CodecLimits;
use crate::props::{self, compare_deltas, copy_prop_data, skip_prop};
use crate::types::EncodedProps;

/// One property read back from a stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodedProp {
    pub index: usize,
    pub name: String,
    pub kind: PropKind,
    pub value: DecodedValue,
}

/// Value of a [`DecodedProp`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecodedValue {
    Scalar(PropValue),
    Array(Vec<PropValue>),
}

/// Overlays `new` on `old`.
///
/// The result holds every property of either stream, taking the `new` payload
/// where both have one. Also returns the indices present in `new`, which are
/// the properties that changed.
pub fn merge_deltas<T>(
    flat: &FlatTable<T>,
    old: Option<&EncodedProps>,
    new: &EncodedProps,
) -> CodecResult<(EncodedProps, Vec<usize>)> {
    let mut out = BitWriter::new();
    let mut changed = Vec::new();
    let mut new_input = new.reader();
    let mut old_input = old.map(EncodedProps::reader);

    {
        let mut writer = DeltaBitsWriter::new(&mut out);
        let mut new_reader = DeltaBitsReader::new(&mut new_input);
        let mut old_reader = old_input.as_mut().map(DeltaBitsReader::new);
        let result = merge_entries(
            flat,
            old_reader.as_mut(),
            &mut new_reader,
            &mut writer,
            &mut changed,
        );
        if result.is_err() {
            new_reader.force_finished();
            if let Some(reader) = old_reader.as_mut() {
                reader.force_finished();
            }
        }
        result?;
        writer.finish();
    }

    ensure_not_overflowed(&new_input)?;
    if let Some(input) = &old_input {
        ensure_not_overflowed(input)?;
    }
    Ok((EncodedProps::from_writer(out), changed))
}

fn merge_entries<T>(
    flat: &FlatTable<T>,
    mut old: Option<&mut DeltaBitsReader<'_, '_>>,
    new: &mut DeltaBitsReader<'_, '_>,
    writer: &mut DeltaBitsWriter<'_>,
    changed: &mut Vec<usize>,
) -> CodecResult<()> {
    let mut old_next = match old.as_deref_mut() {
        Some(reader) => next_checked(flat, reader)?,
        None => None,
    };
    let mut new_next = next_checked(flat, new)?;

    loop {
        let (index, from_old) = match (old_next, new_next) {
            (None, None) => return Ok(()),
            (Some(old_index), Some(new_index)) if new_index < old_index => (new_index, false),
            (Some(old_index), _) => (old_index, true),
            (None, Some(new_index)) => (new_index, false),
        };
        let prop = prop_at(flat, index)?;

        if from_old {
            let Some(reader) = old.as_deref_mut() else {
                old_next = None;
                continue;
            };
            if new_next == Some(index) {
                skip_prop(prop, reader.input())?;
            } else {
                writer.write_index(index)?;
                copy_prop_data(prop, reader.input(), writer.out())?;
            }
            old_next = next_checked(flat, reader)?;
        } else {
            writer.write_index(index)?;
            copy_prop_data(prop, new.input(), writer.out())?;
            changed.push(index);
            new_next = next_checked(flat, new)?;
        }
    }
}

/// Lists the properties whose encoding differs between `from` and `to`.
///
/// Properties only in `to` count as changed; properties only in `from` do not.
pub fn calc_delta<T>(flat: &FlatTable<T>, from: &EncodedProps, to: &EncodedProps) -> CodecResult<Vec<usize>> {
    let mut changed = Vec::new();
    let mut from_input = from.reader();
    let mut to_input = to.reader();
    {
        let mut from_reader = DeltaBitsReader::new(&mut from_input);
        let mut to_reader = DeltaBitsReader::new(&mut to_input);
        let result = diff_entries(flat, &mut from_reader, &mut to_reader, &mut changed);
        from_reader.force_finished();
        if result.is_err() {
            to_reader.force_finished();
        }
        result?;
    }
    ensure_not_overflowed(&from_input)?;
    ensure_not_overflowed(&to_input)?;
    Ok(changed)
}

fn diff_entries<T>(
    flat: &FlatTable<T>,
    from: &mut DeltaBitsReader<'_, '_>,
    to: &mut DeltaBitsReader<'_, '_>,
    changed: &mut Vec<usize>,
) -> CodecResult<()> {
    let mut from_next = next_checked(flat, from)?;
    let mut to_next = next_checked(flat, to)?;

    while let Some(to_index) = to_next {
        match from_next {
            Some(from_index) if from_index < to_index => {
                skip_prop(prop_at(flat, from_index)?, from.input())?;
                from_next = next_checked(flat, from)?;
            }
            Some(from_index) if from_index == to_index => {
                let prop = prop_at(flat, to_index)?;
                if compare_deltas(prop, from.input(), to.input())? {
                    changed.push(to_index);
                }
                from_next = next_checked(flat, from)?;
                to_next = next_checked(flat, to)?;
            }
            _ => {
                skip_prop(prop_at(flat, to_index)?, to.input())?;
                changed.push(to_index);
                to_next = next_checked(flat, to)?;
            }
        }
    }
    Ok(())
}

/// Copies the entries of `stream` whose index is in `indices` into a new stream.
///
/// `indices` must be sorted. Indices missing from `stream` are ignored.
pub fn write_prop_list<T>(
    flat: &FlatTable<T>,
    stream: &EncodedProps,
    indices: &[usize],
) -> CodecResult<EncodedProps> {
    debug_assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
    let mut out = BitWriter::new();
    let mut writer = DeltaBitsWriter::new(&mut out);
    let mut wanted = indices.iter().copied().peekable();

    walk_props(stream, |index, input| {
        let prop = prop_at(flat, index)?;
        while wanted.next_if(|&want| want < index).is_some() {}
        if wanted.next_if_eq(&index).is_some() {
            writer.write_index(index)?;
            copy_prop_data(prop, input, writer.out())?;
        } else {
            skip_prop(prop, input)?;
        }
        Ok(())
    })?;
    writer.finish();
    Ok(EncodedProps::from_writer(out))
}

/// Lists the indices present in `stream`.
pub fn prop_indices<T>(flat: &FlatTable<T>, stream: &EncodedProps) -> CodecResult<Vec<usize>> {
    let mut indices = Vec::new();
    walk_props(stream, |index, input| {
        skip_prop(prop_at(flat, index)?, input)?;
        indices.push(index);
        Ok(())
    })?;
    Ok(indices)
}

/// Decodes every entry of `stream` into name/value pairs.
pub fn read_props<T>(
    flat: &FlatTable<T>,
    stream: &EncodedProps,
    limits: &CodecLimits,
) -> CodecResult<Vec<DecodedProp>> {
    let keep = limits.max_string_bytes.saturating_sub(1);
    let mut decoded = Vec::new();
    walk_props(stream, |index, input| {
        let prop = prop_at(flat, index)?;
        let value = if prop.kind() == PropKind::Array {
            DecodedValue::Array(props::decode_array_values(prop, input, keep)?)
        } else {
            DecodedValue::Scalar(props::decode_value(prop, input, keep)?)
        };
        decoded.push(DecodedProp {
            index,
            name: prop.name().to_owned(),
            kind: prop.kind(),
            value,
        });
        Ok(())
    })?;
    Ok(decoded)
}

fn prop_at<T>(flat: &FlatTable<T>, index: usize) -> CodecResult<&SendProp<T>> {
    flat.prop(index)
        .map(|prop| &**prop)
        .ok_or(CodecError::PropIndexOutOfRange {
            index,
            len: flat.len(),
        })
}

fn next_checked<T>(flat: &FlatTable<T>, reader: &mut DeltaBitsReader<'_, '_>) -> CodecResult<Option<usize>> {
    match reader.next_index()? {
        Some(index) if index >= flat.len() => Err(CodecError::PropIndexOutOfRange {
            index,
            len: flat.len(),
        }),
        next => Ok(next),
    }
}
