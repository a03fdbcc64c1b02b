//! String properties: a 9-bit byte length followed by the bytes.

use bitstream::{BitReader, BitWriter};
use log::warn;

use crate::error::CodecResult;

const STRING_LENGTH_BITS: u8 = 9;
/// Longest string that fits the length field.
pub(crate) const MAX_STRING_LEN: usize = (1 << STRING_LENGTH_BITS) - 1;

/// Encodes a string, cutting it at the last character boundary that fits.
pub(crate) fn encode_string(value: &str, out: &mut BitWriter, prop: &str) -> CodecResult<()> {
    let mut len = value.len().min(MAX_STRING_LEN);
    while !value.is_char_boundary(len) {
        len -= 1;
    }
    if len < value.len() {
        warn!(
            "{prop}: string of {} bytes truncated to {len} for sending",
            value.len()
        );
    }
    out.write_bits(len as u64, STRING_LENGTH_BITS)?;
    out.write_bytes(&value.as_bytes()[..len]);
    Ok(())
}

/// Decodes a string, keeping at most `keep` bytes.
///
/// Every encoded byte is consumed even when the value is truncated.
pub(crate) fn decode_string(input: &mut BitReader<'_>, keep: usize, prop: &str) -> CodecResult<String> {
    let len = input.read_bits(STRING_LENGTH_BITS)? as usize;
    let mut bytes = input.read_bytes(len)?;
    if len > keep {
        warn!("{prop}: string of {len} bytes truncated to {keep}");
        bytes.truncate(keep);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub(crate) fn compare_string(a: &mut BitReader<'_>, b: &mut BitReader<'_>) -> CodecResult<bool> {
    let len_a = a.read_bits(STRING_LENGTH_BITS)? as usize;
    let len_b = b.read_bits(STRING_LENGTH_BITS)? as usize;
    if len_a != len_b {
        a.skip_bits(len_a * 8)?;
        b.skip_bits(len_b * 8)?;
        return Ok(true);
    }
    Ok(a.compare_bits(b, len_a * 8)?)
}

pub(crate) fn skip_string(input: &mut BitReader<'_>) -> CodecResult<usize> {
    let len = input.read_bits(STRING_LENGTH_BITS)? as usize;
    input.skip_bits(len * 8)?;
    Ok(len)
}
