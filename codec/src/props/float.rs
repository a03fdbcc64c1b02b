//! Float properties and the special float encodings.
//!
//! A float is encoded one of five ways, chosen by its flags in this order:
//!
//! - `COORD`: integer and fraction flags, sign, 14-bit integer, 5-bit fraction.
//! - `COORD_MP*`: as `COORD` with an 11-bit in-bounds integer; the low
//!   precision variant uses a 3-bit fraction and the integral variant none.
//! - `NORMAL`: sign and an 11-bit fraction of 1.
//! - `NOSCALE`: the raw IEEE-754 bits.
//! - otherwise the value is quantized over `[low, high]` in `bits` bits.

use bitstream::{BitReader, BitWriter};
use log::warn;
use schema::{ObjectId, PropFlags, SendProp};

use crate::error::CodecResult;

const COORD_INTEGER_BITS: u8 = 14;
const COORD_FRACTIONAL_BITS: u8 = 5;
const COORD_DENOMINATOR: f32 = (1 << COORD_FRACTIONAL_BITS) as f32;
const COORD_RESOLUTION: f32 = 1.0 / COORD_DENOMINATOR;
const MAX_COORD_INTEGER: u32 = 1 << COORD_INTEGER_BITS;

const COORD_INTEGER_BITS_MP: u8 = 11;
const COORD_FRACTIONAL_BITS_MP_LOWPRECISION: u8 = 3;
const COORD_DENOMINATOR_LOWPRECISION: f32 = (1 << COORD_FRACTIONAL_BITS_MP_LOWPRECISION) as f32;
const COORD_RESOLUTION_LOWPRECISION: f32 = 1.0 / COORD_DENOMINATOR_LOWPRECISION;

const NORMAL_FRACTIONAL_BITS: u8 = 11;
const NORMAL_DENOMINATOR: u32 = (1 << NORMAL_FRACTIONAL_BITS) - 1;
pub(crate) const NORMAL_RESOLUTION: f32 = 1.0 / NORMAL_DENOMINATOR as f32;

/// Widest raw encoding of a coord value: three flag bits, integer and fraction.
const MAX_COORD_SPAN: usize = 3 + COORD_INTEGER_BITS as usize + COORD_FRACTIONAL_BITS as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FloatEncoding {
    Coord,
    CoordMp { integral: bool, low_precision: bool },
    Normal,
    NoScale,
    Ranged,
}

impl FloatEncoding {
    fn of(flags: PropFlags) -> Self {
        if flags.contains(PropFlags::COORD) {
            Self::Coord
        } else if flags.intersects(
            PropFlags::COORD_MP | PropFlags::COORD_MP_LOWPRECISION | PropFlags::COORD_MP_INTEGRAL,
        ) {
            Self::CoordMp {
                integral: flags.contains(PropFlags::COORD_MP_INTEGRAL),
                low_precision: flags.contains(PropFlags::COORD_MP_LOWPRECISION),
            }
        } else if flags.contains(PropFlags::NORMAL) {
            Self::Normal
        } else if flags.contains(PropFlags::NOSCALE) {
            Self::NoScale
        } else {
            Self::Ranged
        }
    }
}

pub(crate) fn encode_float<T>(
    prop: &SendProp<T>,
    value: f32,
    out: &mut BitWriter,
    object_id: ObjectId,
) -> CodecResult<()> {
    match FloatEncoding::of(prop.flags()) {
        FloatEncoding::Coord => write_coord(out, value),
        FloatEncoding::CoordMp {
            integral,
            low_precision,
        } => write_coord_mp(out, value, integral, low_precision),
        FloatEncoding::Normal => write_normal(out, value),
        FloatEncoding::NoScale => {
            out.write_f32(value);
            Ok(())
        }
        FloatEncoding::Ranged => write_ranged(prop, value, out, object_id),
    }
}

pub(crate) fn decode_float<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<f32> {
    match FloatEncoding::of(prop.flags()) {
        FloatEncoding::Coord => read_coord(input),
        FloatEncoding::CoordMp {
            integral,
            low_precision,
        } => read_coord_mp(input, integral, low_precision),
        FloatEncoding::Normal => read_normal(input),
        FloatEncoding::NoScale => Ok(input.read_f32()?),
        FloatEncoding::Ranged => {
            let bits = prop.bits();
            let raw = input.read_bits(bits)?;
            let fraction = raw as f32 / ranged_max(bits) as f32;
            Ok(prop.low() + (prop.high() - prop.low()) * fraction)
        }
    }
}

pub(crate) fn compare_float<T>(
    prop: &SendProp<T>,
    a: &mut BitReader<'_>,
    b: &mut BitReader<'_>,
) -> CodecResult<bool> {
    match FloatEncoding::of(prop.flags()) {
        FloatEncoding::Coord | FloatEncoding::CoordMp { .. } => {
            Ok(read_coord_span(prop, a)? != read_coord_span(prop, b)?)
        }
        _ => Ok(a.compare_bits(b, fixed_width(prop))?),
    }
}

pub(crate) fn skip_float<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<()> {
    match FloatEncoding::of(prop.flags()) {
        FloatEncoding::Coord => {
            let has_int = input.read_bool()?;
            let has_fract = input.read_bool()?;
            if has_int || has_fract {
                let mut skip = 1;
                if has_int {
                    skip += usize::from(COORD_INTEGER_BITS);
                }
                if has_fract {
                    skip += usize::from(COORD_FRACTIONAL_BITS);
                }
                input.skip_bits(skip)?;
            }
        }
        FloatEncoding::CoordMp { .. } => {
            decode_float(prop, input)?;
        }
        _ => input.skip_bits(fixed_width(prop))?,
    }
    Ok(())
}

/// Payload width of the fixed-width encodings.
fn fixed_width<T>(prop: &SendProp<T>) -> usize {
    match FloatEncoding::of(prop.flags()) {
        FloatEncoding::NoScale => 32,
        FloatEncoding::Normal => usize::from(NORMAL_FRACTIONAL_BITS) + 1,
        _ => usize::from(prop.bits()),
    }
}

/// Reads the raw bits of a coord encoding, prefixed with a marker bit so
/// encodings of different lengths never compare equal.
fn read_coord_span<T>(prop: &SendProp<T>, input: &mut BitReader<'_>) -> CodecResult<u64> {
    let start = input.bits_read();
    skip_float(prop, input)?;
    let len = input.bits_read() - start;
    debug_assert!(len <= MAX_COORD_SPAN);
    input.seek(start)?;
    let raw = input.read_bits(len as u8)?;
    Ok((1u64 << len) | raw)
}

const fn ranged_max(bits: u8) -> u64 {
    (1u64 << bits) - 1
}

fn write_ranged<T>(
    prop: &SendProp<T>,
    value: f32,
    out: &mut BitWriter,
    object_id: ObjectId,
) -> CodecResult<()> {
    let flags = prop.flags();
    let bits = prop.bits();
    let max = ranged_max(bits);
    let raw = if value < prop.low() {
        if !flags.contains(PropFlags::ROUNDUP) && prop.take_clamp_warning() {
            warn!(
                "{}: value {value} below low {} on object {object_id}, clamping",
                prop.name(),
                prop.low()
            );
        }
        0
    } else if value > prop.high() {
        if !flags.contains(PropFlags::ROUNDDOWN) && prop.take_clamp_warning() {
            warn!(
                "{}: value {value} above high {} on object {object_id}, clamping",
                prop.name(),
                prop.high()
            );
        }
        max
    } else {
        let scaled = ((value - prop.low()) * prop.high_low_mul()).round();
        (scaled as u64).min(max)
    };
    out.write_bits(raw, bits)?;
    Ok(())
}

fn write_coord(out: &mut BitWriter, value: f32) -> CodecResult<()> {
    let negative = value <= -COORD_RESOLUTION;
    let int_part = (value.abs() as u32).min(MAX_COORD_INTEGER);
    let fract_part = ((value * COORD_DENOMINATOR) as i32).unsigned_abs() & ((1 << COORD_FRACTIONAL_BITS) - 1);

    out.write_bool(int_part != 0);
    out.write_bool(fract_part != 0);
    if int_part != 0 || fract_part != 0 {
        out.write_bool(negative);
        if int_part != 0 {
            out.write_bits(u64::from(int_part - 1), COORD_INTEGER_BITS)?;
        }
        if fract_part != 0 {
            out.write_bits(u64::from(fract_part), COORD_FRACTIONAL_BITS)?;
        }
    }
    Ok(())
}

fn read_coord(input: &mut BitReader<'_>) -> CodecResult<f32> {
    let has_int = input.read_bool()?;
    let has_fract = input.read_bool()?;
    if !has_int && !has_fract {
        return Ok(0.0);
    }
    let negative = input.read_bool()?;
    let int_part = if has_int {
        input.read_bits(COORD_INTEGER_BITS)? + 1
    } else {
        0
    };
    let fract_part = if has_fract {
        input.read_bits(COORD_FRACTIONAL_BITS)?
    } else {
        0
    };
    let value = int_part as f32 + fract_part as f32 * COORD_RESOLUTION;
    Ok(if negative { -value } else { value })
}

fn write_coord_mp(out: &mut BitWriter, value: f32, integral: bool, low_precision: bool) -> CodecResult<()> {
    let (resolution, denominator, fract_bits) = mp_precision(low_precision);
    let negative = value <= -resolution;
    let int_part = (value.abs() as u32).min(MAX_COORD_INTEGER);
    let fract_part = ((value * denominator) as i32).unsigned_abs() & ((1 << fract_bits) - 1);
    let in_bounds = int_part < (1 << COORD_INTEGER_BITS_MP);
    let int_bits = if in_bounds {
        COORD_INTEGER_BITS_MP
    } else {
        COORD_INTEGER_BITS
    };

    out.write_bool(in_bounds);
    out.write_bool(int_part != 0);
    if integral {
        if int_part != 0 {
            out.write_bool(negative);
            out.write_bits(u64::from(int_part - 1), int_bits)?;
        }
    } else {
        out.write_bool(negative);
        if int_part != 0 {
            out.write_bits(u64::from(int_part - 1), int_bits)?;
        }
        out.write_bits(u64::from(fract_part), fract_bits)?;
    }
    Ok(())
}

fn read_coord_mp(input: &mut BitReader<'_>, integral: bool, low_precision: bool) -> CodecResult<f32> {
    let (resolution, _, fract_bits) = mp_precision(low_precision);
    let in_bounds = input.read_bool()?;
    let int_bits = if in_bounds {
        COORD_INTEGER_BITS_MP
    } else {
        COORD_INTEGER_BITS
    };
    let has_int = input.read_bool()?;

    let (negative, value) = if integral {
        if !has_int {
            return Ok(0.0);
        }
        let negative = input.read_bool()?;
        (negative, (input.read_bits(int_bits)? + 1) as f32)
    } else {
        let negative = input.read_bool()?;
        let int_part = if has_int {
            input.read_bits(int_bits)? + 1
        } else {
            0
        };
        let fract_part = input.read_bits(fract_bits)?;
        (negative, int_part as f32 + fract_part as f32 * resolution)
    };
    Ok(if negative { -value } else { value })
}

fn mp_precision(low_precision: bool) -> (f32, f32, u8) {
    if low_precision {
        (
            COORD_RESOLUTION_LOWPRECISION,
            COORD_DENOMINATOR_LOWPRECISION,
            COORD_FRACTIONAL_BITS_MP_LOWPRECISION,
        )
    } else {
        (COORD_RESOLUTION, COORD_DENOMINATOR, COORD_FRACTIONAL_BITS)
    }
}

pub(crate) fn write_normal(out: &mut BitWriter, value: f32) -> CodecResult<()> {
    let negative = value <= -NORMAL_RESOLUTION;
    let fract_part = ((value * NORMAL_DENOMINATOR as f32).abs() as u32).min(NORMAL_DENOMINATOR);
    out.write_bool(negative);
    out.write_bits(u64::from(fract_part), NORMAL_FRACTIONAL_BITS)?;
    Ok(())
}

pub(crate) fn read_normal(input: &mut BitReader<'_>) -> CodecResult<f32> {
    let negative = input.read_bool()?;
    let fract_part = input.read_bits(NORMAL_FRACTIONAL_BITS)?;
    let value = fract_part as f32 * NORMAL_RESOLUTION;
    Ok(if negative { -value } else { value })
}
