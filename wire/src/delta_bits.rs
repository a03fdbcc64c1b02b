//! Changed-property index framing.
//!
//! An entity stream is a sequence of `(index, payload)` pairs in strictly
//! increasing index order. Each index is written as the gap from the previous
//! one:
//!
//! ```text
//! 1 | class(2) | diff-1 in 4*(class+1) bits      (class 3 is read as 32 bits)
//! ...
//! 0                                              terminator
//! ```
//!
//! Gaps below 16 cost 7 bits in total, which is the reader's look-ahead width.

use bitstream::{BitReader, BitWriter};
use log::warn;
use schema::MAX_PROPERTIES;

use crate::error::{WireError, WireResult};

const LOOKAHEAD_BITS: usize = 7;
const CLASS_WIDTHS: [u8; 4] = [4, 8, 12, 32];

/// Writes property indices into an entity stream.
///
/// The terminator is written by [`finish`](Self::finish) or, if the writer is
/// dropped without finishing, on drop.
#[derive(Debug)]
pub struct DeltaBitsWriter<'a> {
    out: &'a mut BitWriter,
    last: i64,
    finished: bool,
}

impl<'a> DeltaBitsWriter<'a> {
    pub fn new(out: &'a mut BitWriter) -> Self {
        Self {
            out,
            last: -1,
            finished: false,
        }
    }

    /// Writes the next index. Payload bits follow through [`out`](Self::out).
    pub fn write_index(&mut self, index: usize) -> WireResult<()> {
        if index >= MAX_PROPERTIES {
            return Err(WireError::IndexOutOfRange {
                index,
                max: MAX_PROPERTIES,
            });
        }
        if (index as i64) <= self.last {
            return Err(WireError::IndexNotIncreasing {
                index,
                last: self.last,
            });
        }
        let gap = (index as i64 - self.last - 1) as u64;
        let class: u8 = if gap < 16 {
            0
        } else if gap < 256 {
            1
        } else {
            2
        };
        self.out.write_bool(true);
        self.out.write_bits(u64::from(class), 2)?;
        self.out.write_bits(gap, CLASS_WIDTHS[class as usize])?;
        self.last = index as i64;
        Ok(())
    }

    /// Last index written, if any.
    pub fn last_index(&self) -> Option<usize> {
        usize::try_from(self.last).ok()
    }

    /// The stream that payloads are written to.
    pub fn out(&mut self) -> &mut BitWriter {
        self.out
    }

    /// Writes the terminator.
    pub fn finish(mut self) {
        self.terminate();
    }

    fn terminate(&mut self) {
        if !self.finished {
            self.out.write_bool(false);
            self.finished = true;
        }
    }
}

impl Drop for DeltaBitsWriter<'_> {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Reads property indices from an entity stream.
///
/// A reader that is dropped before reaching the terminator is reported in
/// debug builds unless [`force_finished`](Self::force_finished) was called.
#[derive(Debug)]
pub struct DeltaBitsReader<'a, 'b> {
    input: &'a mut BitReader<'b>,
    last: i64,
    finished: bool,
}

impl<'a, 'b> DeltaBitsReader<'a, 'b> {
    pub fn new(input: &'a mut BitReader<'b>) -> Self {
        Self {
            input,
            last: -1,
            finished: false,
        }
    }

    /// Reads the next index, or `None` at the terminator.
    ///
    /// A set continuation bit with no room for a gap is a protocol violation:
    /// it latches the reader's overflow flag and ends the sequence.
    pub fn next_index(&mut self) -> WireResult<Option<usize>> {
        if self.finished {
            return Ok(None);
        }

        if self.input.bits_remaining() < LOOKAHEAD_BITS {
            if self.input.read_bool()? {
                self.input.force_overflow();
            }
            self.finished = true;
            return Ok(None);
        }

        let window = self.input.read_bits(LOOKAHEAD_BITS as u8)?;
        if window & 0x40 == 0 {
            self.input.seek_relative(-6)?;
            self.finished = true;
            return Ok(None);
        }

        let class = ((window >> 4) & 0x3) as usize;
        let gap = if class == 0 {
            window & 0xF
        } else {
            self.input.seek_relative(-4)?;
            self.input.read_bits(CLASS_WIDTHS[class])?
        };

        self.last += 1 + gap as i64;
        let index = self.last as usize;
        if index >= MAX_PROPERTIES {
            self.input.force_overflow();
            self.finished = true;
            return Err(WireError::IndexOutOfRange {
                index,
                max: MAX_PROPERTIES,
            });
        }
        Ok(Some(index))
    }

    /// Last index read, if any.
    pub fn last_index(&self) -> Option<usize> {
        usize::try_from(self.last).ok()
    }

    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Marks the sequence as intentionally abandoned before its terminator.
    pub fn force_finished(&mut self) {
        self.finished = true;
    }

    /// The stream that payloads are read from.
    pub fn input(&mut self) -> &mut BitReader<'b> {
        self.input
    }
}

impl Drop for DeltaBitsReader<'_, '_> {
    fn drop(&mut self) {
        if cfg!(debug_assertions) && !self.finished && !std::thread::panicking() {
            warn!(
                "delta index reader dropped at bit {} before its terminator",
                self.input.bits_read()
            );
        }
    }
}
