//! Property flags.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Number of flag bits transmitted by the legacy protocol.
pub const LEGACY_FLAG_BITS: u8 = 11;
/// Number of flag bits transmitted by the current protocol.
pub const FLAG_BITS: u8 = 17;

/// Bit set of per-property encoding and flattening flags.
///
/// Bit positions are part of the schema transfer format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropFlags(u32);

impl PropFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Integer is unsigned.
    pub const UNSIGNED: Self = Self(1 << 0);
    /// Float uses the bit-coordinate encoding.
    pub const COORD: Self = Self(1 << 1);
    /// Float is sent as raw IEEE-754 bits.
    pub const NOSCALE: Self = Self(1 << 2);
    /// Quantized float range is pulled down one step so `high` is never exceeded.
    pub const ROUNDDOWN: Self = Self(1 << 3);
    /// Quantized float range is pushed up one step so `low` is never undershot.
    pub const ROUNDUP: Self = Self(1 << 4);
    /// Float is a unit normal component.
    pub const NORMAL: Self = Self(1 << 5);
    /// Property names another table's property to suppress during flattening.
    pub const EXCLUDE: Self = Self(1 << 6);
    /// Vector carries an extra element (reserved).
    pub const XYZE: Self = Self(1 << 7);
    /// Property is the element template of the following array.
    pub const INSIDE_ARRAY: Self = Self(1 << 8);
    /// Nested table is visible to every observer; no proxy slot is allocated.
    pub const PROXY_ALWAYS_YES: Self = Self(1 << 9);
    /// Property was generated from one axis of a vector (informational).
    pub const IS_A_VECTOR_ELEM: Self = Self(1 << 10);
    /// Nested table is inlined into its parent node during flattening.
    pub const COLLAPSIBLE: Self = Self(1 << 11);
    /// Property changes often (informational).
    pub const CHANGES_OFTEN: Self = Self(1 << 12);
    /// Float uses the compact multiplayer coordinate encoding.
    pub const COORD_MP: Self = Self(1 << 13);
    /// Multiplayer coordinate with a 3-bit fraction.
    pub const COORD_MP_LOWPRECISION: Self = Self(1 << 14);
    /// Multiplayer coordinate with no fraction.
    pub const COORD_MP_INTEGRAL: Self = Self(1 << 15);
    /// Integer uses a variable-length encoding.
    pub const VARINT: Self = Self(1 << 16);

    /// Creates flags from raw bits.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns true if every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if any flag in `other` is set.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns `self` with `other` set.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `self` with `other` cleared.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Returns the flags that survive a transfer using `bits` flag bits.
    #[must_use]
    pub const fn truncated(self, bits: u8) -> Self {
        if bits >= 32 {
            self
        } else {
            Self(self.0 & ((1 << bits) - 1))
        }
    }

    /// Returns true if the float uses one of the special (non-range) encodings.
    #[must_use]
    pub const fn is_special_float(self) -> bool {
        self.intersects(Self(
            Self::COORD.0 | Self::COORD_MP.0 | Self::COORD_MP_LOWPRECISION.0
                | Self::COORD_MP_INTEGRAL.0 | Self::NOSCALE.0 | Self::NORMAL.0,
        ))
    }
}

impl BitOr for PropFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

impl BitOrAssign for PropFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.with(rhs);
    }
}

impl fmt::Display for PropFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 17] = [
            "UNSIGNED",
            "COORD",
            "NOSCALE",
            "ROUNDDOWN",
            "ROUNDUP",
            "NORMAL",
            "EXCLUDE",
            "XYZE",
            "INSIDE_ARRAY",
            "PROXY_ALWAYS_YES",
            "IS_A_VECTOR_ELEM",
            "COLLAPSIBLE",
            "CHANGES_OFTEN",
            "COORD_MP",
            "COORD_MP_LOWPRECISION",
            "COORD_MP_INTEGRAL",
            "VARINT",
        ];
        let mut first = true;
        for (bit, name) in NAMES.iter().enumerate() {
            if self.0 & (1 << bit) != 0 {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("NONE")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_positions_are_stable() {
        assert_eq!(PropFlags::UNSIGNED.raw(), 1);
        assert_eq!(PropFlags::INSIDE_ARRAY.raw(), 1 << 8);
        assert_eq!(PropFlags::IS_A_VECTOR_ELEM.raw(), 1 << (LEGACY_FLAG_BITS - 1));
        assert_eq!(PropFlags::VARINT.raw(), 1 << (FLAG_BITS - 1));
    }

    #[test]
    fn contains_and_union() {
        let flags = PropFlags::UNSIGNED | PropFlags::VARINT;
        assert!(flags.contains(PropFlags::UNSIGNED));
        assert!(flags.contains(PropFlags::VARINT));
        assert!(!flags.contains(PropFlags::COORD));
        assert!(!flags.without(PropFlags::VARINT).contains(PropFlags::VARINT));
    }

    #[test]
    fn legacy_truncation_drops_wide_flags() {
        let flags = PropFlags::UNSIGNED | PropFlags::COLLAPSIBLE | PropFlags::VARINT;
        assert_eq!(flags.truncated(LEGACY_FLAG_BITS), PropFlags::UNSIGNED);
        assert_eq!(flags.truncated(FLAG_BITS), flags);
    }

    #[test]
    fn special_float_detection() {
        assert!(PropFlags::COORD.is_special_float());
        assert!(PropFlags::NORMAL.is_special_float());
        assert!(!PropFlags::ROUNDUP.is_special_float());
    }

    #[test]
    fn display_lists_names() {
        assert_eq!(PropFlags::NONE.to_string(), "NONE");
        assert_eq!(
            (PropFlags::UNSIGNED | PropFlags::VARINT).to_string(),
            "UNSIGNED|VARINT"
        );
    }
}
