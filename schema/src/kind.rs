//! Property kinds.

use std::fmt;

/// The closed set of property kinds.
///
/// Discriminants are the transfer-format type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PropKind {
    Int = 0,
    Float = 1,
    Vector = 2,
    VectorXY = 3,
    String = 4,
    Array = 5,
    DataTable = 6,
    Int64 = 7,
}

impl PropKind {
    /// Every kind, in type-code order.
    pub const ALL: [Self; 8] = [
        Self::Int,
        Self::Float,
        Self::Vector,
        Self::VectorXY,
        Self::String,
        Self::Array,
        Self::DataTable,
        Self::Int64,
    ];

    /// Parses a transfer-format type code.
    #[must_use]
    pub fn from_raw(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// Returns the transfer-format type code.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Returns a short human-readable name.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Vector => "vector",
            Self::VectorXY => "vector_xy",
            Self::String => "string",
            Self::Array => "array",
            Self::DataTable => "data_table",
            Self::Int64 => "int64",
        }
    }

    /// Returns true for kinds that can appear as array elements.
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        !matches!(self, Self::Array | Self::DataTable)
    }
}

impl fmt::Display for PropKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}
