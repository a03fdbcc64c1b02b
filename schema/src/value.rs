//! Property values.

use crate::PropKind;

/// A single decoded or accessor-produced property value.
///
/// Arrays are carried element by element, so there is no array variant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropValue {
    Int(i32),
    Float(f32),
    Vector([f32; 3]),
    VectorXY([f32; 2]),
    String(String),
    Int64(i64),
}

impl PropValue {
    /// Returns the kind this value belongs to.
    #[must_use]
    pub const fn kind(&self) -> PropKind {
        match self {
            Self::Int(_) => PropKind::Int,
            Self::Float(_) => PropKind::Float,
            Self::Vector(_) => PropKind::Vector,
            Self::VectorXY(_) => PropKind::VectorXY,
            Self::String(_) => PropKind::String,
            Self::Int64(_) => PropKind::Int64,
        }
    }

    /// Returns the canonical default for a scalar kind.
    #[must_use]
    pub const fn zero(kind: PropKind) -> Option<Self> {
        match kind {
            PropKind::Int => Some(Self::Int(0)),
            PropKind::Float => Some(Self::Float(0.0)),
            PropKind::Vector => Some(Self::Vector([0.0; 3])),
            PropKind::VectorXY => Some(Self::VectorXY([0.0; 2])),
            PropKind::String => Some(Self::String(String::new())),
            PropKind::Int64 => Some(Self::Int64(0)),
            PropKind::Array | PropKind::DataTable => None,
        }
    }

    /// Returns true if the value equals its kind's canonical default.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Int(v) => *v == 0,
            Self::Float(v) => *v == 0.0,
            Self::Vector(v) => v.iter().all(|c| *c == 0.0),
            Self::VectorXY(v) => v.iter().all(|c| *c == 0.0),
            Self::String(v) => v.is_empty(),
            Self::Int64(v) => *v == 0,
        }
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for PropValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<[f32; 3]> for PropValue {
    fn from(value: [f32; 3]) -> Self {
        Self::Vector(value)
    }
}

impl From<[f32; 2]> for PropValue {
    fn from(value: [f32; 2]) -> Self {
        Self::VectorXY(value)
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}
