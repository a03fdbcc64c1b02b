//! Configurable limits for entity stream decoding.

use schema::{DEFAULT_STRING_BUFFER, MAX_PROPERTIES};

/// Codec-level limits for decoding entity streams.
///
/// Enforced during decoding so corrupt or hostile streams cannot index past
/// the flat table or grow strings without bound.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodecLimits {
    /// Maximum number of flat properties a bound decoder may have.
    pub max_properties: usize,

    /// Maximum decoded string size in bytes, terminator included.
    pub max_string_bytes: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_properties: MAX_PROPERTIES,
            max_string_bytes: DEFAULT_STRING_BUFFER,
        }
    }
}

impl CodecLimits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_properties: 64,
            max_string_bytes: 64,
        }
    }

    /// Creates limits with no restrictions beyond the index space.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_properties: MAX_PROPERTIES,
            max_string_bytes: usize::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_reasonable() {
        let limits = CodecLimits::default();
        assert_eq!(limits.max_properties, 4096);
        assert_eq!(limits.max_string_bytes, 512);
    }

    #[test]
    fn testing_limits_smaller() {
        let test_limits = CodecLimits::for_testing();
        let default_limits = CodecLimits::default();

        assert!(test_limits.max_properties < default_limits.max_properties);
        assert!(test_limits.max_string_bytes < default_limits.max_string_bytes);
    }

    #[test]
    fn unlimited_keeps_index_space() {
        let limits = CodecLimits::unlimited();
        assert_eq!(limits.max_properties, MAX_PROPERTIES);
        assert_eq!(limits.max_string_bytes, usize::MAX);
    }

    #[test]
    fn limits_clone_eq() {
        let limits = CodecLimits::for_testing();
        assert_eq!(limits.clone(), limits);
    }
}
