//! Configurable limits for bounded table-transfer decoding.

/// Wire-level limits for schema transfer decoding.
///
/// Enforced while decoding table sets received from a peer so a hostile or
/// corrupt message cannot force unbounded allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Limits {
    /// Maximum number of tables in one table set.
    pub max_tables: usize,

    /// Maximum number of properties in one table message.
    pub max_props_per_table: usize,

    /// Maximum length of a table or property name in bytes.
    pub max_name_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            // The table count field is 12 bits wide.
            max_tables: 4095,
            // The property count field is 10 bits wide.
            max_props_per_table: 1023,
            max_name_len: 256,
        }
    }
}

impl Limits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_tables: 32,
            max_props_per_table: 64,
            max_name_len: 32,
        }
    }

    /// Creates limits with no restrictions beyond the field widths.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_tables: usize::MAX,
            max_props_per_table: usize::MAX,
            max_name_len: usize::MAX,
        }
    }
}
