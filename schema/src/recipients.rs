//! Observer sets produced by nested-table visibility proxies.

/// Maximum number of distinct observers a [`Recipients`] set can address.
pub const MAX_RECIPIENTS: usize = 256;

const WORDS: usize = MAX_RECIPIENTS / 64;

/// A fixed-capacity set of observer slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Recipients {
    bits: [u64; WORDS],
}

impl Recipients {
    /// A set containing every observer.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            bits: [u64::MAX; WORDS],
        }
    }

    /// An empty set.
    #[must_use]
    pub const fn none() -> Self {
        Self { bits: [0; WORDS] }
    }

    /// Adds `client`. Out-of-range slots are ignored.
    pub fn insert(&mut self, client: usize) {
        if client < MAX_RECIPIENTS {
            self.bits[client / 64] |= 1 << (client % 64);
        }
    }

    /// Removes `client`.
    pub fn remove(&mut self, client: usize) {
        if client < MAX_RECIPIENTS {
            self.bits[client / 64] &= !(1 << (client % 64));
        }
    }

    /// Restricts the set to exactly `client`.
    pub fn only(&mut self, client: usize) {
        *self = Self::none();
        self.insert(client);
    }

    /// Returns true if `client` is in the set.
    #[must_use]
    pub const fn contains(&self, client: usize) -> bool {
        client < MAX_RECIPIENTS && self.bits[client / 64] & (1 << (client % 64)) != 0
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|word| *word == 0)
    }
}

impl Default for Recipients {
    fn default() -> Self {
        Self::all()
    }
}
