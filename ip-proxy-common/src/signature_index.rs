mod load;
mod lookup;

pub use load::SignatureError;

use crate::Category;

/// Search used to resolve a key against a [`SignatureIndex`].
///
/// Both strategies return the same category for the same key; they only
/// differ in cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Halving search over the whole table, O(log n).
    Ordered,
    /// Scan from the start of the table, bounded by the first range past the key, O(n).
    Bounded,
}

/// A closed address range `[start, end]` mapped to a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureEntry<C> {
    pub start: u32,
    pub end: u32,
    pub category: C,
}

impl<C> SignatureEntry<C> {
    #[inline]
    fn contains(&self, key: u32) -> bool {
        self.start <= key && key <= self.end
    }
}

/// Immutable table of address ranges used for point lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureIndex<C> {
    // Sorted by `start`, non-overlapping, never holding `C::NONE`.
    entries: Box<[SignatureEntry<C>]>,
}

impl<C: Category> Default for SignatureIndex<C> {
    fn default() -> Self {
        Self {
            entries: Box::new([]),
        }
    }
}

impl<C: Category> SignatureIndex<C> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SignatureEntry<C>] {
        &self.entries
    }
}
