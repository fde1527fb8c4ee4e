use super::{SearchStrategy, SignatureIndex};
use crate::Category;

impl<C: Category> SignatureIndex<C> {
    /// Returns the category of the range holding `key`, or `C::NONE`.
    #[inline]
    pub fn classify(&self, key: u32, strategy: SearchStrategy) -> C {
        match strategy {
            SearchStrategy::Ordered => self.search_ordered(key),
            SearchStrategy::Bounded => self.search_bounded(key),
        }
    }

    pub fn search_ordered(&self, key: u32) -> C {
        // partition_point on `start <= key`, spelled out so the halving is visible
        let mut size = self.entries.len();
        let mut left = 0;
        let mut right = size;
        while left < right {
            let mid = left + size / 2;
            if self.entries[mid].start <= key {
                left = mid + 1;
            } else {
                right = mid;
            }
            size = right - left;
        }

        if left == 0 {
            return C::NONE;
        }
        let candidate = &self.entries[left - 1];
        if candidate.end >= key {
            candidate.category
        } else {
            C::NONE
        }
    }

    pub fn search_bounded(&self, key: u32) -> C {
        for entry in self.entries.iter() {
            // everything past this point starts above the key
            if entry.start > key {
                break;
            }
            if entry.contains(key) {
                return entry.category;
            }
        }

        C::NONE
    }
}
