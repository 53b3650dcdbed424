//! Free-List Allocator
//!
//! Tracks reusable byte ranges inside the container as two positionally
//! paired sequences: `offsets[i]` starts a free range of `lengths[i]` bytes.

use serde::{Deserialize, Serialize};

use crate::record::RECORD_HEADER_SIZE;

/// Free ranges in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeList {
    offsets: Vec<u32>,
    lengths: Vec<u32>,
}

impl FreeList {
    /// Create an empty free list
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out space for a record with a `payload_size` byte payload
    ///
    /// First-fit over `payload_size + 4` bytes, in registration order. An exact
    /// fit removes the range; a larger range gives up its low bytes and keeps
    /// the remainder. Returns `None` when nothing is large enough.
    pub fn allocate(&mut self, payload_size: u32) -> Option<u32> {
        let need = payload_size.checked_add(RECORD_HEADER_SIZE)?;
        let index = self.lengths.iter().position(|&len| len >= need)?;
        let offset = self.offsets[index];

        if self.lengths[index] > need {
            self.offsets[index] += need;
            self.lengths[index] -= need;
        } else {
            self.offsets.remove(index);
            self.lengths.remove(index);
        }

        Some(offset)
    }

    /// Record `[offset, offset + length)` as free
    ///
    /// Merges only with a range that starts exactly where this one ends.
    /// A range that begins where an existing range ends is kept as a separate
    /// entry.
    pub fn register(&mut self, offset: u32, length: u32) {
        if length == 0 {
            return;
        }

        let end = offset + length;
        match self.offsets.iter().position(|&start| start == end) {
            Some(index) => {
                self.offsets[index] = offset;
                self.lengths[index] += length;
            }
            None => {
                self.offsets.push(offset);
                self.lengths.push(length);
            }
        }
    }

    /// Number of free ranges
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// (offset, length) pairs in registration order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.offsets.iter().copied().zip(self.lengths.iter().copied())
    }

    /// Sum of all free range lengths
    pub fn total_free(&self) -> u64 {
        self.lengths.iter().map(|&len| len as u64).sum()
    }

    /// Both sequences have the same length
    pub(crate) fn is_paired(&self) -> bool {
        self.offsets.len() == self.lengths.len()
    }
}
