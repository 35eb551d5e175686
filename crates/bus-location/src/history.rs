//! Recent position trail shown to riders.

use std::collections::VecDeque;

use crate::models::{HistoryEntry, LocationRecord};

/// Most entries a trail holds.
pub const MAX_HISTORY: usize = 3;

/// Keeps a configured capacity within `1..=MAX_HISTORY`.
#[must_use]
pub const fn clamp_capacity(capacity: usize) -> usize {
    if capacity == 0 {
        1
    } else if capacity > MAX_HISTORY {
        MAX_HISTORY
    } else {
        capacity
    }
}

/// Bounded trail of the most recent distinct positions for the viewed bus.
///
/// An entry is appended only when it differs in latitude or longitude from the
/// previous one; once full, the oldest entry is dropped first.
#[derive(Clone, Debug)]
pub struct HistoryBuffer {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Creates an empty trail. `capacity` is clamped to `1..=MAX_HISTORY`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = clamp_capacity(capacity);
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    /// Appends the record's position unless it repeats the last entry. Returns
    /// whether the trail grew or shifted.
    pub fn push(&mut self, record: &LocationRecord) -> bool {
        let entry = HistoryEntry::from(record);
        if self.entries.back().is_some_and(|last| last.same_position(&entry)) {
            return false;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}
