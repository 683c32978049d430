// src/game/repetition.rs

//! Repetition tracking for draw claims.
//!
//! The tracker persists for the whole game and is updated by every performed
//! move, both the ones actually played and the ones tried inside the search,
//! so it always reflects the path from the game start to the current node.

use std::collections::HashMap;

/// Occurrences of the same position needed to claim a draw.
pub const REPETITION_LIMIT: u8 = 3;

#[derive(Clone, Debug, Default)]
pub struct RepetitionTracker {
    counts: HashMap<u64, u8>,
}

impl RepetitionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one more occurrence of `hash` and returns the new count.
    pub fn record(&mut self, hash: u64) -> u8 {
        let count = self.counts.entry(hash).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Removes one occurrence of `hash`, the inverse of `record`.
    pub fn forget(&mut self, hash: u64) {
        if let Some(count) = self.counts.get_mut(&hash) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&hash);
            }
        }
    }

    pub fn count(&self, hash: u64) -> u8 {
        self.counts.get(&hash).copied().unwrap_or(0)
    }

    pub fn is_draw_claimable(&self, hash: u64) -> bool {
        self.count(hash) >= REPETITION_LIMIT
    }

    /// Number of distinct positions seen.
    pub fn len(&self) -> usize {
        self.counts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn third_occurrence_is_claimable() {
        let mut tracker = RepetitionTracker::new();
        assert_eq!(tracker.record(42), 1);
        assert!(!tracker.is_draw_claimable(42));
        tracker.record(42);
        assert!(!tracker.is_draw_claimable(42));
        tracker.record(42);
        assert!(tracker.is_draw_claimable(42));
        assert!(!tracker.is_draw_claimable(7));
    }

    #[test]
    fn forget_undoes_record() {
        let mut tracker = RepetitionTracker::new();
        tracker.record(1);
        tracker.record(1);
        tracker.record(2);
        tracker.forget(1);
        assert_eq!(tracker.count(1), 1);
        tracker.forget(1);
        assert_eq!(tracker.count(1), 0);
        assert_eq!(tracker.len(), 1);

        // Forgetting an unknown hash is a no-op.
        tracker.forget(99);
        assert_eq!(tracker.len(), 1);
    }
}
