// src/game/search/window.rs

//! Per-ply alpha/beta bookkeeping and transposition-hit classification.

use super::record::{Bound, TtRecord};
use crate::constants::{INFINITY, MAX_PLY};
use crate::game::moves::EncodedMove;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub alpha: i32,
    pub beta: i32,
}

impl Window {
    pub const FULL: Window = Window {
        alpha: -INFINITY,
        beta: INFINITY,
    };
}

/// What a transposition hit means for the node that probed it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TtVerdict {
    /// Deep enough and exact: the stored score is the node's value.
    Exact(i32),
    /// Deep enough and the stored bound already falls outside the window.
    Refutation(i32),
    /// Only good for ordering.
    Seed(EncodedMove),
    Miss,
}

pub struct WindowTracker {
    windows: [Window; MAX_PLY],
}

impl WindowTracker {
    pub fn new() -> Self {
        Self {
            windows: [Window::FULL; MAX_PLY],
        }
    }

    pub fn enter(&mut self, ply: usize, alpha: i32, beta: i32) {
        debug_assert!(alpha < beta, "empty window ({alpha}, {beta}) at ply {ply}");
        if let Some(window) = self.windows.get_mut(ply) {
            *window = Window { alpha, beta };
        }
    }

    pub fn raise_alpha(&mut self, ply: usize, score: i32) {
        if let Some(window) = self.windows.get_mut(ply) {
            window.alpha = window.alpha.max(score);
        }
    }

    pub fn current(&self, ply: usize) -> Window {
        self.windows.get(ply).copied().unwrap_or(Window::FULL)
    }

    /// `score` is the record's score already re-biased for this ply.
    pub fn judge(&self, ply: usize, record: TtRecord, score: i32, depth: i32) -> TtVerdict {
        let window = self.current(ply);
        if record.depth() as i32 >= depth {
            match record.bound() {
                Some(Bound::Exact) => return TtVerdict::Exact(score),
                Some(Bound::Lower) if score >= window.beta => return TtVerdict::Refutation(score),
                Some(Bound::Upper) if score <= window.alpha => return TtVerdict::Refutation(score),
                _ => {}
            }
        }
        match record.best_move().some() {
            Some(mv) => TtVerdict::Seed(mv),
            None => TtVerdict::Miss,
        }
    }
}

impl Default for WindowTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::{Board, GameBoard};

    #[test]
    fn bounds_only_cut_against_the_live_window() {
        let mv = GameBoard::default().legal_moves()[0];
        let mut tracker = WindowTracker::new();
        tracker.enter(2, -50, 50);

        let lower = TtRecord::new(1, mv, 80, 6, Bound::Lower, 0);
        assert_eq!(tracker.judge(2, lower, 80, 5), TtVerdict::Refutation(80));
        assert_eq!(tracker.judge(2, lower, 30, 5), TtVerdict::Seed(mv));

        let upper = TtRecord::new(1, mv, -60, 6, Bound::Upper, 0);
        assert_eq!(tracker.judge(2, upper, -60, 6), TtVerdict::Refutation(-60));
        tracker.raise_alpha(2, -70);
        assert_eq!(tracker.current(2).alpha, -50, "alpha never moves down");
    }

    #[test]
    fn shallow_records_only_seed() {
        let mv = GameBoard::default().legal_moves()[1];
        let mut tracker = WindowTracker::new();
        tracker.enter(0, -INFINITY, INFINITY);
        let exact = TtRecord::new(1, mv, 12, 3, Bound::Exact, 0);
        assert_eq!(tracker.judge(0, exact, 12, 3), TtVerdict::Exact(12));
        assert_eq!(tracker.judge(0, exact, 12, 4), TtVerdict::Seed(mv));

        let moveless = TtRecord::new(1, EncodedMove::NONE, 12, 1, Bound::Lower, 0);
        assert_eq!(tracker.judge(0, moveless, 12, 4), TtVerdict::Miss);
    }
}
