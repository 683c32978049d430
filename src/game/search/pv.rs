// src/game/search/pv.rs

//! Triangular principal-variation table.
//!
//! Row `ply` holds the best line found from that ply; a row is only valid up
//! to its recorded length and is reset whenever the node at that ply is entered.

use crate::constants::MAX_PLY;
use crate::game::moves::EncodedMove;

pub struct PvTable {
    lines: Vec<[EncodedMove; MAX_PLY]>,
    lengths: [usize; MAX_PLY],
}

impl PvTable {
    pub fn new() -> Self {
        Self {
            lines: vec![[EncodedMove::NONE; MAX_PLY]; MAX_PLY],
            lengths: [0; MAX_PLY],
        }
    }

    pub fn clear_ply(&mut self, ply: usize) {
        if ply < MAX_PLY {
            self.lengths[ply] = 0;
        }
    }

    /// `mv` is the new best move at `ply`; the line continues with the child's row.
    pub fn update(&mut self, ply: usize, mv: EncodedMove) {
        if ply >= MAX_PLY {
            return;
        }
        let child_len = if ply + 1 < MAX_PLY { self.lengths[ply + 1] } else { 0 };
        let len = (child_len + 1).min(MAX_PLY - ply);

        let (head, tail) = self.lines.split_at_mut(ply + 1);
        let line = &mut head[ply];
        line[0] = mv;
        if len > 1 {
            line[1..len].copy_from_slice(&tail[0][..len - 1]);
        }
        self.lengths[ply] = len;
    }

    pub fn line(&self, ply: usize) -> &[EncodedMove] {
        if ply >= MAX_PLY {
            return &[];
        }
        &self.lines[ply][..self.lengths[ply]]
    }
}

impl Default for PvTable {
    fn default() -> Self {
        Self::new()
    }
}
