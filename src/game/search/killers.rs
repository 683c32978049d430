// src/game/search/killers.rs

use crate::constants::MAX_PLY;
use crate::game::moves::EncodedMove;

/// Two quiet moves per ply that recently caused a beta cutoff.
#[derive(Clone)]
pub struct KillerTable {
    slots: Box<[[EncodedMove; 2]; MAX_PLY]>,
}

impl KillerTable {
    pub fn new() -> Self {
        Self {
            slots: Box::new([[EncodedMove::NONE; 2]; MAX_PLY]),
        }
    }

    pub fn store(&mut self, ply: usize, mv: EncodedMove) {
        let Some(slot) = self.slots.get_mut(ply) else {
            return;
        };
        if slot[0] != mv {
            slot[1] = slot[0];
            slot[0] = mv;
        }
    }

    pub fn get(&self, ply: usize) -> [EncodedMove; 2] {
        self.slots.get(ply).copied().unwrap_or([EncodedMove::NONE; 2])
    }
}

impl Default for KillerTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::{Board, GameBoard};

    #[test]
    fn newest_killer_comes_first() {
        let moves = GameBoard::default().legal_moves();
        let mut killers = KillerTable::new();
        killers.store(3, moves[0]);
        killers.store(3, moves[1]);
        assert_eq!(killers.get(3), [moves[1], moves[0]]);

        // Storing the current first killer again does not evict the second.
        killers.store(3, moves[1]);
        assert_eq!(killers.get(3), [moves[1], moves[0]]);

        killers.store(3, moves[2]);
        assert_eq!(killers.get(3), [moves[2], moves[1]]);
        assert!(!killers.get(4).contains(&moves[1]));
    }

    #[test]
    fn out_of_range_ply_is_ignored() {
        let moves = GameBoard::default().legal_moves();
        let mut killers = KillerTable::new();
        killers.store(MAX_PLY + 5, moves[0]);
        assert_eq!(killers.get(MAX_PLY + 5), [EncodedMove::NONE; 2]);
    }
}
