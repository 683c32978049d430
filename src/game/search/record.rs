// src/game/search/record.rs

//! Packed transposition record.
//!
//! One `u64` holds everything the search stores about a node:
//!
//! | bits    | width | field                                          |
//! |---------|-------|------------------------------------------------|
//! | 0..24   | 24    | best move (`EncodedMove`, 0 when unknown)      |
//! | 24..40  | 16    | score, two's complement, table-relative mates  |
//! | 40..48  | 8     | depth searched in plies                        |
//! | 48..50  | 2     | bound: 0 empty, 1 exact, 2 lower, 3 upper      |
//! | 50..56  | 6     | generation of the search that wrote it         |
//! | 56..64  | 8     | validation tag, the top byte of the hash       |
//!
//! A live record always has a non-zero bound, so the all-zero word is the
//! empty slot.

use crate::game::moves::EncodedMove;

const MOVE_BITS: u32 = 24;
const MOVE_MASK: u64 = (1 << MOVE_BITS) - 1;

const SCORE_SHIFT: u32 = 24;
const SCORE_MASK: u64 = 0xffff;

const DEPTH_SHIFT: u32 = 40;
const DEPTH_MASK: u64 = 0xff;

const BOUND_SHIFT: u32 = 48;
const BOUND_MASK: u64 = 0x3;

const GENERATION_SHIFT: u32 = 50;
pub const GENERATION_MASK: u8 = 0x3f;

const TAG_SHIFT: u32 = 56;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

impl Bound {
    fn bits(self) -> u64 {
        match self {
            Bound::Exact => 1,
            Bound::Lower => 2,
            Bound::Upper => 3,
        }
    }

    fn from_bits(bits: u64) -> Option<Bound> {
        match bits {
            1 => Some(Bound::Exact),
            2 => Some(Bound::Lower),
            3 => Some(Bound::Upper),
            _ => None,
        }
    }
}

pub fn tag_of(hash: u64) -> u8 {
    (hash >> TAG_SHIFT) as u8
}

#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct TtRecord(u64);

impl TtRecord {
    pub const EMPTY: TtRecord = TtRecord(0);

    /// Scores must already fit in 16 bits; the search keeps every score
    /// inside +-`INFINITY`, which does.
    pub fn new(
        hash: u64,
        best_move: EncodedMove,
        score: i32,
        depth: u8,
        bound: Bound,
        generation: u8,
    ) -> Self {
        debug_assert!(i16::try_from(score).is_ok(), "score {score} does not fit");
        let score = score as i16 as u16 as u64;
        TtRecord(
            (best_move.bits() as u64 & MOVE_MASK)
                | score << SCORE_SHIFT
                | (depth as u64) << DEPTH_SHIFT
                | bound.bits() << BOUND_SHIFT
                | ((generation & GENERATION_MASK) as u64) << GENERATION_SHIFT
                | (tag_of(hash) as u64) << TAG_SHIFT,
        )
    }

    pub fn from_raw(raw: u64) -> Self {
        TtRecord(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.bound().is_none()
    }

    pub fn best_move(self) -> EncodedMove {
        EncodedMove::from_bits((self.0 & MOVE_MASK) as u32)
    }

    pub fn score(self) -> i32 {
        ((self.0 >> SCORE_SHIFT) & SCORE_MASK) as u16 as i16 as i32
    }

    pub fn depth(self) -> u8 {
        ((self.0 >> DEPTH_SHIFT) & DEPTH_MASK) as u8
    }

    pub fn bound(self) -> Option<Bound> {
        Bound::from_bits((self.0 >> BOUND_SHIFT) & BOUND_MASK)
    }

    pub fn generation(self) -> u8 {
        (self.0 >> GENERATION_SHIFT) as u8 & GENERATION_MASK
    }

    pub fn tag(self) -> u8 {
        (self.0 >> TAG_SHIFT) as u8
    }

    pub fn with_best_move(self, best_move: EncodedMove) -> Self {
        TtRecord((self.0 & !MOVE_MASK) | (best_move.bits() as u64 & MOVE_MASK))
    }
}

impl std::fmt::Debug for TtRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtRecord")
            .field("best_move", &self.best_move())
            .field("score", &self.score())
            .field("depth", &self.depth())
            .field("bound", &self.bound())
            .field("generation", &self.generation())
            .field("tag", &self.tag())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{INFINITY, MATE_SCORE};
    use crate::game::board::{Board, GameBoard};

    #[test]
    fn fields_do_not_bleed_into_each_other() {
        let mv = GameBoard::default().legal_moves()[5];
        let hash = 0xabcd_0123_4567_89ef;
        for score in [-INFINITY, -MATE_SCORE + 3, -1, 0, 1, 731, INFINITY] {
            for (depth, bound) in [(0, Bound::Upper), (17, Bound::Exact), (255, Bound::Lower)] {
                let record = TtRecord::new(hash, mv, score, depth, bound, 63);
                assert_eq!(record.best_move(), mv);
                assert_eq!(record.score(), score);
                assert_eq!(record.depth(), depth);
                assert_eq!(record.bound(), Some(bound));
                assert_eq!(record.generation(), 63);
                assert_eq!(record.tag(), 0xab);
                assert!(!record.is_empty());
            }
        }
    }

    #[test]
    fn with_best_move_touches_only_the_move() {
        let record = TtRecord::new(7, EncodedMove::NONE, -42, 3, Bound::Lower, 5);
        let mv = GameBoard::default().legal_moves()[0];
        let hinted = record.with_best_move(mv);
        assert_eq!(hinted.best_move(), mv);
        assert_eq!(hinted.score(), -42);
        assert_eq!(hinted.depth(), 3);
        assert_eq!(hinted.bound(), Some(Bound::Lower));
        assert_eq!(hinted.generation(), 5);
        assert_eq!(hinted.tag(), record.tag());
    }

    #[test]
    fn empty_record() {
        assert!(TtRecord::EMPTY.is_empty());
        assert!(TtRecord::EMPTY.best_move().is_none());
    }
}
