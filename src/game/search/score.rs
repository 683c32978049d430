// src/game/search/score.rs

//! Score helpers. Mate scores count down by one per ply from `MATE_SCORE`, so
//! a shorter mate always compares better than a longer one.

use crate::constants::{MATE_BOUND, MATE_SCORE};

/// Score for the side to move when it delivers mate `ply` plies from the root.
pub fn mate_in(ply: usize) -> i32 {
    MATE_SCORE - ply as i32
}

/// Score for the side to move when it is mated `ply` plies from the root.
pub fn mated_in(ply: usize) -> i32 {
    -mate_in(ply)
}

pub fn is_mate_score(score: i32) -> bool {
    score.abs() >= MATE_BOUND
}

/// Signed distance to mate in plies: positive when the side to move mates,
/// negative when it gets mated, `None` for ordinary scores.
pub fn mate_distance(score: i32) -> Option<i32> {
    if score >= MATE_BOUND {
        Some(MATE_SCORE - score)
    } else if score <= -MATE_BOUND {
        Some(-(MATE_SCORE + score))
    } else {
        None
    }
}

/// Mate scores leave the table relative to the node that stored them.
pub fn to_tt(score: i32, ply: usize) -> i32 {
    if score >= MATE_BOUND {
        score + ply as i32
    } else if score <= -MATE_BOUND {
        score - ply as i32
    } else {
        score
    }
}

/// Inverse of [`to_tt`] for the probing node's ply.
pub fn from_tt(score: i32, ply: usize) -> i32 {
    if score >= MATE_BOUND {
        score - ply as i32
    } else if score <= -MATE_BOUND {
        score + ply as i32
    } else {
        score
    }
}

/// Clamps a static evaluation out of the mate range.
pub fn clamp_eval(score: i32) -> i32 {
    score.clamp(-MATE_BOUND + 1, MATE_BOUND - 1)
}

/// UCI rendering: `cp <n>` or `mate <moves>`.
pub fn uci_score(score: i32) -> String {
    match mate_distance(score) {
        Some(plies) if plies > 0 => format!("mate {}", (plies + 1) / 2),
        Some(plies) => format!("mate -{}", (-plies + 1) / 2),
        None => format!("cp {score}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorter_mates_score_higher() {
        assert!(mate_in(1) > mate_in(3));
        assert!(mated_in(3) > mated_in(1));
        assert_eq!(mate_distance(mate_in(3)), Some(3));
        assert_eq!(mate_distance(mated_in(2)), Some(-2));
        assert_eq!(mate_distance(150), None);
    }

    #[test]
    fn tt_adjustment_is_relative_to_the_node() {
        // Mate found 5 plies from the root, stored at ply 2: 3 plies from the node.
        let stored = to_tt(mate_in(5), 2);
        assert_eq!(mate_distance(stored), Some(3));
        // Probed again from ply 4 the mate is 7 plies from the root.
        assert_eq!(from_tt(stored, 4), mate_in(7));
        assert_eq!(from_tt(to_tt(-250, 9), 1), -250);
    }

    #[test]
    fn uci_rendering() {
        assert_eq!(uci_score(mate_in(1)), "mate 1");
        assert_eq!(uci_score(mate_in(3)), "mate 2");
        assert_eq!(uci_score(mated_in(2)), "mate -1");
        assert_eq!(uci_score(-35), "cp -35");
        assert!(!is_mate_score(clamp_eval(1_000_000)));
    }
}
