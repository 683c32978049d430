// src/game/search/ordering.rs

//! Move ordering: hint move, good captures by MVV-LVA, killers, then
//! everything else by the evaluator's per-move estimate.

use crate::game::evaluation::{piece_value, see::see, Evaluator};
use crate::game::moves::{EncodedMove, MoveKind};
use shakmaty::{Chess, Position, Role};
use std::cmp::Reverse;

const HINT_SCORE: i32 = 3_000_000;
const GOOD_CAPTURE_SCORE: i32 = 2_000_000;
const KILLER_SCORE: i32 = 1_000_000;

/// Most valuable victim, least valuable attacker. Promotions count the
/// promoted piece as part of the victim.
pub fn mvv_lva(mv: EncodedMove) -> i32 {
    let victim = mv.captured().map_or(0, piece_value)
        + mv.promotion().map_or(0, |role| piece_value(role) - piece_value(Role::Pawn));
    let attacker = mv.role().map_or(0, |role| match role {
        Role::King => 1000,
        _ => piece_value(role),
    });
    victim * 10 - attacker / 10
}

/// Captures that do not lose material by static exchange. En passant and
/// promotions are always treated as good.
pub fn is_good_capture(pos: &Chess, mv: EncodedMove) -> bool {
    if mv.is_promotion() || mv.kind() == MoveKind::EnPassant {
        return true;
    }
    see(pos.board(), mv.from_square(), mv.to_square()) >= 0
}

fn score_move<E: Evaluator + ?Sized>(
    mv: EncodedMove,
    pos: &Chess,
    hint: EncodedMove,
    killers: [EncodedMove; 2],
    evaluator: &E,
) -> i32 {
    if !hint.is_none() && mv == hint {
        return HINT_SCORE;
    }
    if !mv.is_quiet() && is_good_capture(pos, mv) {
        return GOOD_CAPTURE_SCORE + mvv_lva(mv);
    }
    if let Some(slot) = killers.iter().position(|&k| !k.is_none() && k == mv) {
        return KILLER_SCORE - slot as i32;
    }
    evaluator.move_estimate(pos, mv)
}

pub fn order_moves<E: Evaluator + ?Sized>(
    moves: &mut [EncodedMove],
    pos: &Chess,
    hint: EncodedMove,
    killers: [EncodedMove; 2],
    evaluator: &E,
) {
    moves.sort_by_cached_key(|&mv| Reverse(score_move(mv, pos, hint, killers, evaluator)));
}

/// Quiescence ordering: tactical moves by MVV-LVA, anything else after them.
pub fn order_captures(moves: &mut [EncodedMove]) {
    moves.sort_by_cached_key(|&mv| {
        Reverse(if mv.is_quiet() { i32::MIN } else { mvv_lva(mv) })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::{Board, GameBoard};
    use crate::game::evaluation::ClassicalEvaluator;
    use shakmaty::{fen::Fen, CastlingMode};

    fn board(fen: &str) -> GameBoard {
        let fen: Fen = fen.parse().unwrap();
        GameBoard::new(fen.into_position(CastlingMode::Standard).unwrap())
    }

    fn find(moves: &[EncodedMove], uci: &str) -> EncodedMove {
        *moves.iter().find(|m| m.to_uci() == uci).unwrap()
    }

    #[test]
    fn hint_then_captures_then_killers() {
        // The pawn trade on d5 is even; the queen taking there loses itself.
        let board = board("4k3/8/2p5/3p4/2q1P3/8/8/3QK3 w - - 0 1");
        let mut moves = board.legal_moves();
        let hint = find(&moves, "d1d3");
        let killer = find(&moves, "e1f2");
        let eval = ClassicalEvaluator::default();

        order_moves(&mut moves, board.position(), hint, [killer, EncodedMove::NONE], &eval);

        assert_eq!(moves[0], hint);
        assert_eq!(moves[1].to_uci(), "e4d5");
        assert_eq!(moves[2], killer);
        let losing = moves.iter().position(|m| m.to_uci() == "d1d5");
        assert!(losing > Some(2));
    }

    #[test]
    fn mvv_lva_prefers_cheap_attackers_for_big_victims() {
        let board = board("4k3/8/8/3q4/2P5/4N3/8/4K3 w - - 0 1");
        let mut moves = board.legal_moves();
        order_captures(&mut moves);
        assert_eq!(moves[0].to_uci(), "c4d5");
        assert_eq!(moves[1].to_uci(), "e3d5");
        assert!(moves[2..].iter().all(|m| m.is_quiet()));
    }
}
