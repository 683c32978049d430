//! Evaluation of a chess position.

pub mod mobility;
pub mod pawn_structure;
pub mod pst;
pub mod rooks;
pub mod see;

use crate::constants::{
    BISHOP_PHASE_VAL, BISHOP_VALUE, KNIGHT_PHASE_VAL, KNIGHT_VALUE, PAWN_VALUE, QUEEN_PHASE_VAL,
    QUEEN_VALUE, ROOK_PHASE_VAL, ROOK_VALUE, TEMPO_BONUS, TOTAL_PHASE,
};
use crate::game::moves::{EncodedMove, MoveKind};
use crate::game::search::score::clamp_eval;
use serde::{Deserialize, Serialize};
use shakmaty::{Board, Chess, Color, Piece, Position, Role};

/// Material and PST score this far above beta is not worth the full evaluation.
const LAZY_MARGIN: i32 = 300;

/// Static evaluation as seen by the search. Scores are centipawns from the
/// side to move's perspective and stay out of the mate range.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, pos: &Chess) -> i32;

    /// Cheap variant for quiescence stand-pat: may return the material and
    /// PST score alone when it already clears `beta` comfortably.
    fn lazy_evaluate(&self, pos: &Chess, beta: i32) -> i32 {
        let _ = beta;
        self.evaluate(pos)
    }

    /// Positional contribution of `mv` for the side playing it: captured
    /// material, promotion gain and PST delta of the moving piece.
    fn move_estimate(&self, pos: &Chess, mv: EncodedMove) -> i32;
}

/// Relative weights (percent) of the positional terms.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalWeights {
    pub mobility: i32,
    pub pawn_structure: i32,
    pub rook_placement: i32,
    pub tempo: i32,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            mobility: 100,
            pawn_structure: 100,
            rook_placement: 100,
            tempo: TEMPO_BONUS,
        }
    }
}

/// Calculates the game phase.
///
/// The phase is a value between 0 and 256, where 256 means the game is in the
/// opening and 0 means the game is in the endgame.
pub fn game_phase(board: &Board) -> i32 {
    let phase = [
        (Role::Knight, KNIGHT_PHASE_VAL),
        (Role::Bishop, BISHOP_PHASE_VAL),
        (Role::Rook, ROOK_PHASE_VAL),
        (Role::Queen, QUEEN_PHASE_VAL),
    ]
    .into_iter()
    .map(|(role, value)| board.by_role(role).count() as i32 * value)
    .sum::<i32>()
    // Promotions can push past the starting total.
    .min(TOTAL_PHASE);
    (phase * 256 + (TOTAL_PHASE / 2)) / TOTAL_PHASE
}

pub fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => PAWN_VALUE,
        Role::Knight => KNIGHT_VALUE,
        Role::Bishop => BISHOP_VALUE,
        Role::Rook => ROOK_VALUE,
        Role::Queen => QUEEN_VALUE,
        Role::King => 0,
    }
}

/// Tapered material plus piece-square score, white minus black.
fn material_and_pst(board: &Board, phase: i32) -> i32 {
    let mut score = 0;
    for color in Color::ALL {
        let sign = if color == Color::White { 1 } else { -1 };
        for role in Role::ALL {
            let piece = Piece { role, color };
            for square in board.by_piece(piece) {
                score += sign * (piece_value(role) + pst::value(piece, square, phase));
            }
        }
    }
    score
}

fn perspective(pos: &Chess, white_score: i32) -> i32 {
    match pos.turn() {
        Color::White => white_score,
        Color::Black => -white_score,
    }
}

#[derive(Clone, Debug, Default)]
pub struct ClassicalEvaluator {
    weights: EvalWeights,
}

impl ClassicalEvaluator {
    pub fn new(weights: EvalWeights) -> Self {
        Self { weights }
    }

    fn positional(&self, board: &Board) -> i32 {
        let w = &self.weights;
        Color::ALL
            .into_iter()
            .map(|color| {
                let sign = if color == Color::White { 1 } else { -1 };
                let terms = mobility::evaluate(board, color) * w.mobility
                    + pawn_structure::evaluate(board, color) * w.pawn_structure
                    + rooks::evaluate(board, color) * w.rook_placement;
                sign * terms / 100
            })
            .sum()
    }
}

impl Evaluator for ClassicalEvaluator {
    fn evaluate(&self, pos: &Chess) -> i32 {
        let board = pos.board();
        let phase = game_phase(board);
        let white_score = material_and_pst(board, phase) + self.positional(board);
        clamp_eval(perspective(pos, white_score) + self.weights.tempo)
    }

    fn lazy_evaluate(&self, pos: &Chess, beta: i32) -> i32 {
        let board = pos.board();
        let phase = game_phase(board);
        let rough = perspective(pos, material_and_pst(board, phase)) + self.weights.tempo;
        if rough - LAZY_MARGIN >= beta {
            return clamp_eval(rough);
        }
        self.evaluate(pos)
    }

    fn move_estimate(&self, pos: &Chess, mv: EncodedMove) -> i32 {
        let Some(role) = mv.role() else {
            return 0;
        };
        let color = pos.turn();
        let phase = game_phase(pos.board());
        let piece = Piece { role, color };

        let captured = mv.captured().map_or(0, piece_value);
        let promotion = mv
            .promotion()
            .map_or(0, |promoted| piece_value(promoted) - piece_value(role));

        let pst_delta = match mv.kind() {
            // The encoded target of a castle is the rook; the king lands on the g or c file.
            MoveKind::Castle => 0,
            _ => {
                let landed = Piece {
                    role: mv.promotion().unwrap_or(role),
                    color,
                };
                pst::value(landed, mv.to_square(), phase)
                    - pst::value(piece, mv.from_square(), phase)
            }
        };

        captured + promotion + pst_delta
    }
}
