// src/game/evaluation/mobility.rs

use crate::constants::{
    BISHOP_MOBILITY_BONUS, KNIGHT_MOBILITY_BONUS, QUEEN_MOBILITY_BONUS, ROOK_MOBILITY_BONUS,
};
use shakmaty::{attacks, Bitboard, Board, Color, Piece, Role};

/// Squares attacked by `color`'s pawns.
fn pawn_attacks(board: &Board, color: Color) -> Bitboard {
    let mut attacked = Bitboard::EMPTY;
    for square in board.by_piece(Piece { role: Role::Pawn, color }) {
        attacked |= attacks::pawn_attacks(color, square);
    }
    attacked
}

/// Reachable squares for minor and major pieces, not counting squares held
/// by friendly pieces or covered by enemy pawns.
pub fn evaluate(board: &Board, color: Color) -> i32 {
    let occupied = board.occupied();
    let unsafe_squares = board.by_color(color) | pawn_attacks(board, !color);

    [
        (Role::Knight, KNIGHT_MOBILITY_BONUS),
        (Role::Bishop, BISHOP_MOBILITY_BONUS),
        (Role::Rook, ROOK_MOBILITY_BONUS),
        (Role::Queen, QUEEN_MOBILITY_BONUS),
    ]
    .into_iter()
    .map(|(role, bonus)| {
        let piece = Piece { role, color };
        board
            .by_piece(piece)
            .into_iter()
            .map(|square| (attacks::attacks(square, piece, occupied) & !unsafe_squares).count() as i32)
            .sum::<i32>()
            * bonus
    })
    .sum()
}
