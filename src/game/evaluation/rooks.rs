//! Evaluation terms for rooks.

use crate::constants::{ROOK_OPEN_FILE_BONUS, ROOK_SEMI_OPEN_FILE_BONUS, SEVENTH_RANK_BONUS};
use shakmaty::{Bitboard, Board, Color, Piece, Rank, Role};

/// Open and semi-open files plus the seventh rank.
pub fn evaluate(board: &Board, color: Color) -> i32 {
    let friendly_pawns = board.by_piece(Piece { role: Role::Pawn, color });
    let enemy_pawns = board.by_piece(Piece { role: Role::Pawn, color: !color });
    let seventh = match color {
        Color::White => Rank::Seventh,
        Color::Black => Rank::Second,
    };

    board
        .by_piece(Piece { role: Role::Rook, color })
        .into_iter()
        .map(|square| {
            let file = Bitboard::from_file(square.file());
            let file_bonus = match (
                (friendly_pawns & file).is_empty(),
                (enemy_pawns & file).is_empty(),
            ) {
                (true, true) => ROOK_OPEN_FILE_BONUS,
                (true, false) => ROOK_SEMI_OPEN_FILE_BONUS,
                _ => 0,
            };
            let rank_bonus = if square.rank() == seventh { SEVENTH_RANK_BONUS } else { 0 };
            file_bonus + rank_bonus
        })
        .sum()
}
