// src/game/evaluation/pawn_structure.rs

use crate::constants::{DOUBLED_PAWN_PENALTY, ISOLATED_PAWN_PENALTY, PASSED_PAWN_BONUS};
use shakmaty::{Bitboard, Board, Color, File, Piece, Role, Square};

pub fn evaluate(board: &Board, color: Color) -> i32 {
    let our_pawns = board.by_piece(Piece { role: Role::Pawn, color });
    let their_pawns = board.by_piece(Piece { role: Role::Pawn, color: !color });

    PASSED_PAWN_BONUS * count_passed_pawns(color, our_pawns, their_pawns)
        - DOUBLED_PAWN_PENALTY * count_doubled_pawns(our_pawns)
        - ISOLATED_PAWN_PENALTY * count_isolated_pawns(our_pawns)
}

/// The file of `square` and its neighbours.
fn adjacent_files(square: Square, include_own: bool) -> Bitboard {
    let file = square.file() as u32;
    let mut files = Bitboard::EMPTY;
    if include_own {
        files |= Bitboard::from_file(square.file());
    }
    if file > 0 {
        files |= Bitboard::from_file(File::new(file - 1));
    }
    if file < 7 {
        files |= Bitboard::from_file(File::new(file + 1));
    }
    files
}

fn count_doubled_pawns(our_pawns: Bitboard) -> i32 {
    File::ALL
        .into_iter()
        .map(|file| (our_pawns & Bitboard::from_file(file)).count().saturating_sub(1) as i32)
        .sum()
}

fn count_isolated_pawns(our_pawns: Bitboard) -> i32 {
    our_pawns
        .into_iter()
        .filter(|&square| (our_pawns & adjacent_files(square, false)).is_empty())
        .count() as i32
}

fn count_passed_pawns(color: Color, our_pawns: Bitboard, their_pawns: Bitboard) -> i32 {
    our_pawns
        .into_iter()
        .filter(|&square| {
            let rank = square.rank() as u32;
            let ahead = Square::ALL
                .into_iter()
                .filter(|sq| match color {
                    Color::White => (sq.rank() as u32) > rank,
                    Color::Black => (sq.rank() as u32) < rank,
                })
                .fold(Bitboard::EMPTY, |bb, sq| bb | Bitboard::from_square(sq));
            (their_pawns & adjacent_files(square, true) & ahead).is_empty()
        })
        .count() as i32
}
