// src/game/evaluation/see.rs

use super::piece_value;
use shakmaty::{Board, Color, Role, Square};

/// Kings are never actually captured, but they may end an exchange.
const KING_EXCHANGE_VALUE: i32 = 10_000;

fn exchange_value(role: Role) -> i32 {
    match role {
        Role::King => KING_EXCHANGE_VALUE,
        _ => piece_value(role),
    }
}

/// Static Exchange Evaluation (SEE)
///
/// Material balance for the side moving from `from` to `to` after both sides
/// keep recapturing on `to` with their least valuable attacker, each side
/// free to stop when continuing would lose material. Positive is good for
/// the mover. Pins and en passant are ignored.
pub fn see(board: &Board, from: Square, to: Square) -> i32 {
    let Some(attacker) = board.piece_at(from) else {
        return 0;
    };
    let gain = board.piece_at(to).map_or(0, |captured| exchange_value(captured.role));

    let mut next = board.clone();
    next.discard_piece_at(from);
    next.set_piece_at(to, attacker);

    gain - see_reply(&next, to, !attacker.color)
}

fn see_reply(board: &Board, target: Square, color: Color) -> i32 {
    let attackers = board.attacks_to(target, color, board.occupied()) & board.by_color(color);
    let least_valuable = attackers
        .into_iter()
        .filter_map(|sq| board.piece_at(sq).map(|piece| (sq, piece)))
        .min_by_key(|(_, piece)| exchange_value(piece.role));

    let Some((square, attacker)) = least_valuable else {
        return 0;
    };
    let Some(victim) = board.piece_at(target) else {
        return 0;
    };

    let mut next = board.clone();
    next.discard_piece_at(square);
    next.set_piece_at(target, attacker);

    (exchange_value(victim.role) - see_reply(&next, target, !color)).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::{fen::Fen, CastlingMode, Chess, Position};

    fn board(fen: &str) -> Board {
        let fen: Fen = fen.parse().unwrap();
        let pos: Chess = fen.into_position(CastlingMode::Standard).unwrap();
        pos.board().clone()
    }

    #[test]
    fn free_pawn() {
        let b = board("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1");
        assert_eq!(see(&b, Square::E4, Square::D5), 100);
    }

    #[test]
    fn defended_pawn_costs_the_queen() {
        let b = board("4k3/8/2p5/3p4/8/8/8/3QK3 w - - 0 1");
        assert_eq!(see(&b, Square::D1, Square::D5), 100 - 900);
    }

    #[test]
    fn recapture_is_optional() {
        // Pawn takes knight defended by a queen: the queen would lose itself to the rook.
        let b = board("4k3/8/8/3q4/4n3/3P4/8/4RK2 w - - 0 1");
        assert_eq!(see(&b, Square::D3, Square::E4), 320);
    }
}
