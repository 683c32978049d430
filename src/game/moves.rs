// src/game/moves.rs

//! Compact integer move encoding.
//!
//! Layout of the `u32`:
//!
//! | bits    | width | field                                   |
//! |---------|-------|-----------------------------------------|
//! | 0..6    | 6     | origin square                           |
//! | 6..12   | 6     | target square (rook square for castles) |
//! | 12..15  | 3     | moving role (1 = pawn .. 6 = king)      |
//! | 15..18  | 3     | captured role, 0 if none                |
//! | 18..21  | 3     | promotion role, 0 if none               |
//! | 21..23  | 2     | kind: normal, en passant, castle        |
//!
//! The moving role is never zero, so the all-zero word doubles as "no move".
//! Only 23 bits are used, which lets the transposition record keep a move in 24.

use crate::error::BoardError;
use shakmaty::{CastlingMode, Move, Role, Square};
use std::fmt;

const SQUARE_MASK: u32 = 0x3f;
const ROLE_MASK: u32 = 0x7;
const KIND_MASK: u32 = 0x3;

const TO_SHIFT: u32 = 6;
const ROLE_SHIFT: u32 = 12;
const CAPTURE_SHIFT: u32 = 15;
const PROMOTION_SHIFT: u32 = 18;
const KIND_SHIFT: u32 = 21;

pub const ENCODED_MOVE_BITS: u32 = 23;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum MoveKind {
    Normal = 0,
    EnPassant = 1,
    Castle = 2,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EncodedMove(u32);

impl EncodedMove {
    pub const NONE: EncodedMove = EncodedMove(0);

    pub fn from_bits(bits: u32) -> Self {
        EncodedMove(bits & ((1 << ENCODED_MOVE_BITS) - 1))
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn some(self) -> Option<EncodedMove> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }

    pub fn encode(m: Move) -> Result<Self, BoardError> {
        let (from, to, role, capture, promotion, kind) = match m {
            Move::Normal { role, from, capture, to, promotion } => {
                (from, to, role, capture, promotion, MoveKind::Normal)
            }
            Move::EnPassant { from, to } => {
                (from, to, Role::Pawn, Some(Role::Pawn), None, MoveKind::EnPassant)
            }
            Move::Castle { king, rook } => (king, rook, Role::King, None, None, MoveKind::Castle),
            Move::Put { .. } => return Err(BoardError::UnsupportedMove(format!("{m:?}"))),
        };

        Ok(EncodedMove(
            from as u32
                | (to as u32) << TO_SHIFT
                | (role as u32) << ROLE_SHIFT
                | capture.map_or(0, |r| r as u32) << CAPTURE_SHIFT
                | promotion.map_or(0, |r| r as u32) << PROMOTION_SHIFT
                | (kind as u32) << KIND_SHIFT,
        ))
    }

    pub fn from_square(self) -> Square {
        Square::new(self.0 & SQUARE_MASK)
    }

    pub fn to_square(self) -> Square {
        Square::new((self.0 >> TO_SHIFT) & SQUARE_MASK)
    }

    pub fn role(self) -> Option<Role> {
        role_from_bits((self.0 >> ROLE_SHIFT) & ROLE_MASK)
    }

    pub fn captured(self) -> Option<Role> {
        role_from_bits((self.0 >> CAPTURE_SHIFT) & ROLE_MASK)
    }

    pub fn promotion(self) -> Option<Role> {
        role_from_bits((self.0 >> PROMOTION_SHIFT) & ROLE_MASK)
    }

    pub fn kind(self) -> MoveKind {
        match (self.0 >> KIND_SHIFT) & KIND_MASK {
            1 => MoveKind::EnPassant,
            2 => MoveKind::Castle,
            _ => MoveKind::Normal,
        }
    }

    pub fn is_capture(self) -> bool {
        self.captured().is_some()
    }

    pub fn is_promotion(self) -> bool {
        self.promotion().is_some()
    }

    /// Quiet moves are the ones eligible for the killer table.
    pub fn is_quiet(self) -> bool {
        !self.is_capture() && !self.is_promotion()
    }

    /// Rebuilds the `shakmaty` move. Fails for the null encoding.
    pub fn decode(self) -> Result<Move, BoardError> {
        let from = self.from_square();
        let to = self.to_square();
        let role = self.role().ok_or(BoardError::NoPieceAt { square: from })?;

        Ok(match self.kind() {
            MoveKind::Normal => Move::Normal {
                role,
                from,
                capture: self.captured(),
                to,
                promotion: self.promotion(),
            },
            MoveKind::EnPassant => Move::EnPassant { from, to },
            MoveKind::Castle => Move::Castle { king: from, rook: to },
        })
    }

    /// Standard UCI notation (castling as king-to-target), "0000" for no move.
    pub fn to_uci(self) -> String {
        match self.decode() {
            Ok(m) => m.to_uci(CastlingMode::Standard).to_string(),
            Err(_) => "0000".to_string(),
        }
    }
}

fn role_from_bits(bits: u32) -> Option<Role> {
    match bits {
        1..=6 => Some(Role::ALL[bits as usize - 1]),
        _ => None,
    }
}

impl fmt::Debug for EncodedMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncodedMove({})", self.to_uci())
    }
}

impl fmt::Display for EncodedMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::{fen::Fen, Chess, Position};

    fn position(fen: &str) -> Chess {
        let fen: Fen = fen.parse().unwrap();
        fen.into_position(CastlingMode::Standard).unwrap()
    }

    #[test]
    fn every_legal_move_survives_encoding() {
        let positions = [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "8/8/8/2k5/3Pp3/8/8/4K3 b - d3 0 1",
        ];
        for fen in positions {
            let pos = position(fen);
            for m in pos.legal_moves() {
                let encoded = EncodedMove::encode(m).unwrap();
                assert!(!encoded.is_none());
                assert_eq!(encoded.decode().unwrap(), m, "{fen}");
            }
        }
    }

    #[test]
    fn fields_are_readable() {
        let pos = position("8/8/8/2k5/3Pp3/8/8/4K3 b - d3 0 1");
        let ep = pos
            .legal_moves()
            .into_iter()
            .find(|m| m.is_en_passant())
            .unwrap();
        let encoded = EncodedMove::encode(ep).unwrap();
        assert_eq!(encoded.kind(), MoveKind::EnPassant);
        assert_eq!(encoded.captured(), Some(Role::Pawn));
        assert_eq!(encoded.from_square(), Square::E4);
        assert_eq!(encoded.to_square(), Square::D3);
        assert_eq!(encoded.to_uci(), "e4d3");
    }

    #[test]
    fn castling_prints_king_target() {
        let pos = position("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let castle = pos
            .legal_moves()
            .into_iter()
            .find(|m| m.is_castle() && m.to() == Square::H1)
            .unwrap();
        let encoded = EncodedMove::encode(castle).unwrap();
        assert_eq!(encoded.kind(), MoveKind::Castle);
        assert!(encoded.is_quiet());
        assert_eq!(encoded.to_uci(), "e1g1");
    }

    #[test]
    fn none_is_distinct() {
        assert!(EncodedMove::NONE.is_none());
        assert_eq!(EncodedMove::NONE.some(), None);
        assert_eq!(EncodedMove::NONE.to_uci(), "0000");
        assert!(EncodedMove::NONE.decode().is_err());
    }
}
