// src/game/board.rs

//! The board collaborator consumed by the search.
//!
//! `shakmaty` positions are immutable-by-copy, so `GameBoard` keeps a stack of
//! snapshots to offer the perform/undo interface the searcher works with.
//! Every perform has to be paired with an undo; inside the search this is
//! enforced by [`MoveGuard`].

use crate::error::BoardError;
use crate::game::moves::EncodedMove;
use crate::game::repetition::RepetitionTracker;
use shakmaty::fen::Fen;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{Chess, Color, EnPassantMode, Position};
use std::ops::{Deref, DerefMut};
use tracing::error;

/// Halfmove clock value at which the fifty-move rule applies.
const FIFTY_MOVE_PLIES: u32 = 100;

pub trait Board {
    fn hash(&self) -> u64;
    fn side_to_move(&self) -> Color;
    fn in_check(&self) -> bool;
    /// Threefold repetition or the fifty-move rule.
    fn is_draw_claimable(&self) -> bool;
    fn is_insufficient_material(&self) -> bool;
    /// Whether the side to move has anything besides king and pawns.
    fn has_non_pawn_material(&self) -> bool;
    fn legal_moves(&self) -> Vec<EncodedMove>;
    fn perform_move(&mut self, mv: EncodedMove) -> Result<(), BoardError>;
    fn undo_move(&mut self) -> Result<(), BoardError>;
    /// Passes the turn. Returns false when the position does not allow it.
    fn perform_null_move(&mut self) -> bool;
    fn undo_null_move(&mut self) -> Result<(), BoardError>;
    /// True when the last performed move was a null move.
    fn last_was_null(&self) -> bool;
    fn position(&self) -> &Chess;

    fn fen(&self) -> String {
        Fen::from_position(self.position(), EnPassantMode::Legal).to_string()
    }
}

#[derive(Clone, Debug)]
struct Frame {
    previous: Chess,
    previous_hash: u64,
    null: bool,
}

#[derive(Clone, Debug)]
pub struct GameBoard {
    current: Chess,
    hash: u64,
    stack: Vec<Frame>,
    repetitions: RepetitionTracker,
}

fn zobrist(pos: &Chess) -> u64 {
    pos.zobrist_hash::<Zobrist64>(EnPassantMode::Legal).0
}

impl GameBoard {
    pub fn new(position: Chess) -> Self {
        let hash = zobrist(&position);
        let mut repetitions = RepetitionTracker::new();
        repetitions.record(hash);
        Self {
            current: position,
            hash,
            stack: Vec::new(),
            repetitions,
        }
    }

    /// Number of moves currently on the perform/undo stack.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn repetitions(&self) -> &RepetitionTracker {
        &self.repetitions
    }

    /// Drops the undo history while keeping the repetition counts. Used by
    /// the front-end after replaying game moves, which are never undone.
    pub fn commit(&mut self) {
        self.stack.clear();
    }
}

impl Default for GameBoard {
    fn default() -> Self {
        Self::new(Chess::default())
    }
}

impl Board for GameBoard {
    fn hash(&self) -> u64 {
        self.hash
    }

    fn side_to_move(&self) -> Color {
        self.current.turn()
    }

    fn in_check(&self) -> bool {
        self.current.is_check()
    }

    fn is_draw_claimable(&self) -> bool {
        if self.repetitions.is_draw_claimable(self.hash) {
            return true;
        }
        // A mate delivered on the hundredth ply still counts as mate.
        self.current.halfmoves() >= FIFTY_MOVE_PLIES && !self.current.is_checkmate()
    }

    fn is_insufficient_material(&self) -> bool {
        self.current.is_insufficient_material()
    }

    fn has_non_pawn_material(&self) -> bool {
        let board = self.current.board();
        let ours = board.by_color(self.current.turn());
        !(ours & !board.pawns() & !board.kings()).is_empty()
    }

    fn legal_moves(&self) -> Vec<EncodedMove> {
        self.current
            .legal_moves()
            .into_iter()
            .filter_map(|m| EncodedMove::encode(m).ok())
            .collect()
    }

    fn perform_move(&mut self, mv: EncodedMove) -> Result<(), BoardError> {
        let from = mv.from_square();
        let piece = self
            .current
            .board()
            .piece_at(from)
            .ok_or(BoardError::NoPieceAt { square: from })?;
        if piece.color != self.current.turn() || Some(piece.role) != mv.role() {
            return Err(BoardError::WrongPiece { square: from });
        }
        let m = mv.decode()?;

        let mut next = self.current.clone();
        next.play_unchecked(m);
        let previous = std::mem::replace(&mut self.current, next);
        self.stack.push(Frame {
            previous,
            previous_hash: self.hash,
            null: false,
        });
        self.hash = zobrist(&self.current);
        self.repetitions.record(self.hash);
        Ok(())
    }

    fn undo_move(&mut self) -> Result<(), BoardError> {
        let frame = self.stack.pop().ok_or(BoardError::UndoEmpty)?;
        if !frame.null {
            self.repetitions.forget(self.hash);
        }
        self.current = frame.previous;
        self.hash = frame.previous_hash;
        Ok(())
    }

    fn perform_null_move(&mut self) -> bool {
        match self.current.clone().swap_turn() {
            Ok(next) => {
                let previous = std::mem::replace(&mut self.current, next);
                self.stack.push(Frame {
                    previous,
                    previous_hash: self.hash,
                    null: true,
                });
                self.hash = zobrist(&self.current);
                true
            }
            Err(_) => false,
        }
    }

    fn undo_null_move(&mut self) -> Result<(), BoardError> {
        self.undo_move()
    }

    fn last_was_null(&self) -> bool {
        self.stack.last().is_some_and(|frame| frame.null)
    }

    fn position(&self) -> &Chess {
        &self.current
    }
}

/// Scoped make/unmake.
///
/// Performing a move hands out a guard that dereferences to the board; the
/// move is undone when the guard goes out of scope, whichever way the scope
/// is left.
pub struct MoveGuard<'a, B: Board + ?Sized> {
    board: &'a mut B,
    null: bool,
}

impl<'a, B: Board + ?Sized> MoveGuard<'a, B> {
    pub fn perform(board: &'a mut B, mv: EncodedMove) -> Result<Self, BoardError> {
        board.perform_move(mv)?;
        Ok(Self { board, null: false })
    }

    pub fn null(board: &'a mut B) -> Option<Self> {
        if board.perform_null_move() {
            Some(Self { board, null: true })
        } else {
            None
        }
    }
}

impl<B: Board + ?Sized> Deref for MoveGuard<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.board
    }
}

impl<B: Board + ?Sized> DerefMut for MoveGuard<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.board
    }
}

impl<B: Board + ?Sized> Drop for MoveGuard<'_, B> {
    fn drop(&mut self) {
        let undone = if self.null {
            self.board.undo_null_move()
        } else {
            self.board.undo_move()
        };
        if let Err(e) = undone {
            error!(fen = %self.board.fen(), "unpaired undo: {e}");
        }
    }
}
