// game/mod.rs

pub mod board;
pub mod evaluation;
pub mod moves;
pub mod repetition;
pub mod search;

use crate::error::UciError;
use board::{Board, GameBoard};
use moves::EncodedMove;
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess};

/// The game as the front-end sees it: the board after every move played so far.
#[derive(Clone, Debug, Default)]
pub struct GameState {
    board: GameBoard,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fen(fen: &str) -> Result<Self, UciError> {
        let invalid = |reason: String| UciError::InvalidFen {
            fen: fen.to_string(),
            reason,
        };
        let parsed: Fen = fen.parse().map_err(|e| invalid(format!("{e}")))?;
        let position: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{e}")))?;
        Ok(Self {
            board: GameBoard::new(position),
        })
    }

    /// Plays a move given in UCI notation. The move becomes part of the game
    /// history and is never undone.
    pub fn make_move(&mut self, uci: &str) -> Result<(), UciError> {
        let illegal = || UciError::IllegalMove(uci.to_string());
        let parsed: UciMove = uci.parse().map_err(|_| illegal())?;
        let m = parsed.to_move(self.board.position()).map_err(|_| illegal())?;
        let encoded = EncodedMove::encode(m).map_err(|_| illegal())?;
        self.board.perform_move(encoded).map_err(|_| illegal())?;
        self.board.commit();
        Ok(())
    }

    pub fn make_moves<'a>(&mut self, moves: impl IntoIterator<Item = &'a str>) -> Result<(), UciError> {
        moves.into_iter().try_for_each(|uci| self.make_move(uci))
    }

    pub fn board(&self) -> &GameBoard {
        &self.board
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaying_moves_keeps_repetition_history() {
        let mut game = GameState::new();
        game.make_moves(["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"])
            .unwrap();
        assert_eq!(game.board().stack_depth(), 0);
        assert!(game.board().is_draw_claimable());
    }

    #[test]
    fn rejects_bad_input() {
        let mut game = GameState::new();
        assert_eq!(game.make_move("e2e5"), Err(UciError::IllegalMove("e2e5".into())));
        assert_eq!(game.make_move("zz"), Err(UciError::IllegalMove("zz".into())));
        assert!(matches!(
            GameState::from_fen("not a fen"),
            Err(UciError::InvalidFen { .. })
        ));
    }

    #[test]
    fn from_fen_sets_up_the_position() {
        let game = GameState::from_fen("4k3/8/8/8/8/8/4P3/4K3 b - - 0 1").unwrap();
        assert_eq!(game.board().side_to_move(), shakmaty::Color::Black);
        assert_eq!(game.board().legal_moves().len(), 5);
    }
}
