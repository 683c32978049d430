//! Error types shared by the board collaborator, the search and the front-end.

use shakmaty::Square;
use thiserror::Error;

/// Failures of the board collaborator. These mean the move stack and the
/// position disagree and are fatal to the search iteration that hit them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("no piece at expected square {square}")]
    NoPieceAt { square: Square },

    #[error("piece at {square} does not match the encoded move")]
    WrongPiece { square: Square },

    #[error("cannot undo: no move has been performed")]
    UndoEmpty,

    #[error("move cannot be encoded: {0}")]
    UnsupportedMove(String),
}

/// Errors surfaced by the iterative-deepening driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("board failure before any depth completed: {0}")]
    Board(#[from] BoardError),

    #[error("could not start the time controller: {0}")]
    ThreadSpawn(String),

    #[error("a search helper thread panicked")]
    HelperPanicked,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("profile i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("profile is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {source}")]
    Position {
        line: usize,
        #[source]
        source: UciError,
    },

    #[error(transparent)]
    Search(#[from] SearchError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UciError {
    #[error("invalid fen '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("illegal move '{0}'")]
    IllegalMove(String),

    #[error("malformed command: {0}")]
    Malformed(String),
}
