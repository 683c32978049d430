// src/sts/mod.rs

//! EPD test-suite runner: searches each `<fen> bm <san>;` position to a
//! fixed depth and counts how often the engine agrees with the book move.

use crate::config::EngineConfig;
use crate::error::BenchError;
use crate::game::board::Board;
use crate::game::evaluation::ClassicalEvaluator;
use crate::game::search::{Engine, IterationInfo, SearchLimits};
use crate::game::GameState;
use serde::{Deserialize, Serialize};
use shakmaty::san::San;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StsFailure {
    pub fen: String,
    pub expected: Vec<String>,
    pub found: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StsResult {
    pub depth: u8,
    pub completed_positions: usize,
    pub correct_moves: usize,
    pub total_positions: usize,
    pub nodes: u64,
    pub elapsed_ms: u64,
    pub elo: Option<f64>,
    pub failures: Vec<StsFailure>,
}

/// One test position with the acceptable answers.
#[derive(Debug, Clone)]
pub struct EpdEntry {
    pub game: GameState,
    pub best_moves: Vec<String>,
}

pub struct StsRunner {
    engine: Engine,
    depth: u8,
}

impl StsRunner {
    pub fn new(config: &EngineConfig, depth: u8) -> Self {
        let engine = Engine::new(
            config.search.clone(),
            ClassicalEvaluator::new(config.weights),
            config.hash_mb,
        );
        Self { engine, depth }
    }

    pub fn run_file(&mut self, path: &Path) -> Result<StsResult, BenchError> {
        let content = fs::read_to_string(path).map_err(|source| BenchError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let entries = parse_epd(&content)?;
        self.run(&entries)
    }

    pub fn run(&mut self, entries: &[EpdEntry]) -> Result<StsResult, BenchError> {
        let start = Instant::now();
        let mut result = StsResult {
            depth: self.depth,
            completed_positions: 0,
            correct_moves: 0,
            total_positions: entries.len(),
            nodes: 0,
            elapsed_ms: 0,
            elo: None,
            failures: Vec::new(),
        };

        for entry in entries {
            let mut board = entry.game.board().clone();
            let fen = board.fen();
            self.engine.new_game();
            let searched = self
                .engine
                .search(&mut board, &SearchLimits::depth(self.depth), &mut |_: &IterationInfo<'_>| {})?;
            result.nodes += searched.nodes;

            let found = searched
                .best_move()
                .and_then(|mv| mv.decode().ok())
                .map(|m| San::from_move(board.position(), m).to_string())
                .unwrap_or_else(|| "none".to_string());
            let is_correct = entry.best_moves.iter().any(|expected| same_san(expected, &found));

            result.completed_positions += 1;
            if is_correct {
                result.correct_moves += 1;
            } else {
                result.failures.push(StsFailure {
                    fen: fen.clone(),
                    expected: entry.best_moves.clone(),
                    found: found.clone(),
                });
            }
            info!(
                "[{}/{}] {} -> {} ({}) [{}]",
                result.completed_positions,
                result.total_positions,
                fen,
                found,
                entry.best_moves.join(" "),
                if is_correct { "Match" } else { "Fail" }
            );
        }

        if result.total_positions > 0 {
            let score_percentage = result.correct_moves as f64 / result.total_positions as f64 * 100.0;
            result.elo = Some(44.523 * score_percentage - 242.85);
        }
        result.elapsed_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }
}

/// Compares SAN strings ignoring check and annotation suffixes.
fn same_san(a: &str, b: &str) -> bool {
    let strip = |s: &str| s.trim_end_matches(['+', '#', '!', '?']).to_string();
    strip(a) == strip(b)
}

/// Parses EPD text. Lines without a `bm` operation are skipped; a position
/// that does not parse is an error naming its line.
pub fn parse_epd(content: &str) -> Result<Vec<EpdEntry>, BenchError> {
    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((fen, operations)) = line.split_once(" bm ") else {
            debug!(line = index + 1, "no bm operation, skipped");
            continue;
        };
        let best_moves: Vec<String> = operations
            .split(';')
            .next()
            .unwrap_or("")
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if best_moves.is_empty() {
            warn!(line = index + 1, "empty bm operation, skipped");
            continue;
        }

        let game = GameState::from_fen(fen.trim()).map_err(|source| BenchError::Position {
            line: index + 1,
            source,
        })?;
        entries.push(EpdEntry { game, best_moves });
    }
    Ok(entries)
}
