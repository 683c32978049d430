// src/game/search/negamax.rs

//! The recursive alpha-beta searcher.
//!
//! One `Searcher` belongs to one thread. It owns the per-search ordering and
//! PV bookkeeping; the transposition table and the stop token are shared.

use super::killers::KillerTable;
use super::ordering::order_moves;
use super::pv::PvTable;
use super::record::{Bound, TtRecord};
use super::score::{from_tt, is_mate_score, mated_in, to_tt};
use super::stop::StopToken;
use super::tt::TranspositionTable;
use super::window::{TtVerdict, WindowTracker};
use super::SearchConfig;
use crate::constants::{DRAW_SCORE, INFINITY, MATE_BOUND, MAX_PLY, POLL_INTERVAL};
use crate::error::BoardError;
use crate::game::board::{Board, MoveGuard};
use crate::game::evaluation::Evaluator;
use crate::game::moves::EncodedMove;

const NMP_DEPTH_REDUCTION: i32 = 3;
const NMP_MIN_DEPTH: i32 = 3;
const LMR_MIN_DEPTH: i32 = 3;
const LMR_MIN_MOVE_INDEX: usize = 3;
const FUTILITY_MARGIN: i32 = 100;

/// Why a search stopped before producing a score.
#[derive(Clone, Debug, PartialEq)]
pub enum Abort {
    Cancelled,
    Board(BoardError),
}

impl From<BoardError> for Abort {
    fn from(e: BoardError) -> Self {
        Abort::Board(e)
    }
}

pub struct Searcher<'a, E: Evaluator + ?Sized> {
    pub(super) tt: &'a TranspositionTable,
    pub(super) evaluator: &'a E,
    pub(super) config: &'a SearchConfig,
    stop: &'a StopToken,
    node_limit: Option<u64>,
    nodes: u64,
    seldepth: usize,
    killers: KillerTable,
    pub(super) pv: PvTable,
    windows: WindowTracker,
    prev_pv: Vec<EncodedMove>,
}

impl<'a, E: Evaluator + ?Sized> Searcher<'a, E> {
    pub fn new(
        tt: &'a TranspositionTable,
        evaluator: &'a E,
        config: &'a SearchConfig,
        stop: &'a StopToken,
    ) -> Self {
        Self {
            tt,
            evaluator,
            config,
            stop,
            node_limit: None,
            nodes: 0,
            seldepth: 0,
            killers: KillerTable::new(),
            pv: PvTable::new(),
            windows: WindowTracker::new(),
            prev_pv: Vec::new(),
        }
    }

    pub fn with_node_limit(mut self, limit: Option<u64>) -> Self {
        self.node_limit = limit;
        self
    }

    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    pub fn seldepth(&self) -> usize {
        self.seldepth
    }

    pub fn pv_line(&self) -> Vec<EncodedMove> {
        self.pv.line(0).to_vec()
    }

    /// Line to try first at each PV ply of the next iteration.
    pub fn set_prev_pv(&mut self, line: &[EncodedMove]) {
        self.prev_pv.clear();
        self.prev_pv.extend_from_slice(line);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    pub fn reset_seldepth(&mut self) {
        self.seldepth = 0;
    }

    /// Counts a node and checks for cancellation.
    pub(super) fn visit(&mut self, ply: usize) -> Result<(), Abort> {
        self.nodes += 1;
        self.seldepth = self.seldepth.max(ply);
        if self.nodes % POLL_INTERVAL == 0 && self.stop.is_stopped() {
            return Err(Abort::Cancelled);
        }
        if self.node_limit.is_some_and(|limit| self.nodes >= limit) {
            self.stop.stop();
            return Err(Abort::Cancelled);
        }
        Ok(())
    }

    /// Fail-soft negamax. `on_pv` is true while the path from the root
    /// follows the previous iteration's principal variation.
    pub fn negamax<B: Board + ?Sized>(
        &mut self,
        board: &mut B,
        depth: i32,
        ply: usize,
        mut alpha: i32,
        beta: i32,
        on_pv: bool,
    ) -> Result<i32, Abort> {
        self.visit(ply)?;
        self.pv.clear_ply(ply);
        let root = ply == 0;

        if !root {
            if board.is_draw_claimable() || board.is_insufficient_material() {
                return Ok(DRAW_SCORE);
            }
            if ply >= MAX_PLY - 1 {
                return Ok(self.evaluator.evaluate(board.position()));
            }
        }

        let hash = board.hash();
        self.windows.enter(ply, alpha, beta);
        let mut hint = EncodedMove::NONE;
        if let Some(record) = self.tt.get(hash) {
            let score = from_tt(record.score(), ply);
            match self.windows.judge(ply, record, score, depth.max(0)) {
                TtVerdict::Exact(score) | TtVerdict::Refutation(score) if !root => {
                    return Ok(score);
                }
                TtVerdict::Seed(mv) => hint = mv,
                _ => hint = record.best_move(),
            }
        }
        if on_pv {
            if let Some(&mv) = self.prev_pv.get(ply) {
                hint = mv;
            }
        }

        let in_check = board.in_check();
        let mut moves = board.legal_moves();
        if moves.is_empty() {
            return Ok(if in_check { mated_in(ply) } else { DRAW_SCORE });
        }

        if depth <= 0 {
            if self.config.use_quiescence_search {
                return self.quiescence(board, ply, alpha, beta, 0);
            }
            return Ok(self.evaluator.evaluate(board.position()));
        }

        let pv_node = beta - alpha > 1;

        if self.config.use_null_move_pruning
            && !root
            && !pv_node
            && !in_check
            && depth >= NMP_MIN_DEPTH
            && !is_mate_score(beta)
            && !board.last_was_null()
            && board.has_non_pawn_material()
        {
            if let Some(mut guard) = MoveGuard::null(&mut *board) {
                let score = -self.negamax(
                    &mut *guard,
                    depth - NMP_DEPTH_REDUCTION,
                    ply + 1,
                    -beta,
                    -beta + 1,
                    false,
                )?;
                drop(guard);
                if score >= beta {
                    return Ok(if is_mate_score(score) { beta } else { score });
                }
            }
        }

        let futility_base = if self.config.use_futility_pruning
            && depth == 1
            && !pv_node
            && !in_check
            && !is_mate_score(alpha)
        {
            Some(self.evaluator.lazy_evaluate(board.position(), alpha) + FUTILITY_MARGIN)
        } else {
            None
        };

        let killers = if self.config.use_killer_moves {
            self.killers.get(ply)
        } else {
            [EncodedMove::NONE; 2]
        };
        order_moves(&mut moves, board.position(), hint, killers, self.evaluator);

        let original_alpha = alpha;
        let mut best_score = -INFINITY;
        let mut best_move = EncodedMove::NONE;

        for (index, &mv) in moves.iter().enumerate() {
            let quiet = mv.is_quiet();
            // No pruning while every searched move still loses to mate.
            let futility_score = match futility_base {
                Some(base) if index > 0 && quiet && best_score > -MATE_BOUND => {
                    Some(base + self.evaluator.move_estimate(board.position(), mv))
                }
                _ => None,
            }
            .filter(|&optimistic| optimistic <= alpha);
            let child_on_pv = on_pv && self.prev_pv.get(ply) == Some(&mv);

            let mut guard = MoveGuard::perform(&mut *board, mv)?;
            let gives_check = guard.in_check();
            if let Some(optimistic) = futility_score.filter(|_| !gives_check) {
                best_score = best_score.max(optimistic);
                continue;
            }

            let new_depth = depth - 1;
            let score = if index == 0 {
                -self.negamax(&mut *guard, new_depth, ply + 1, -beta, -alpha, child_on_pv)?
            } else {
                let reduction = if self.config.use_lmr
                    && depth >= LMR_MIN_DEPTH
                    && index >= LMR_MIN_MOVE_INDEX
                    && quiet
                    && !in_check
                    && !gives_check
                    && !killers.contains(&mv)
                {
                    let r = 1.0 + (depth as f32).ln() * (index as f32).ln() / 2.0;
                    (r as i32).min(depth - 1)
                } else {
                    0
                };

                let mut score = -self.negamax(
                    &mut *guard,
                    new_depth - reduction,
                    ply + 1,
                    -alpha - 1,
                    -alpha,
                    false,
                )?;
                if score > alpha && reduction > 0 {
                    score = -self.negamax(&mut *guard, new_depth, ply + 1, -alpha - 1, -alpha, false)?;
                }
                if score > alpha && score < beta {
                    score = -self.negamax(&mut *guard, new_depth, ply + 1, -beta, -alpha, child_on_pv)?;
                }
                score
            };
            drop(guard);

            if score > best_score {
                best_score = score;
                if score > alpha {
                    alpha = score;
                    best_move = mv;
                    self.windows.raise_alpha(ply, score);
                    self.pv.update(ply, mv);
                    if score >= beta {
                        if quiet && self.config.use_killer_moves {
                            self.killers.store(ply, mv);
                        }
                        break;
                    }
                }
            }
        }

        let bound = if best_score >= beta {
            Bound::Lower
        } else if alpha > original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        self.tt.put(
            hash,
            TtRecord::new(
                hash,
                best_move,
                to_tt(best_score, ply),
                depth.clamp(0, u8::MAX as i32) as u8,
                bound,
                self.tt.generation(),
            ),
        );

        Ok(best_score)
    }
}
