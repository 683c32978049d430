// src/game/search/quiescence.rs

use super::negamax::{Abort, Searcher};
use super::ordering::{is_good_capture, order_captures};
use super::score::mated_in;
use crate::constants::{DRAW_SCORE, MAX_PLY};
use crate::game::board::{Board, MoveGuard};
use crate::game::evaluation::{piece_value, Evaluator};

/// Best case gain on top of the captured piece before a capture counts as hopeless.
const DELTA_MARGIN: i32 = 200;

impl<E: Evaluator + ?Sized> Searcher<'_, E> {
    /// Tactical search below the horizon. `qply` counts plies since the
    /// horizon; quiet checking moves are only tried at the first one.
    pub fn quiescence<B: Board + ?Sized>(
        &mut self,
        board: &mut B,
        ply: usize,
        mut alpha: i32,
        beta: i32,
        qply: usize,
    ) -> Result<i32, Abort> {
        if qply > 0 {
            self.visit(ply)?;
        }
        self.pv.clear_ply(ply);

        if ply >= MAX_PLY - 1 {
            return Ok(self.evaluator.evaluate(board.position()));
        }
        if board.is_insufficient_material() {
            return Ok(DRAW_SCORE);
        }

        let in_check = board.in_check();
        let mut moves = board.legal_moves();
        if moves.is_empty() {
            return Ok(if in_check { mated_in(ply) } else { DRAW_SCORE });
        }

        let stand_pat = if in_check {
            None
        } else {
            Some(self.evaluator.lazy_evaluate(board.position(), beta))
        };
        let mut best_score = mated_in(ply);
        if let Some(stand_pat) = stand_pat {
            if stand_pat >= beta {
                return Ok(stand_pat);
            }
            alpha = alpha.max(stand_pat);
            best_score = stand_pat;
        }

        if !in_check {
            let pos = board.position();
            moves.retain(|&mv| {
                if mv.is_quiet() {
                    return qply == 0;
                }
                if !is_good_capture(pos, mv) {
                    return false;
                }
                // Delta pruning: even winning the piece outright cannot reach alpha.
                mv.is_promotion()
                    || stand_pat.map_or(true, |sp| {
                        sp + mv.captured().map_or(0, piece_value) + DELTA_MARGIN > alpha
                    })
            });
        }
        order_captures(&mut moves);

        for mv in moves {
            let quiet_check = !in_check && mv.is_quiet();
            let mut guard = MoveGuard::perform(&mut *board, mv)?;
            if quiet_check && !guard.in_check() {
                continue;
            }

            let score = -self.quiescence(&mut *guard, ply + 1, -beta, -alpha, qply + 1)?;
            drop(guard);

            if score > best_score {
                best_score = score;
                if score > alpha {
                    alpha = score;
                    self.pv.update(ply, mv);
                    if score >= beta {
                        break;
                    }
                }
            }
        }

        Ok(best_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::INFINITY;
    use crate::game::board::GameBoard;
    use crate::game::evaluation::ClassicalEvaluator;
    use crate::game::search::score::mate_in;
    use crate::game::search::stop::StopToken;
    use crate::game::search::tt::TranspositionTable;
    use crate::game::search::SearchConfig;
    use shakmaty::{fen::Fen, CastlingMode};

    fn board(fen: &str) -> GameBoard {
        let fen: Fen = fen.parse().unwrap();
        GameBoard::new(fen.into_position(CastlingMode::Standard).unwrap())
    }

    fn qsearch(fen: &str) -> (i32, i32, String) {
        let tt = TranspositionTable::new(1);
        let eval = ClassicalEvaluator::default();
        let config = SearchConfig::default();
        let stop = StopToken::new();
        let mut searcher = Searcher::new(&tt, &eval, &config, &stop);
        let mut board = board(fen);
        let static_eval = eval.evaluate(board.position());
        let score = searcher.quiescence(&mut board, 0, -INFINITY, INFINITY, 0).unwrap();
        let first = searcher.pv.line(0).first().map(|m| m.to_uci()).unwrap_or_default();
        assert_eq!(board.stack_depth(), 0);
        (static_eval, score, first)
    }

    #[test]
    fn wins_a_hanging_queen() {
        let (static_eval, score, first) = qsearch("4k3/8/8/3q4/4P3/8/8/4K3 w - - 0 1");
        assert_eq!(first, "e4d5");
        assert!(score > static_eval + 800);
    }

    #[test]
    fn declines_a_losing_capture() {
        // Qxd5 runs into cxd5 and the queen has no checks; standing pat is best.
        let (static_eval, score, first) = qsearch("7k/6pp/2p5/3p4/8/8/8/3QK3 w - - 0 1");
        assert_eq!(score, static_eval);
        assert!(first.is_empty());
    }

    #[test]
    fn quiet_check_finds_mate() {
        let (_, score, first) = qsearch("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1");
        assert_eq!(first, "a1a8");
        assert_eq!(score, mate_in(1));
    }

    #[test]
    fn check_has_no_stand_pat() {
        // In check; the only evasion is Qxa8 and it has to be searched.
        let tt = TranspositionTable::new(1);
        let eval = ClassicalEvaluator::default();
        let config = SearchConfig::default();
        let stop = StopToken::new();
        let mut searcher = Searcher::new(&tt, &eval, &config, &stop);
        let mut board = board("R5k1/8/6K1/8/8/8/8/7q b - - 0 1");
        let score = searcher.quiescence(&mut board, 1, -INFINITY, INFINITY, 1).unwrap();
        assert!(score > -INFINITY);
        assert!(searcher.nodes() > 1);
    }
}
