// src/game/search.rs

//! Iterative deepening on top of the ply searcher.

pub mod killers;
pub mod negamax;
pub mod ordering;
pub mod pv;
pub mod quiescence;
pub mod record;
pub mod score;
pub mod stop;
pub mod time;
pub mod tt;
pub mod window;


use crate::constants::{DRAW_SCORE, INFINITY, MAX_DEPTH};
use crate::error::{BoardError, SearchError};
use crate::game::board::{Board, MoveGuard};
use crate::game::evaluation::{ClassicalEvaluator, Evaluator};
use crate::game::moves::EncodedMove;
use crossbeam_utils::thread;
use negamax::{Abort, Searcher};
use score::{is_mate_score, mate_distance, mated_in};
use serde::{Deserialize, Serialize};
use shakmaty::Position;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stop::StopToken;
use time::{SearchClock, TimeControl, TimeController};
use tracing::{debug, debug_span, error, info, info_span, warn};
use tt::TranspositionTable;

pub const ASPIRATION_DELTA: i32 = 40;
pub const ASPIRATION_MIN_DEPTH: u8 = 4;
/// Shallow re-search disagreeing by more than this is reported.
pub const BLUNDER_MARGIN: i32 = 150;
const BLUNDER_CHECK_MIN_DEPTH: u8 = 4;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub threads: usize,
    pub use_aspiration_windows: bool,
    pub use_killer_moves: bool,
    pub use_quiescence_search: bool,
    pub use_null_move_pruning: bool,
    pub use_lmr: bool,
    pub use_futility_pruning: bool,
    pub use_blunder_check: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            use_aspiration_windows: true,
            use_killer_moves: true,
            use_quiescence_search: true,
            use_null_move_pruning: true,
            use_lmr: true,
            use_futility_pruning: true,
            use_blunder_check: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchLimits {
    pub depth: Option<u8>,
    pub nodes: Option<u64>,
    pub time: TimeControl,
    pub move_overhead: Duration,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            depth: None,
            nodes: None,
            time: TimeControl::Infinite,
            move_overhead: Duration::ZERO,
        }
    }
}

impl SearchLimits {
    pub fn depth(depth: u8) -> Self {
        Self {
            depth: Some(depth),
            ..Default::default()
        }
    }

    pub fn nodes(nodes: u64) -> Self {
        Self {
            nodes: Some(nodes),
            ..Default::default()
        }
    }

    pub fn movetime(limit: Duration) -> Self {
        Self {
            time: TimeControl::MoveTime(limit),
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootStatus {
    Moves,
    Checkmate,
    Stalemate,
}

/// A shallow re-search that disagreed with the main result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlunderCheck {
    pub depth: u8,
    pub main_score: i32,
    pub check_score: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    pub pv: Vec<EncodedMove>,
    pub score: i32,
    pub mate: bool,
    pub nodes: u64,
    pub depth: u8,
    pub seldepth: usize,
    pub aborted: bool,
    pub root_status: RootStatus,
    pub elapsed: Duration,
    pub blunder: Option<BlunderCheck>,
}

impl SearchResult {
    fn terminal(root_status: RootStatus, score: i32, elapsed: Duration) -> Self {
        Self {
            pv: Vec::new(),
            score,
            mate: root_status == RootStatus::Checkmate,
            nodes: 0,
            depth: 0,
            seldepth: 0,
            aborted: false,
            root_status,
            elapsed,
            blunder: None,
        }
    }

    pub fn best_move(&self) -> Option<EncodedMove> {
        self.pv.first().copied()
    }

    pub fn mate_distance(&self) -> Option<i32> {
        mate_distance(self.score)
    }
}

/// Progress of one completed iteration.
#[derive(Debug)]
pub struct IterationInfo<'a> {
    pub depth: u8,
    pub seldepth: usize,
    pub score: i32,
    pub nodes: u64,
    pub elapsed: Duration,
    pub hashfull: usize,
    pub pv: &'a [EncodedMove],
}

pub trait IterationObserver {
    fn on_iteration(&mut self, info: &IterationInfo<'_>);
}

impl<F: FnMut(&IterationInfo<'_>)> IterationObserver for F {
    fn on_iteration(&mut self, info: &IterationInfo<'_>) {
        self(info)
    }
}

/// Result of the last iteration that ran to completion.
#[derive(Clone, Debug)]
struct Completed {
    depth: u8,
    score: i32,
    seldepth: usize,
    pv: Vec<EncodedMove>,
}

#[derive(Debug, Default)]
struct Deepening {
    completed: Option<Completed>,
    aborted: bool,
    error: Option<BoardError>,
}

/// Owns the state that outlives a single search: the shared table and the
/// evaluator.
pub struct Engine<E: Evaluator = ClassicalEvaluator> {
    tt: Arc<TranspositionTable>,
    evaluator: E,
    config: SearchConfig,
    last_score: Option<i32>,
}

impl<E: Evaluator> Engine<E> {
    pub fn new(config: SearchConfig, evaluator: E, hash_mb: usize) -> Self {
        Self {
            tt: Arc::new(TranspositionTable::new(hash_mb)),
            evaluator,
            config,
            last_score: None,
        }
    }

    pub fn tt(&self) -> &Arc<TranspositionTable> {
        &self.tt
    }

    pub fn config_mut(&mut self) -> &mut SearchConfig {
        &mut self.config
    }

    pub fn set_hash_size(&mut self, size_mb: usize) {
        match Arc::get_mut(&mut self.tt) {
            Some(tt) => tt.resize(size_mb),
            None => self.tt = Arc::new(TranspositionTable::new(size_mb)),
        }
        info!(
            requested_mb = size_mb,
            size_mb = self.tt.size_mb(),
            slots = self.tt.len(),
            "transposition table resized"
        );
    }

    /// Forgets everything learned in the previous game.
    pub fn new_game(&mut self) {
        self.tt.clear();
        self.last_score = None;
    }

    /// Searches until a limit is reached. Nothing can cancel it from outside.
    pub fn search<B: Board + Clone + Send>(
        &mut self,
        board: &mut B,
        limits: &SearchLimits,
        observer: &mut dyn IterationObserver,
    ) -> Result<SearchResult, SearchError> {
        self.search_with_stop(board, limits, &StopToken::new(), observer)
    }

    /// Searches until `stop` is raised or a limit is reached. The token is
    /// left as is, so a stop requested before the call is honoured.
    pub fn search_with_stop<B: Board + Clone + Send>(
        &mut self,
        board: &mut B,
        limits: &SearchLimits,
        stop: &StopToken,
        observer: &mut dyn IterationObserver,
    ) -> Result<SearchResult, SearchError> {
        let start = Instant::now();
        let span = info_span!("search", fen = %board.fen());
        let _entered = span.enter();

        self.tt.new_search();

        let root_moves = board.legal_moves();
        if root_moves.is_empty() {
            let (status, score) = if board.in_check() {
                (RootStatus::Checkmate, mated_in(0))
            } else {
                (RootStatus::Stalemate, DRAW_SCORE)
            };
            info!(?status, "no legal moves at the root");
            return Ok(SearchResult::terminal(status, score, start.elapsed()));
        }

        let max_depth = limits.depth.unwrap_or(MAX_DEPTH).clamp(1, MAX_DEPTH);
        let clock = Arc::new(SearchClock::new());
        let fullmove = board.position().fullmoves().get();
        let controller = match limits.time.budget(fullmove, limits.move_overhead) {
            Some(budget) => {
                debug!(?budget, "starting time controller");
                let controller =
                    TimeController::spawn(budget, self.last_score, stop.clone(), clock.clone())
                        .map_err(|e| SearchError::ThreadSpawn(e.to_string()))?;
                Some(controller)
            }
            None => None,
        };

        let tt = &*self.tt;
        let evaluator = &self.evaluator;
        let config = &self.config;
        let threads = config.threads.max(1);

        let mut run_main = |board: &mut B| {
            let mut searcher = Searcher::new(tt, evaluator, config, stop).with_node_limit(limits.nodes);
            let deepening = deepen(&mut searcher, board, 1..=max_depth, &clock, |nodes, done| {
                let info = IterationInfo {
                    depth: done.depth,
                    seldepth: done.seldepth,
                    score: done.score,
                    nodes,
                    elapsed: start.elapsed(),
                    hashfull: tt.hashfull(),
                    pv: &done.pv,
                };
                debug!(depth = info.depth, score = info.score, nodes, "iteration complete");
                observer.on_iteration(&info);
            });
            (deepening, searcher.nodes())
        };

        let (deepening, main_nodes, helper_nodes) = if threads == 1 {
            let (deepening, nodes) = run_main(board);
            (deepening, nodes, 0)
        } else {
            thread::scope(|s| {
                let helpers: Vec<_> = (1..threads)
                    .filter_map(|id| {
                        let mut helper_board = board.clone();
                        let spawned = s
                            .builder()
                            .name(format!("search-helper-{id}"))
                            .spawn(move |_| {
                                run_helper(id, &mut helper_board, tt, evaluator, config, stop, max_depth)
                            });
                        match spawned {
                            Ok(handle) => Some(handle),
                            Err(e) => {
                                warn!(id, "could not start search helper: {e}");
                                None
                            }
                        }
                    })
                    .collect();

                let (deepening, nodes) = run_main(board);
                stop.stop();
                let helper_nodes: u64 = helpers
                    .into_iter()
                    .map(|handle| {
                        handle.join().unwrap_or_else(|_| {
                            error!("search helper panicked");
                            0
                        })
                    })
                    .sum();
                (deepening, nodes, helper_nodes)
            })
            .map_err(|_| SearchError::HelperPanicked)?
        };

        if let Some(controller) = controller {
            controller.finish();
        }

        let Deepening {
            completed,
            aborted,
            error,
        } = deepening;
        if let Some(e) = &error {
            error!(fen = %board.fen(), "search iteration failed: {e}");
        }

        let Some(done) = completed else {
            if let Some(e) = error {
                return Err(SearchError::Board(e));
            }
            // Stopped before the first iteration finished: any legal move beats none.
            warn!("search stopped before depth 1 completed");
            return Ok(SearchResult {
                pv: vec![root_moves[0]],
                score: DRAW_SCORE,
                mate: false,
                nodes: main_nodes + helper_nodes,
                depth: 0,
                seldepth: 0,
                aborted: true,
                root_status: RootStatus::Moves,
                elapsed: start.elapsed(),
                blunder: None,
            });
        };

        let mut pv = done.pv;
        if pv.is_empty() {
            pv.push(root_moves[0]);
        }

        let blunder = if config.use_blunder_check && error.is_none() && done.depth >= BLUNDER_CHECK_MIN_DEPTH {
            self.blunder_check(board, pv[0], done.depth, done.score)
        } else {
            None
        };

        self.last_score = Some(done.score);
        let result = SearchResult {
            pv,
            score: done.score,
            mate: is_mate_score(done.score),
            nodes: main_nodes + helper_nodes,
            depth: done.depth,
            seldepth: done.seldepth,
            aborted,
            root_status: RootStatus::Moves,
            elapsed: start.elapsed(),
            blunder,
        };
        info!(
            depth = result.depth,
            score = result.score,
            nodes = result.nodes,
            elapsed_ms = result.elapsed.as_millis() as u64,
            best = %pv_string(&result.pv[..1]),
            "search finished"
        );
        Ok(result)
    }

    /// Re-searches `mv` at half the depth with fresh killers. Only ever
    /// reports; the chosen move stays.
    fn blunder_check<B: Board + ?Sized>(
        &self,
        board: &mut B,
        mv: EncodedMove,
        depth: u8,
        main_score: i32,
    ) -> Option<BlunderCheck> {
        let check_depth = (depth / 2).max(1);
        let stop = StopToken::new();
        let mut searcher = Searcher::new(&self.tt, &self.evaluator, &self.config, &stop);

        let checked = MoveGuard::perform(&mut *board, mv)
            .map_err(Abort::from)
            .and_then(|mut guard| {
                searcher.negamax(&mut *guard, check_depth as i32 - 1, 1, -INFINITY, INFINITY, false)
            });
        let check_score = match checked {
            Ok(score) => -score,
            Err(e) => {
                warn!(?e, "blunder check did not complete");
                return None;
            }
        };

        if main_score - check_score > BLUNDER_MARGIN {
            warn!(
                best = %mv,
                main_score,
                check_score,
                check_depth,
                "shallow re-search disagrees with the chosen move"
            );
            return Some(BlunderCheck {
                depth: check_depth,
                main_score,
                check_score,
            });
        }
        None
    }
}

fn run_helper<B: Board + ?Sized, E: Evaluator + ?Sized>(
    id: usize,
    board: &mut B,
    tt: &TranspositionTable,
    evaluator: &E,
    config: &SearchConfig,
    stop: &StopToken,
    max_depth: u8,
) -> u64 {
    let _span = debug_span!("helper", id).entered();
    let mut searcher = Searcher::new(tt, evaluator, config, stop);
    // Odd helpers skip depth 1 so the threads spread over different depths.
    let first = if id % 2 == 1 { 2.min(max_depth) } else { 1 };
    let clock = SearchClock::new();
    let deepening = deepen(&mut searcher, board, first..=max_depth, &clock, |_, _| {});
    if let Some(e) = deepening.error {
        warn!(id, "helper stopped on a board failure: {e}");
    }
    searcher.nodes()
}

/// Runs iterations over `depths` until one is cut short, a mate inside the
/// searched depth turns up, or the clock refuses another iteration.
fn deepen<B: Board + ?Sized, E: Evaluator + ?Sized>(
    searcher: &mut Searcher<'_, E>,
    board: &mut B,
    depths: RangeInclusive<u8>,
    clock: &SearchClock,
    mut report: impl FnMut(u64, &Completed),
) -> Deepening {
    let mut outcome = Deepening::default();

    for depth in depths {
        if searcher.is_stopped() {
            outcome.aborted |= outcome.completed.is_none();
            break;
        }
        if outcome.completed.is_some() && !clock.may_start_iteration() {
            break;
        }
        let _span = debug_span!("iteration", depth).entered();
        searcher.reset_seldepth();

        let previous = outcome.completed.as_ref().map(|done| done.score);
        match aspiration(searcher, board, depth, previous) {
            Ok(score) => {
                let pv = searcher.pv_line();
                searcher.set_prev_pv(&pv);
                clock.publish(score);
                let done = Completed {
                    depth,
                    score,
                    seldepth: searcher.seldepth(),
                    pv,
                };
                report(searcher.nodes(), &done);
                let mate_found =
                    mate_distance(score).is_some_and(|d| d.unsigned_abs() <= depth as u32);
                outcome.completed = Some(done);
                if mate_found {
                    break;
                }
            }
            Err(Abort::Cancelled) => {
                debug!(depth, "iteration cancelled");
                outcome.aborted = true;
                break;
            }
            Err(Abort::Board(e)) => {
                outcome.aborted = true;
                outcome.error = Some(e);
                break;
            }
        }
    }
    outcome
}

/// Searches the root at `depth`, starting from a narrow window around the
/// previous score and widening on failure.
fn aspiration<B: Board + ?Sized, E: Evaluator + ?Sized>(
    searcher: &mut Searcher<'_, E>,
    board: &mut B,
    depth: u8,
    previous: Option<i32>,
) -> Result<i32, Abort> {
    let mut delta = ASPIRATION_DELTA;
    let (mut alpha, mut beta) = match previous {
        Some(prev)
            if searcher.config.use_aspiration_windows
                && depth >= ASPIRATION_MIN_DEPTH
                && !is_mate_score(prev) =>
        {
            ((prev - delta).max(-INFINITY), (prev + delta).min(INFINITY))
        }
        _ => (-INFINITY, INFINITY),
    };

    loop {
        let score = searcher.negamax(board, depth as i32, 0, alpha, beta, true)?;
        if score <= alpha && alpha > -INFINITY {
            delta *= 2;
            alpha = (alpha - delta).max(-INFINITY);
            debug!(depth, score, alpha, "aspiration fail low");
        } else if score >= beta && beta < INFINITY {
            delta *= 2;
            beta = (beta + delta).min(INFINITY);
            debug!(depth, score, beta, "aspiration fail high");
        } else {
            return Ok(score);
        }
    }
}

pub fn pv_string(pv: &[EncodedMove]) -> String {
    pv.iter().map(|mv| mv.to_uci()).collect::<Vec<_>>().join(" ")
}
