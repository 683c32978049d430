// src/game/search/time.rs

//! Clock budgeting and the controller thread that enforces it.
//!
//! The controller sleeps on a channel with `recv_timeout`, so a search that
//! finishes early wakes it straight away. When a quantum runs out it either
//! lets the running iteration finish without starting another, or, when the
//! score has dropped against the previous move's, grants one more quantum.
//! After the last checkpoint it raises the stop flag.

use super::stop::StopToken;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering::Relaxed};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Extra quanta the controller may grant when the score is in trouble.
pub const EXTRA_CHECKPOINTS: u32 = 2;
/// Score drop against the reference that counts as trouble.
pub const TROUBLE_MARGIN: i32 = 50;
/// A wait overrunning its timeout by this factor is treated as a hang.
pub const OVERRUN_FACTOR: u32 = 3;
const MIN_OVERRUN: Duration = Duration::from_millis(50);
const MIN_QUANTUM: Duration = Duration::from_millis(1);
const NO_SCORE: i32 = i32::MIN;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeControl {
    Infinite,
    MoveTime(Duration),
    Clock {
        remaining: Duration,
        increment: Duration,
        moves_to_go: Option<u32>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeBudget {
    pub quantum: Duration,
    pub hard_limit: Duration,
}

/// Default moves left in the game, from the fullmove counter.
pub fn estimate_moves_to_go(fullmove: u32) -> u32 {
    50u32.saturating_sub(fullmove / 2).max(20)
}

impl TimeControl {
    /// `None` means no clock limit at all.
    pub fn budget(&self, fullmove: u32, overhead: Duration) -> Option<TimeBudget> {
        match *self {
            TimeControl::Infinite => None,
            TimeControl::MoveTime(limit) => {
                let limit = limit.saturating_sub(overhead).max(MIN_QUANTUM);
                Some(TimeBudget {
                    quantum: limit,
                    hard_limit: limit,
                })
            }
            TimeControl::Clock {
                remaining,
                increment,
                moves_to_go,
            } => {
                let moves_to_go = moves_to_go
                    .filter(|&n| n > 0)
                    .unwrap_or_else(|| estimate_moves_to_go(fullmove));
                // Safety reserve: never plan on more than 90% of what is left.
                let usable = remaining.saturating_sub(overhead) * 9 / 10;
                let quantum = (remaining / moves_to_go + increment * 3 / 4)
                    .min(usable)
                    .max(MIN_QUANTUM);
                let hard_limit = (quantum * (EXTRA_CHECKPOINTS + 1)).min(usable).max(quantum);
                Some(TimeBudget { quantum, hard_limit })
            }
        }
    }
}

/// State shared between the driver and the controller.
#[derive(Debug)]
pub struct SearchClock {
    may_iterate: AtomicBool,
    score: AtomicI32,
}

impl Default for SearchClock {
    fn default() -> Self {
        Self {
            may_iterate: AtomicBool::new(true),
            score: AtomicI32::new(NO_SCORE),
        }
    }
}

impl SearchClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the driver may begin another iteration.
    pub fn may_start_iteration(&self) -> bool {
        self.may_iterate.load(Relaxed)
    }

    pub fn deny_iterations(&self) {
        self.may_iterate.store(false, Relaxed);
    }

    /// Score of the last completed iteration.
    pub fn publish(&self, score: i32) {
        self.score.store(score, Relaxed);
    }

    pub fn current_score(&self) -> Option<i32> {
        match self.score.load(Relaxed) {
            NO_SCORE => None,
            score => Some(score),
        }
    }
}

/// Whether the search looks fine compared to the previous move's result.
fn out_of_trouble(reference: Option<i32>, current: Option<i32>) -> bool {
    match (reference, current) {
        (Some(reference), Some(current)) => current >= reference - TROUBLE_MARGIN,
        // Nothing to compare against: take the normal budget.
        (None, _) => true,
        (Some(_), None) => false,
    }
}

fn overran(requested: Duration, actual: Duration) -> bool {
    actual > requested * OVERRUN_FACTOR && actual - requested > MIN_OVERRUN
}

/// How one controller wait ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Wake {
    /// The search finished and said so.
    Finished,
    /// The timeout ran out after sleeping this long.
    Elapsed(Duration),
}

/// The controller's checkpoint loop. `wait` sleeps for at most the given
/// timeout and reports how the sleep ended.
fn control(
    budget: TimeBudget,
    reference: Option<i32>,
    stop: &StopToken,
    clock: &SearchClock,
    mut wait: impl FnMut(Duration) -> Wake,
) {
    let start = Instant::now();
    let mut deadline = budget.quantum;
    for checkpoint in 0..=EXTRA_CHECKPOINTS {
        let timeout = deadline.min(budget.hard_limit).saturating_sub(start.elapsed());
        let slept = match wait(timeout) {
            Wake::Finished => return,
            Wake::Elapsed(slept) => slept,
        };
        if overran(timeout, slept) {
            error!(?timeout, ?slept, "time controller woke up late, stopping search");
            clock.deny_iterations();
            stop.stop();
            return;
        }
        if start.elapsed() >= budget.hard_limit || checkpoint == EXTRA_CHECKPOINTS {
            break;
        }

        let current = clock.current_score();
        if out_of_trouble(reference, current) {
            debug!(checkpoint, ?current, "quantum spent, finishing current iteration");
            clock.deny_iterations();
        } else {
            debug!(checkpoint, ?reference, ?current, "score in trouble, extending");
        }
        deadline += budget.quantum;
    }
    debug!(elapsed = ?start.elapsed(), "time is up");
    clock.deny_iterations();
    stop.stop();
}

pub struct TimeController {
    done: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl TimeController {
    pub fn spawn(
        budget: TimeBudget,
        reference: Option<i32>,
        stop: StopToken,
        clock: Arc<SearchClock>,
    ) -> std::io::Result<Self> {
        let (done, done_rx) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("time-controller".to_string())
            .spawn(move || {
                control(budget, reference, &stop, &clock, |timeout| {
                    let went_to_sleep = Instant::now();
                    match done_rx.recv_timeout(timeout) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => Wake::Finished,
                        Err(RecvTimeoutError::Timeout) => Wake::Elapsed(went_to_sleep.elapsed()),
                    }
                })
            })?;
        Ok(Self {
            done,
            handle: Some(handle),
        })
    }

    /// Tells the controller the search is over and waits for it.
    pub fn finish(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.done.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("time controller panicked");
            }
        }
    }
}

impl Drop for TimeController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn moves_to_go_estimate() {
        assert_eq!(estimate_moves_to_go(1), 50);
        assert_eq!(estimate_moves_to_go(20), 40);
        assert_eq!(estimate_moves_to_go(100), 20);
    }

    #[test]
    fn clock_budget() {
        let tc = TimeControl::Clock {
            remaining: ms(60_000),
            increment: ms(1_000),
            moves_to_go: Some(30),
        };
        let budget = tc.budget(1, Duration::ZERO).unwrap();
        assert_eq!(budget.quantum, ms(2_000 + 750));
        assert_eq!(budget.hard_limit, ms(2_750 * 3));
    }

    #[test]
    fn clock_budget_keeps_a_reserve() {
        let tc = TimeControl::Clock {
            remaining: ms(100),
            increment: ms(1_000),
            moves_to_go: None,
        };
        let budget = tc.budget(1, ms(10)).unwrap();
        assert_eq!(budget.quantum, ms(81));
        assert_eq!(budget.hard_limit, ms(81));
    }

    #[test]
    fn movetime_is_a_hard_limit() {
        let budget = TimeControl::MoveTime(ms(500)).budget(1, ms(20)).unwrap();
        assert_eq!(budget.quantum, ms(480));
        assert_eq!(budget.hard_limit, ms(480));
        assert!(TimeControl::Infinite.budget(1, ms(20)).is_none());
    }

    #[test]
    fn trouble_detection() {
        assert!(out_of_trouble(None, None));
        assert!(out_of_trouble(Some(30), Some(-10)));
        assert!(!out_of_trouble(Some(30), Some(-30)));
        assert!(!out_of_trouble(Some(30), None));
    }

    #[test]
    fn overrun_needs_both_factor_and_minimum() {
        assert!(!overran(ms(10), ms(45)));
        assert!(overran(ms(10), ms(100)));
        assert!(!overran(ms(100), ms(250)));
    }

    /// Runs the checkpoint loop with instant waits, recording at each wait
    /// whether another iteration was still allowed and whether stop was raised.
    fn checkpoints(reference: Option<i32>, current: Option<i32>) -> (Vec<(bool, bool)>, bool, bool) {
        let stop = StopToken::new();
        let clock = SearchClock::new();
        if let Some(score) = current {
            clock.publish(score);
        }
        let budget = TimeBudget {
            quantum: ms(1_000),
            hard_limit: ms(10_000),
        };
        let mut seen = Vec::new();
        control(budget, reference, &stop, &clock, |timeout| {
            seen.push((clock.may_start_iteration(), stop.is_stopped()));
            Wake::Elapsed(timeout)
        });
        (seen, clock.may_start_iteration(), stop.is_stopped())
    }

    #[test]
    fn score_in_trouble_earns_extra_quanta() {
        let (seen, may_iterate, stopped) = checkpoints(Some(100), Some(100 - TROUBLE_MARGIN - 1));
        assert_eq!(seen, vec![(true, false); EXTRA_CHECKPOINTS as usize + 1]);
        assert!(!may_iterate);
        assert!(stopped);
    }

    #[test]
    fn steady_score_finishes_the_iteration_after_one_quantum() {
        let (seen, may_iterate, stopped) = checkpoints(Some(100), Some(100 - TROUBLE_MARGIN));
        assert_eq!(seen, vec![(true, false), (false, false), (false, false)]);
        assert!(!may_iterate);
        assert!(stopped);

        let (seen, _, _) = checkpoints(None, None);
        assert_eq!(seen[1], (false, false));
    }

    #[test]
    fn late_wakeup_stops_the_search_at_once() {
        let stop = StopToken::new();
        let clock = SearchClock::new();
        let budget = TimeBudget {
            quantum: ms(20),
            hard_limit: ms(10_000),
        };
        let mut waits = 0;
        control(budget, Some(0), &stop, &clock, |timeout| {
            waits += 1;
            Wake::Elapsed(timeout * (OVERRUN_FACTOR + 1) + MIN_OVERRUN * 2)
        });
        assert_eq!(waits, 1);
        assert!(stop.is_stopped());
        assert!(!clock.may_start_iteration());
    }

    #[test]
    fn finished_search_leaves_the_flags_alone() {
        let stop = StopToken::new();
        let clock = SearchClock::new();
        let budget = TimeBudget {
            quantum: ms(20),
            hard_limit: ms(60),
        };
        control(budget, Some(0), &stop, &clock, |_| Wake::Finished);
        assert!(!stop.is_stopped());
        assert!(clock.may_start_iteration());
    }

    #[test]
    fn controller_stops_after_hard_limit() {
        let stop = StopToken::new();
        let clock = Arc::new(SearchClock::new());
        let budget = TimeBudget {
            quantum: ms(20),
            hard_limit: ms(60),
        };
        let controller = TimeController::spawn(budget, Some(0), stop.clone(), clock.clone()).unwrap();
        thread::sleep(ms(300));
        assert!(stop.is_stopped());
        assert!(!clock.may_start_iteration());
        controller.finish();
    }

    #[test]
    fn finished_search_wakes_the_controller() {
        let stop = StopToken::new();
        let clock = Arc::new(SearchClock::new());
        let budget = TimeBudget {
            quantum: Duration::from_secs(30),
            hard_limit: Duration::from_secs(60),
        };
        let started = Instant::now();
        let controller = TimeController::spawn(budget, None, stop.clone(), clock).unwrap();
        controller.finish();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!stop.is_stopped());
    }
}
