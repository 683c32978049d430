use crate::event::{Event, InfoLine, Publisher};
use crate::game::board::{Board, GameBoard};
use crate::game::search::stop::StopToken;
use crate::game::search::{Engine, IterationInfo, SearchLimits};
use crossbeam_channel::{Receiver, Sender};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use tracing::{error, info, info_span, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Idle,
    Busy(String), // FEN of the position being searched
}

/// Work for the search thread, handled strictly in submission order.
#[derive(Debug)]
pub enum Job {
    Search {
        board: GameBoard,
        limits: SearchLimits,
        stop: StopToken,
    },
    NewGame,
    SetHashSize(usize),
    SetThreads(usize),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the engine on a dedicated thread so the protocol loop stays
/// responsive to `stop` while a search runs.
pub struct SearchWorker {
    jobs: Option<Sender<Job>>,
    current_stop: Mutex<StopToken>,
    status: Arc<Mutex<Status>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SearchWorker {
    pub fn spawn(engine: Engine, events: Publisher) -> io::Result<Self> {
        let (jobs, job_rx) = crossbeam_channel::unbounded();
        let status = Arc::new(Mutex::new(Status::Idle));
        let worker_status = status.clone();
        let handle = thread::Builder::new()
            .name("search-worker".to_string())
            .spawn(move || run(engine, job_rx, events, worker_status))?;
        Ok(Self {
            jobs: Some(jobs),
            current_stop: Mutex::new(StopToken::new()),
            status,
            handle: Some(handle),
        })
    }

    /// Queues a search. The stop token is created here, so a `stop` that
    /// arrives before the worker picks the job up still cancels it.
    pub fn search(&self, board: GameBoard, limits: SearchLimits) {
        let stop = StopToken::new();
        *lock(&self.current_stop) = stop.clone();
        self.submit(Job::Search { board, limits, stop });
    }

    pub fn stop(&self) {
        lock(&self.current_stop).stop();
    }

    pub fn submit(&self, job: Job) {
        let sent = self.jobs.as_ref().map(|jobs| jobs.send(job));
        if !matches!(sent, Some(Ok(()))) {
            error!("search worker is gone, job dropped");
        }
    }

    pub fn status(&self) -> Status {
        lock(&self.status).clone()
    }

    /// Finishes every queued job, then joins the thread.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("search worker panicked");
            }
        }
    }
}

impl Drop for SearchWorker {
    fn drop(&mut self) {
        self.close();
    }
}

fn run(mut engine: Engine, jobs: Receiver<Job>, events: Publisher, status: Arc<Mutex<Status>>) {
    while let Ok(job) = jobs.recv() {
        match job {
            Job::Search {
                mut board,
                limits,
                stop,
            } => {
                *lock(&status) = Status::Busy(board.fen());
                let _span = info_span!("job", kind = "search").entered();
                let mut report = |info: &IterationInfo<'_>| events.publish(Event::Info(InfoLine::from(info)));
                let outcome = engine.search_with_stop(&mut board, &limits, &stop, &mut report);
                debug_assert_eq!(board.stack_depth(), 0, "search left moves on the board");
                match outcome {
                    Ok(result) => {
                        if let Some(check) = result.blunder {
                            events.publish(Event::Message(format!(
                                "shallow re-search at depth {} scores {} against {}",
                                check.depth, check.check_score, check.main_score
                            )));
                        }
                        events.publish(Event::best_move(&result));
                    }
                    Err(e) => {
                        error!(fen = %board.fen(), "search failed: {e}");
                        events.publish(Event::Message(format!("search failed: {e}")));
                        events.publish(Event::BestMove(None));
                    }
                }
                *lock(&status) = Status::Idle;
            }
            Job::NewGame => engine.new_game(),
            Job::SetHashSize(size_mb) => engine.set_hash_size(size_mb),
            Job::SetThreads(threads) => {
                if threads == 0 {
                    warn!("ignoring a thread count of zero");
                } else {
                    info!(threads, "search threads changed");
                    engine.config_mut().threads = threads;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventBroker, SharedBuffer};
    use crate::game::evaluation::ClassicalEvaluator;
    use crate::game::search::SearchConfig;
    use std::time::Duration;

    fn start(buffer: &SharedBuffer) -> (SearchWorker, Publisher, thread::JoinHandle<()>) {
        let broker = EventBroker::new();
        let publisher = broker.publisher();
        let printer = broker.spawn_printer(buffer.clone()).unwrap();
        let engine = Engine::new(SearchConfig::default(), ClassicalEvaluator::default(), 4);
        let worker = SearchWorker::spawn(engine, publisher.clone()).unwrap();
        (worker, publisher, printer)
    }

    #[test]
    fn search_reports_iterations_then_best_move() {
        let buffer = SharedBuffer::default();
        let (worker, publisher, printer) = start(&buffer);

        worker.submit(Job::SetHashSize(2));
        worker.search(GameBoard::default(), SearchLimits::depth(3));
        worker.shutdown();
        drop(publisher);
        printer.join().unwrap();

        let output = buffer.contents();
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with("info depth 1 "));
        assert!(lines.iter().any(|l| l.starts_with("info depth 3 ")));
        assert!(lines.last().unwrap().starts_with("bestmove "));
        assert_ne!(*lines.last().unwrap(), "bestmove 0000");
    }

    #[test]
    fn stop_ends_a_long_search() {
        let buffer = SharedBuffer::default();
        let (worker, publisher, printer) = start(&buffer);

        worker.search(GameBoard::default(), SearchLimits::default());
        thread::sleep(Duration::from_millis(100));
        assert!(matches!(worker.status(), Status::Busy(_)));
        worker.stop();
        worker.shutdown();
        drop(publisher);
        printer.join().unwrap();

        assert!(buffer.contents().lines().last().unwrap().starts_with("bestmove "));
    }

    #[test]
    fn stop_before_pickup_still_cancels() {
        let buffer = SharedBuffer::default();
        let (worker, publisher, printer) = start(&buffer);

        worker.search(GameBoard::default(), SearchLimits::default());
        worker.stop();
        worker.shutdown();
        drop(publisher);
        printer.join().unwrap();

        let output = buffer.contents();
        assert_eq!(output.lines().filter(|l| l.starts_with("bestmove ")).count(), 1);
    }

    #[test]
    fn mated_root_reports_null_move() {
        let buffer = SharedBuffer::default();
        let (worker, publisher, printer) = start(&buffer);

        let board = crate::game::GameState::from_fen("R5k1/5ppp/8/8/8/8/8/6K1 b - - 0 1")
            .unwrap()
            .board()
            .clone();
        worker.search(board, SearchLimits::depth(4));
        worker.shutdown();
        drop(publisher);
        printer.join().unwrap();

        assert_eq!(buffer.contents(), "bestmove 0000\n");
    }
}
