// src/uci/mod.rs

//! UCI front-end: reads commands, keeps the game position and hands
//! searches to the worker thread.

pub mod parser;

use crate::config::EngineConfig;
use crate::error::UciError;
use crate::event::{Event, EventBroker, Publisher};
use crate::game::board::Board;
use crate::game::evaluation::ClassicalEvaluator;
use crate::game::search::Engine;
use crate::game::GameState;
use crate::worker::{Job, SearchWorker, Status};
use parser::{parse_command, Command};
use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};

pub const ENGINE_NAME: &str = concat!("Pancake ", env!("CARGO_PKG_VERSION"));
pub const ENGINE_AUTHOR: &str = "the Pancake developers";

const MAX_HASH_MB: usize = 65_536;
const MAX_MOVE_OVERHEAD_MS: u64 = 5_000;

fn max_threads() -> usize {
    num_cpus::get().max(1)
}

pub struct UciSession {
    game: GameState,
    worker: SearchWorker,
    events: Publisher,
    config: EngineConfig,
}

impl UciSession {
    pub fn new(config: EngineConfig, events: Publisher) -> io::Result<Self> {
        let engine = Engine::new(
            config.search.clone(),
            ClassicalEvaluator::new(config.weights),
            config.hash_mb,
        );
        let worker = SearchWorker::spawn(engine, events.clone())?;
        Ok(Self {
            game: GameState::new(),
            worker,
            events,
            config,
        })
    }

    fn say(&self, line: impl Into<String>) {
        self.events.publish(Event::Protocol(line.into()));
    }

    /// Handles one command. Returns `Ok(false)` once the session should end.
    pub fn handle(&mut self, command: Command) -> Result<bool, UciError> {
        debug!(?command, "uci command");
        match command {
            Command::Uci => {
                self.say(format!("id name {ENGINE_NAME}"));
                self.say(format!("id author {ENGINE_AUTHOR}"));
                self.say(format!(
                    "option name Hash type spin default {} min 1 max {MAX_HASH_MB}",
                    self.config.hash_mb
                ));
                self.say(format!(
                    "option name Threads type spin default {} min 1 max {}",
                    self.config.search.threads,
                    max_threads()
                ));
                self.say(format!(
                    "option name MoveOverhead type spin default {} min 0 max {MAX_MOVE_OVERHEAD_MS}",
                    self.config.move_overhead_ms
                ));
                self.say("uciok");
            }
            Command::IsReady => self.say("readyok"),
            Command::UciNewGame => {
                self.game = GameState::new();
                self.worker.submit(Job::NewGame);
            }
            Command::Position { fen, moves } => {
                let mut game = match fen {
                    Some(fen) => GameState::from_fen(&fen)?,
                    None => GameState::new(),
                };
                game.make_moves(moves.iter().map(String::as_str))?;
                self.game = game;
            }
            Command::Go(params) => {
                if let Status::Busy(fen) = self.worker.status() {
                    warn!(%fen, "go while a search is running, queued behind it");
                }
                let board = self.game.board().clone();
                let limits = params.limits(board.side_to_move(), self.config.move_overhead());
                self.worker.search(board, limits);
            }
            Command::Stop => self.worker.stop(),
            Command::SetOption { name, value } => self.set_option(&name, value.as_deref())?,
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn set_option(&mut self, name: &str, value: Option<&str>) -> Result<(), UciError> {
        let number = |max: u64| -> Result<u64, UciError> {
            value
                .and_then(|v| v.parse::<u64>().ok())
                .map(|n| n.min(max))
                .ok_or_else(|| UciError::Malformed(format!("option {name} needs a number, got {value:?}")))
        };
        match name.to_ascii_lowercase().as_str() {
            "hash" => {
                let size_mb = number(MAX_HASH_MB as u64)?.max(1) as usize;
                self.config.hash_mb = size_mb;
                self.worker.submit(Job::SetHashSize(size_mb));
            }
            "threads" => {
                let threads = number(max_threads() as u64)?.max(1) as usize;
                self.config.search.threads = threads;
                self.worker.submit(Job::SetThreads(threads));
            }
            "moveoverhead" | "move overhead" => {
                self.config.move_overhead_ms = number(MAX_MOVE_OVERHEAD_MS)?;
            }
            _ => warn!(name, "unknown option ignored"),
        }
        info!(name, ?value, "option set");
        Ok(())
    }

    /// Lets queued work finish and stops the worker. With `abort` the
    /// running search is cancelled first.
    pub fn shutdown(self, abort: bool) {
        if abort {
            self.worker.stop();
        }
        self.worker.shutdown();
    }
}

/// Runs the protocol until `quit` or end of input. Output goes to `out`
/// through the printer thread.
pub fn run<R: BufRead, W: Write + Send + 'static>(input: R, config: EngineConfig, out: W) -> io::Result<()> {
    let broker = EventBroker::new();
    let events = broker.publisher();
    let printer = broker.spawn_printer(out)?;
    let mut session = UciSession::new(config, events.clone())?;

    let mut quit = false;
    for line in input.lines() {
        let line = line?;
        let handled = parse_command(&line).and_then(|command| match command {
            Some(command) => session.handle(command),
            None => {
                debug!(line, "ignored input");
                Ok(true)
            }
        });
        match handled {
            Ok(true) => {}
            Ok(false) => {
                quit = true;
                break;
            }
            Err(e) => {
                warn!(line, "{e}");
                events.publish(Event::Message(e.to_string()));
            }
        }
    }

    session.shutdown(quit);
    drop(events);
    printer
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "output thread panicked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SharedBuffer;
    use std::io::Cursor;

    fn session_output(script: &str) -> String {
        let buffer = SharedBuffer::default();
        let mut config = EngineConfig::default();
        config.hash_mb = 4;
        run(Cursor::new(script.to_string()), config, buffer.clone()).unwrap();
        buffer.contents()
    }

    #[test]
    fn handshake() {
        let output = session_output("uci\nisready\nquit\n");
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with("id name Pancake"));
        assert!(lines.contains(&"option name Hash type spin default 4 min 1 max 65536"));
        assert_eq!(lines[lines.len() - 2], "uciok");
        assert_eq!(lines[lines.len() - 1], "readyok");
    }

    #[test]
    fn finds_mate_in_one() {
        let output = session_output(
            "position fen 5r1k/p2R4/1pp2p1p/8/5q2/3Q1bN1/PP3P2/6K1 w - - 0 1\ngo depth 2\n",
        );
        assert!(output.contains("score mate 1"));
        assert_eq!(output.lines().last(), Some("bestmove d3h7"));
    }

    #[test]
    fn moves_are_applied_before_searching() {
        // After 1.f3 e5 2.g4 black mates with Qh4.
        let output = session_output("ucinewgame\nposition startpos moves f2f3 e7e5 g2g4\ngo depth 2\n");
        assert_eq!(output.lines().last(), Some("bestmove d8h4"));
    }

    #[test]
    fn bad_input_is_reported_and_the_session_goes_on() {
        let output = session_output(
            "position startpos moves e2e5\nsetoption name Hash value lots\nposition fen 8/8 w\nisready\n",
        );
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "info string illegal move 'e2e5'");
        assert!(lines[1].starts_with("info string malformed command"));
        assert!(lines[2].starts_with("info string invalid fen"));
        assert_eq!(lines[3], "readyok");
    }

    #[test]
    fn quit_cancels_a_running_search() {
        let output = session_output("setoption name Threads value 1\ngo infinite\nquit\n");
        assert_eq!(output.lines().filter(|l| l.starts_with("bestmove ")).count(), 1);
    }

    #[test]
    fn checkmated_root_reports_null_move() {
        let output = session_output("position fen R5k1/5ppp/8/8/8/8/8/6K1 b - - 0 1\ngo movetime 100\n");
        assert_eq!(output, "bestmove 0000\n");
    }
}
