// src/event/mod.rs

//! Engine output. The worker publishes events; a single printer thread owns
//! stdout so protocol lines never interleave.

use crate::game::moves::EncodedMove;
use crate::game::search::score::uci_score;
use crate::game::search::{pv_string, IterationInfo, SearchResult};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fmt;
use std::io::{self, Write};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// One `info` line, built from a completed iteration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InfoLine {
    pub depth: u8,
    pub seldepth: usize,
    pub score: String,
    pub nodes: u64,
    pub nps: u64,
    pub time_ms: u64,
    pub hashfull: usize,
    pub pv: String,
}

impl From<&IterationInfo<'_>> for InfoLine {
    fn from(info: &IterationInfo<'_>) -> Self {
        let time_ms = info.elapsed.as_millis() as u64;
        InfoLine {
            depth: info.depth,
            seldepth: info.seldepth,
            score: uci_score(info.score),
            nodes: info.nodes,
            nps: info.nodes * 1000 / time_ms.max(1),
            time_ms,
            hashfull: info.hashfull,
            pv: pv_string(info.pv),
        }
    }
}

/// Everything the engine prints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A raw protocol line (`id`, `option`, `uciok`, `readyok`).
    Protocol(String),
    Info(InfoLine),
    /// `None` when the root had no legal move.
    BestMove(Option<String>),
    /// Shown to the GUI as `info string`.
    Message(String),
}

impl Event {
    pub fn best_move(result: &SearchResult) -> Self {
        Event::BestMove(result.best_move().map(EncodedMove::to_uci))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Protocol(line) => write!(f, "{line}"),
            Event::Info(info) => {
                write!(
                    f,
                    "info depth {} seldepth {} score {} nodes {} nps {} time {} hashfull {}",
                    info.depth, info.seldepth, info.score, info.nodes, info.nps, info.time_ms, info.hashfull
                )?;
                if !info.pv.is_empty() {
                    write!(f, " pv {}", info.pv)?;
                }
                Ok(())
            }
            Event::BestMove(Some(mv)) => write!(f, "bestmove {mv}"),
            Event::BestMove(None) => write!(f, "bestmove 0000"),
            Event::Message(text) => write!(f, "info string {text}"),
        }
    }
}

pub struct EventBroker {
    sender: Sender<Event>,
    receiver: Receiver<Event>,
}

impl EventBroker {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn publisher(&self) -> Publisher {
        Publisher(self.sender.clone())
    }

    /// Spawns the printer. It runs until every publisher, this broker
    /// included, has been dropped.
    pub fn spawn_printer<W: Write + Send + 'static>(self, mut out: W) -> io::Result<JoinHandle<()>> {
        let EventBroker { sender, receiver } = self;
        drop(sender);
        thread::Builder::new().name("uci-output".to_string()).spawn(move || {
            for event in receiver {
                debug!(%event, "output");
                if let Err(e) = writeln!(out, "{event}").and_then(|_| out.flush()) {
                    warn!("cannot write engine output: {e}");
                    return;
                }
            }
        })
    }
}

impl Default for EventBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable sending half handed to the worker and the protocol loop.
#[derive(Clone)]
pub struct Publisher(Sender<Event>);

impl Publisher {
    pub fn publish(&self, event: Event) {
        // The printer only goes away at shutdown.
        let _ = self.0.send(event);
    }
}


#[cfg(test)]
pub(crate) use tests::SharedBuffer;
