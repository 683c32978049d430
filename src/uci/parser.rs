// src/uci/parser.rs

use crate::error::UciError;
use crate::game::search::time::TimeControl;
use crate::game::search::SearchLimits;
use shakmaty::Color;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Uci,
    IsReady,
    UciNewGame,
    /// `fen` is `None` for `startpos`.
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    Go(GoParams),
    Stop,
    SetOption {
        name: String,
        value: Option<String>,
    },
    Quit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    pub depth: Option<u8>,
    pub nodes: Option<u64>,
    pub movetime: Option<u64>,
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u32>,
    pub infinite: bool,
}

impl GoParams {
    /// Limits for the side to move. A fixed move time wins over the clock;
    /// `infinite` drops every time limit.
    pub fn limits(&self, side: Color, overhead: Duration) -> SearchLimits {
        let (remaining, increment) = match side {
            Color::White => (self.wtime, self.winc),
            Color::Black => (self.btime, self.binc),
        };
        let time = if self.infinite {
            TimeControl::Infinite
        } else if let Some(ms) = self.movetime {
            TimeControl::MoveTime(Duration::from_millis(ms))
        } else if let Some(ms) = remaining {
            TimeControl::Clock {
                remaining: Duration::from_millis(ms),
                increment: Duration::from_millis(increment.unwrap_or(0)),
                moves_to_go: self.movestogo,
            }
        } else {
            TimeControl::Infinite
        };
        SearchLimits {
            depth: self.depth,
            nodes: self.nodes,
            time,
            move_overhead: overhead,
        }
    }
}

/// Parses one input line. Empty lines and commands this engine does not
/// know give `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, UciError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, rest)) = parts.split_first() else {
        return Ok(None);
    };

    let command = match head {
        "uci" => Command::Uci,
        "isready" => Command::IsReady,
        "ucinewgame" => Command::UciNewGame,
        "stop" => Command::Stop,
        "quit" => Command::Quit,
        "position" => parse_position(rest)?,
        "go" => Command::Go(parse_go(rest)?),
        "setoption" => parse_setoption(rest)?,
        _ => return Ok(None),
    };
    Ok(Some(command))
}

fn parse_position(parts: &[&str]) -> Result<Command, UciError> {
    let moves_at = parts.iter().position(|&p| p == "moves");
    let setup = &parts[..moves_at.unwrap_or(parts.len())];

    let fen = match setup.split_first() {
        Some((&"startpos", [])) => None,
        Some((&"fen", fields)) if !fields.is_empty() => Some(fields.join(" ")),
        _ => return Err(UciError::Malformed(format!("position {}", parts.join(" ")))),
    };
    let moves = moves_at
        .map(|at| parts[at + 1..].iter().map(|&s| s.to_string()).collect())
        .unwrap_or_default();

    Ok(Command::Position { fen, moves })
}

fn value<T: FromStr>(key: &str, value: Option<&&str>) -> Result<T, UciError> {
    let raw = value.ok_or_else(|| UciError::Malformed(format!("go {key} requires a value")))?;
    raw.parse()
        .map_err(|_| UciError::Malformed(format!("invalid {key} value: {raw}")))
}

fn parse_go(parts: &[&str]) -> Result<GoParams, UciError> {
    let mut params = GoParams::default();
    let mut tokens = parts.iter();

    while let Some(&token) = tokens.next() {
        match token {
            "infinite" => params.infinite = true,
            "depth" => params.depth = Some(value(token, tokens.next())?),
            "nodes" => params.nodes = Some(value(token, tokens.next())?),
            "movetime" => params.movetime = Some(value(token, tokens.next())?),
            "wtime" => params.wtime = Some(value(token, tokens.next())?),
            "btime" => params.btime = Some(value(token, tokens.next())?),
            "winc" => params.winc = Some(value(token, tokens.next())?),
            "binc" => params.binc = Some(value(token, tokens.next())?),
            "movestogo" => params.movestogo = Some(value(token, tokens.next())?),
            // ponder, searchmoves, mate: not supported, skipped
            _ => {}
        }
    }
    Ok(params)
}

fn parse_setoption(parts: &[&str]) -> Result<Command, UciError> {
    if parts.first() != Some(&"name") || parts.len() < 2 {
        return Err(UciError::Malformed(format!("setoption {}", parts.join(" "))));
    }
    let value_at = parts.iter().position(|&p| p == "value");
    let name = parts[1..value_at.unwrap_or(parts.len())].join(" ");
    let value = value_at
        .map(|at| parts[at + 1..].join(" "))
        .filter(|v| !v.is_empty());
    Ok(Command::SetOption { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        parse_command(line).unwrap().unwrap()
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse("uci"), Command::Uci);
        assert_eq!(parse("  isready "), Command::IsReady);
        assert_eq!(parse("ucinewgame"), Command::UciNewGame);
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("ponderhit").unwrap(), None);
    }

    #[test]
    fn position_commands() {
        assert_eq!(
            parse("position startpos moves e2e4 e7e5"),
            Command::Position {
                fen: None,
                moves: vec!["e2e4".into(), "e7e5".into()],
            }
        );
        assert_eq!(
            parse("position fen 4k3/8/8/8/8/8/8/4K2R w K - 0 1 moves e1g1"),
            Command::Position {
                fen: Some("4k3/8/8/8/8/8/8/4K2R w K - 0 1".into()),
                moves: vec!["e1g1".into()],
            }
        );
        assert!(parse_command("position").is_err());
        assert!(parse_command("position fen").is_err());
        assert!(parse_command("position startpos e2e4").is_err());
    }

    #[test]
    fn go_parameters() {
        let Command::Go(params) = parse("go wtime 60000 btime 55000 winc 1000 binc 1000 movestogo 20 ponder") else {
            panic!("not a go command");
        };
        assert_eq!(params.wtime, Some(60_000));
        assert_eq!(params.binc, Some(1_000));
        assert_eq!(params.movestogo, Some(20));
        assert!(!params.infinite);

        assert!(matches!(parse_command("go depth x"), Err(UciError::Malformed(_))));
        assert!(matches!(parse_command("go nodes"), Err(UciError::Malformed(_))));
    }

    #[test]
    fn setoption_names_may_contain_spaces() {
        assert_eq!(
            parse("setoption name Move Overhead value 100"),
            Command::SetOption {
                name: "Move Overhead".into(),
                value: Some("100".into()),
            }
        );
        assert_eq!(
            parse("setoption name Clear Hash"),
            Command::SetOption {
                name: "Clear Hash".into(),
                value: None,
            }
        );
        assert!(parse_command("setoption Hash 10").is_err());
    }

    #[test]
    fn limits_for_the_side_to_move() {
        let params = GoParams {
            wtime: Some(60_000),
            btime: Some(30_000),
            binc: Some(500),
            depth: Some(12),
            ..Default::default()
        };
        let overhead = Duration::from_millis(30);
        let black = params.limits(Color::Black, overhead);
        assert_eq!(
            black.time,
            TimeControl::Clock {
                remaining: Duration::from_millis(30_000),
                increment: Duration::from_millis(500),
                moves_to_go: None,
            }
        );
        assert_eq!(black.depth, Some(12));
        assert_eq!(black.move_overhead, overhead);

        let fixed = GoParams {
            movetime: Some(250),
            ..params.clone()
        };
        assert_eq!(
            fixed.limits(Color::White, overhead).time,
            TimeControl::MoveTime(Duration::from_millis(250))
        );

        let infinite = GoParams {
            infinite: true,
            ..fixed
        };
        assert_eq!(infinite.limits(Color::White, overhead).time, TimeControl::Infinite);
        assert_eq!(GoParams::default().limits(Color::White, overhead).time, TimeControl::Infinite);
    }
}
