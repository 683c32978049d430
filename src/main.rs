mod config;
mod constants;
mod error;
mod event;
mod game;
mod sts;
mod uci;
mod worker;

use clap::{Parser, Subcommand};
use config::EngineConfig;
use game::board::Board;
use game::evaluation::ClassicalEvaluator;
use game::search::score::uci_score;
use game::search::{pv_string, Engine, IterationInfo, SearchLimits};
use game::GameState;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Transposition table size in megabytes
    #[arg(long)]
    hash: Option<usize>,

    /// Search threads (Lazy SMP)
    #[arg(long)]
    threads: Option<usize>,

    /// Log filter, e.g. `info` or `pancake=debug`. Falls back to RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// Load engine settings from profiles/<name>.json
    #[arg(long)]
    profile: Option<String>,

    /// Save the effective settings to profiles/<name>.json and exit
    #[arg(long)]
    save_profile: Option<String>,

    /// List saved profiles and exit
    #[arg(long)]
    list_profiles: bool,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Speak UCI on stdin/stdout (the default)
    Uci,
    /// Search a single position and print the result
    Search {
        #[arg(long)]
        fen: Option<String>,
        #[arg(long)]
        depth: Option<u8>,
        /// Milliseconds
        #[arg(long)]
        movetime: Option<u64>,
        #[arg(long)]
        nodes: Option<u64>,
    },
    /// Run an EPD suite and print a JSON summary
    Bench {
        #[arg(long)]
        epd: PathBuf,
        #[arg(long)]
        depth: Option<u8>,
    },
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    std::panic::set_hook(Box::new(tracing_panic::panic_hook));
}

fn effective_config(args: &Args) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let profiles = Path::new(config::PROFILES_DIR);
    let mut config = match &args.profile {
        Some(name) => config::load_profile(profiles, name)?,
        None => EngineConfig::default(),
    };
    if let Some(hash) = args.hash {
        config.hash_mb = hash;
    }
    if let Some(threads) = args.threads {
        config.search.threads = threads.max(1);
    }
    Ok(config)
}

fn search_once(
    config: &EngineConfig,
    fen: Option<&str>,
    depth: Option<u8>,
    movetime: Option<u64>,
    nodes: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let game = match fen {
        Some(fen) => GameState::from_fen(fen)?,
        None => GameState::new(),
    };
    let mut board = game.board().clone();
    let mut limits = match movetime {
        Some(ms) => SearchLimits::movetime(Duration::from_millis(ms)),
        None => SearchLimits::default(),
    };
    limits.nodes = nodes;
    limits.move_overhead = config.move_overhead();
    limits.depth = match (depth, movetime, nodes) {
        (None, None, None) => Some(config.default_depth),
        _ => depth,
    };

    let mut engine = Engine::new(
        config.search.clone(),
        ClassicalEvaluator::new(config.weights),
        config.hash_mb,
    );
    let mut print = |info: &IterationInfo<'_>| {
        println!(
            "depth {:>2} score {:>9} nodes {:>10} time {:>6} pv {}",
            info.depth,
            uci_score(info.score),
            info.nodes,
            info.elapsed.as_millis(),
            pv_string(info.pv)
        );
    };
    let result = engine.search(&mut board, &limits, &mut print)?;
    match result.best_move() {
        Some(mv) => println!("bestmove {mv} score {}", uci_score(result.score)),
        None => println!("no legal move: {:?} in {}", result.root_status, board.fen()),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    let config = effective_config(&args)?;
    let profiles = Path::new(config::PROFILES_DIR);
    if args.list_profiles {
        for name in config::get_profiles(profiles)? {
            println!("{name}");
        }
        return Ok(());
    }
    if let Some(name) = &args.save_profile {
        config::save_profile(profiles, name, &config)?;
        return Ok(());
    }
    info!(?config, "starting");

    match args.command.unwrap_or(Mode::Uci) {
        Mode::Uci => {
            let stdin = io::stdin();
            uci::run(stdin.lock(), config, BufWriter::new(io::stdout()))?;
        }
        Mode::Search {
            fen,
            depth,
            movetime,
            nodes,
        } => search_once(&config, fen.as_deref(), depth, movetime, nodes)?,
        Mode::Bench { epd, depth } => {
            let depth = depth.unwrap_or(config.default_depth);
            let mut runner = sts::StsRunner::new(&config, depth);
            let result = runner.run_file(&epd)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}
