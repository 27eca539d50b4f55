//! Tengen - GTP front-end for the dual-tree MCTS engine.
//!
//! A long-running process that:
//! 1. Speaks GTP on stdin/stdout (logs go to stderr)
//! 2. Runs the strong and nominal search trees for every generated move
//! 3. Ponders in the background between commands

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use mcts::{EvalClient, Evaluator, Search, SearchConfig, StrengthControl, UniformEvaluator};
use tracing::{info, warn};

mod gtp;
mod input;
mod sgf;

use crate::gtp::GtpServer;
use crate::input::InputQueue;

/// GTP engine with strength control.
#[derive(Parser, Debug)]
#[command(name = "tengen", version, about)]
struct Args {
    /// Weights file for the strong tree.
    #[arg(short = 'w', long)]
    weights: Option<String>,

    /// Weights file for the nominal tree (defaults to the strong weights).
    #[arg(long)]
    nominal_weights: Option<String>,

    /// Worker threads per search (0 = auto).
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Visit limit per move (0 = unlimited).
    #[arg(short = 'v', long)]
    visits: Option<u32>,

    /// Playout limit per move (0 = unlimited).
    #[arg(short = 'p', long)]
    playouts: Option<u32>,

    /// RNG seed (0 = from entropy).
    #[arg(short = 's', long)]
    seed: Option<u64>,

    /// Mix Dirichlet noise into root priors (self-play).
    #[arg(long)]
    noise: bool,

    /// Disable pondering between moves.
    #[arg(long)]
    noponder: bool,
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // Protocol owns stdout; all diagnostics go to stderr.
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(feature = "onnx")]
fn build_evaluator(weights: Option<&str>) -> Result<Arc<dyn Evaluator>> {
    use anyhow::Context;

    match weights {
        Some(path) => {
            let net = mcts::OnnxEvaluator::load(path)
                .with_context(|| format!("loading weights from {path}"))?;
            info!(path, "loaded network");
            Ok(Arc::new(net))
        }
        None => {
            warn!("no weights configured, using the uniform stub evaluator");
            Ok(Arc::new(UniformEvaluator::new()))
        }
    }
}

#[cfg(not(feature = "onnx"))]
fn build_evaluator(weights: Option<&str>) -> Result<Arc<dyn Evaluator>> {
    if let Some(path) = weights {
        warn!(
            path,
            "built without the onnx feature; ignoring weights and using the uniform stub"
        );
    }
    Ok(Arc::new(UniformEvaluator::new()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = engine_config::load_config();
    init_tracing(&config.common.log_level);

    let seed = match args.seed.unwrap_or(config.search.rng_seed) {
        0 => {
            let entropy = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0x5eed);
            entropy ^ std::process::id() as u64
        }
        seed => seed,
    };

    let search_cfg = SearchConfig {
        threads: args.threads.unwrap_or(config.search.threads),
        noise: args.noise || config.search.noise,
        random_moves: config.search.random_moves,
        resign_percent: config.search.resign_percent,
        seed,
        ..SearchConfig::default()
    }
    .with_visits(args.visits.unwrap_or(config.search.visits))
    .with_playouts(args.playouts.unwrap_or(config.search.playouts));

    info!(
        threads = search_cfg.effective_threads(),
        visits = search_cfg.max_visits,
        seed,
        "engine starting"
    );

    let strong_weights = args
        .weights
        .or_else(|| match config.strength.strong_weights.as_str() {
            "" => None,
            path => Some(path.to_string()),
        });
    let nominal_weights = args
        .nominal_weights
        .or_else(|| match config.strength.nominal_weights.as_str() {
            "" => None,
            path => Some(path.to_string()),
        })
        .or_else(|| strong_weights.clone());

    let strong_net = build_evaluator(strong_weights.as_deref())?;
    let nominal_net = build_evaluator(nominal_weights.as_deref())?;

    // Cache capacities are provisional; the memory governor resizes them
    // during server construction.
    let strong = Search::new(EvalClient::new(strong_net, 50_000), search_cfg.clone());
    let nominal = Search::new(EvalClient::new(nominal_net, 50_000), search_cfg);
    let engine = StrengthControl::new(strong, nominal, config.strength.opening_moves);

    let mut server_config = config;
    if args.noponder {
        server_config.search.pondering = false;
    }

    let stdout = std::io::stdout();
    let mut server = GtpServer::new(stdout, engine, &server_config)?;
    let input = InputQueue::spawn_stdin();
    server.run(&input)
}
