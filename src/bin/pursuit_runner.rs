//! Headless Pursuit Runner
//!
//! Plays one scenario over a range of seeds and prints one JSON line per
//! run, for batch evaluation of strategies.

use std::path::PathBuf;

use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;

use graph_pursuit::core::config::{AgentConfig, FlagConfig, GameConfig};
use graph_pursuit::core::types::{NodeId, Team};
use graph_pursuit::engine::{initialize_game, GameSummary};
use graph_pursuit::graph::GraphEnvironment;
use graph_pursuit::strategy::StrategyKind;

/// Headless Pursuit Runner - batch games over many seeds
#[derive(Parser, Debug)]
#[command(name = "pursuit_runner")]
#[command(about = "Run many seeded pursuit games and output JSON results")]
struct Args {
    /// Scenario file (TOML); a random-walk scenario is used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grid width in nodes
    #[arg(long, default_value_t = 20)]
    width: u32,

    /// Grid height in nodes
    #[arg(long, default_value_t = 20)]
    height: u32,

    /// Number of runs
    #[arg(long, default_value_t = 10)]
    runs: u64,

    /// First seed; run i uses seed + i
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Maximum ticks per run
    #[arg(long)]
    max_time: Option<u64>,

    /// Enable info-level engine logging on stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output line
#[derive(Serialize)]
struct RunResult {
    seed: u64,
    #[serde(flatten)]
    summary: Option<GameSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() {
    let args = Args::parse();

    let filter = if args.verbose {
        "graph_pursuit=info"
    } else {
        "graph_pursuit=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let width = args.width.max(2);
    let height = args.height.max(2);

    let graph = match GraphEnvironment::grid(width, height) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("Cannot build a {}x{} grid: {}", width, height, e);
            std::process::exit(1);
        }
    };

    let base = match &args.config {
        Some(path) => match GameConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load scenario '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => default_scenario(width, height),
    };

    // Runs are independent; results are still printed in seed order
    let results: Vec<RunResult> = (0..args.runs)
        .into_par_iter()
        .map(|i| {
            let seed = args.seed.wrapping_add(i);
            let mut config = base.clone();
            config.seed = seed;
            if let Some(max_time) = args.max_time {
                config.max_time = max_time;
            }
            match initialize_game(config, graph.clone()) {
                Ok(mut game) => RunResult {
                    seed,
                    summary: Some(game.run()),
                    error: None,
                },
                Err(e) => RunResult {
                    seed,
                    summary: None,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect();

    for result in &results {
        match serde_json::to_string(result) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("Failed to serialize run {}: {}", result.seed, e),
        }
    }
}

/// Random-walking attackers against interceptors, flags along the far edge
fn default_scenario(width: u32, height: u32) -> GameConfig {
    let node = |x: u32, y: u32| NodeId(y * width + x);

    let mut config = GameConfig::default();
    config.max_time = 500;
    config.attacker.strategy = Some(StrategyKind::RandomNeighbor);
    config.defender.capture_radius = 1;
    config.agents = (0..3)
        .map(|i| AgentConfig::new(format!("red_{}", i), Team::Attacker, node(i.min(width - 1), 0)))
        .chain((0..2).map(|i| {
            AgentConfig::new(
                format!("blue_{}", i),
                Team::Defender,
                node((width - 1) * i, height / 2),
            )
        }))
        .collect();
    config.flags = (0..width)
        .step_by(((width / 4).max(1)) as usize)
        .map(|x| FlagConfig::new(node(x, height - 1), 1.0))
        .collect();
    config
}
