//! Graph Pursuit - Entry Point
//!
//! Builds a grid world, loads a scenario (or a small default one), wires
//! Ctrl-C to the loop's interrupt handle and runs to termination. Agents
//! configured as `human` read target node ids from stdin.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use tokio::runtime::Runtime;

use graph_pursuit::core::config::{AgentConfig, FlagConfig, GameConfig};
use graph_pursuit::core::error::Result;
use graph_pursuit::core::types::{NodeId, Team};
use graph_pursuit::engine::initialize_game;
use graph_pursuit::graph::GraphEnvironment;
use graph_pursuit::record::GameLog;
use graph_pursuit::strategy::{input_channel, InputSender, StrategyKind};

/// Pursuit-evasion simulation on a grid graph
#[derive(Parser, Debug)]
#[command(name = "graph-pursuit")]
#[command(about = "Run an attacker/defender pursuit game on a grid graph")]
struct Args {
    /// Scenario file (TOML); a built-in scenario is used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grid width in nodes
    #[arg(long, default_value_t = 10)]
    width: u32,

    /// Grid height in nodes
    #[arg(long, default_value_t = 10)]
    height: u32,

    /// Override the scenario's tick bound
    #[arg(long)]
    max_time: Option<u64>,

    /// Override the scenario's seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write the JSON-lines game log here
    #[arg(long)]
    log: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        "graph_pursuit=debug"
    } else {
        "graph_pursuit=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let width = args.width.max(2);
    let height = args.height.max(2);

    // Built first so the default scenario's node arithmetic stays in range
    let graph = GraphEnvironment::grid(width, height)?;

    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => default_scenario(width, height),
    };
    if let Some(max_time) = args.max_time {
        config.max_time = max_time;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let has_human = config.agents.iter().any(|a| {
        a.strategy.or(config.team_defaults(a.team).strategy) == Some(StrategyKind::Human)
    });

    let mut game = initialize_game(config, graph)?;

    if let Some(path) = &args.log {
        let log = GameLog::create(path)?;
        tracing::info!("Logging run {} to {}", log.run_id(), path.display());
        game.add_observer(Box::new(log));
    }

    let interrupt = game.interrupt_handle();
    if has_human {
        let (sender, provider) = input_channel(interrupt.clone());
        game.set_input_provider(Arc::new(provider));
        spawn_stdin_reader(sender);
        println!("Enter a target node id for each human agent when prompted.");
    }

    // Ctrl-C only raises the interrupt flag; the loop exits on its own
    let rt = Runtime::new()?;
    let ctrl_c = interrupt.clone();
    rt.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, stopping");
            ctrl_c.interrupt();
        }
    });

    let summary = game.run();
    println!("{}", serde_json::to_string_pretty(&summary)?);

    rt.shutdown_background();
    Ok(())
}

/// Feed stdin lines to the human input channel until either side closes
fn spawn_stdin_reader(sender: InputSender) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match line.trim().parse::<u32>() {
                Ok(id) => {
                    if !sender.send(NodeId(id)) {
                        break;
                    }
                }
                Err(_) => eprintln!("Not a node id: '{}'", line.trim()),
            }
        }
    });
}

/// Two attackers in one corner, a defender in the middle, flags opposite
fn default_scenario(width: u32, height: u32) -> GameConfig {
    let corner = |x: u32, y: u32| NodeId(y * width + x);

    let mut config = GameConfig::default();
    config.max_time = 200;
    config.defender.capture_radius = 1;
    config.agents = vec![
        AgentConfig::new("red_1", Team::Attacker, corner(0, 0)),
        AgentConfig::new("red_2", Team::Attacker, corner(1, 0)),
        AgentConfig::new("blue_1", Team::Defender, corner(width / 2, height / 2)),
    ];
    config.flags = vec![
        FlagConfig::new(corner(width - 1, height - 1), 3.0),
        FlagConfig::new(corner(0, height - 1), 1.0),
    ];
    config
}
