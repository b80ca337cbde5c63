//! End-to-end game scenarios

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use graph_pursuit::agent::{Agent, AgentRegistry, FlagBoard};
use graph_pursuit::core::config::{AgentConfig, FlagConfig, GameConfig};
use graph_pursuit::core::error::{PursuitError, Result};
use graph_pursuit::core::types::{AgentId, NodeId, Team};
use graph_pursuit::engine::{
    initialize_game, ChannelObserver, DecisionOutcome, FallbackReason, GameEventKind, GameLoop,
    GameStateView, LoopState, SnapshotObserver, TerminationReason, TickSnapshot,
};
use graph_pursuit::graph::GraphEnvironment;
use graph_pursuit::record::{GameLog, LogRecord, MemoryLog};
use graph_pursuit::strategy::{
    input_channel, Action, DecisionError, InterceptNearestAttacker, RandomNeighbor,
    ShortestPathToNearestFlag, Strategy, StrategyKind,
};

fn path_graph(n: u32) -> GraphEnvironment {
    let edges: Vec<_> = (0..n - 1).map(|i| (i, i + 1)).collect();
    GraphEnvironment::from_edge_list(0..n, &edges).unwrap()
}

/// Always asks for the same node
#[derive(Debug)]
struct GoTo(NodeId);

impl Strategy for GoTo {
    fn name(&self) -> &str {
        "go_to"
    }

    fn decide(&self, _view: &GameStateView<'_>) -> std::result::Result<Action, DecisionError> {
        Ok(Action::move_to(self.0))
    }
}

fn custom_game(
    graph: GraphEnvironment,
    agents: Vec<Agent>,
    flags: &[FlagConfig],
    config: GameConfig,
) -> GameLoop {
    let mut registry = AgentRegistry::new();
    for agent in agents {
        registry.insert(agent, &graph).unwrap();
    }
    let flags = FlagBoard::new(flags, &graph).unwrap();
    GameLoop::new(Arc::new(config), Arc::new(graph), registry, flags).unwrap()
}

#[test]
fn test_attacker_tags_flag_at_end_of_path() {
    // A - B - C, flag on C, attacker on A
    let mut config = GameConfig::default();
    config.max_time = 10;
    config.agents = vec![AgentConfig::new("red", Team::Attacker, NodeId(0)).with_speed(1)];
    config.flags = vec![FlagConfig::new(NodeId(2), 1.0)];

    let mut game = initialize_game(config, path_graph(3)).unwrap();
    let log = MemoryLog::new();
    game.add_observer(Box::new(log.clone()));

    assert_eq!(game.step(), LoopState::Running);
    assert_eq!(game.registry().get(AgentId(0)).unwrap().position(), NodeId(1));
    assert_eq!(game.payoff(), 0.0);

    assert_eq!(game.step(), LoopState::Running);
    assert_eq!(game.registry().get(AgentId(0)).unwrap().position(), NodeId(2));
    assert_eq!(game.payoff(), 1.0);

    let records = log.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].agent_positions["red"], NodeId(1));
    assert_eq!(records[1].agent_positions["red"], NodeId(2));
    assert_eq!(records[1].payoff, 1.0);
}

#[test]
fn test_colocated_capture_excludes_tag() {
    let graph = path_graph(5);
    let agents = vec![
        Agent::new(AgentId(0), "red_runner", Team::Attacker, NodeId(0))
            .with_strategy(Arc::new(GoTo(NodeId(1)))),
        Agent::new(AgentId(1), "red_idle", Team::Attacker, NodeId(4))
            .with_strategy(Arc::new(GoTo(NodeId(4)))),
        Agent::new(AgentId(2), "blue", Team::Defender, NodeId(2))
            .with_capture_radius(0)
            .with_strategy(Arc::new(GoTo(NodeId(1)))),
    ];
    let mut game = custom_game(
        graph,
        agents,
        &[FlagConfig::new(NodeId(1), 5.0)],
        GameConfig::default(),
    );
    let (tx, rx) = mpsc::channel();
    game.add_observer(Box::new(ChannelObserver::new(tx)));

    assert_eq!(game.step(), LoopState::Running);
    let snapshot = rx.recv().unwrap();

    assert_eq!(snapshot.result.captures.len(), 1);
    assert_eq!(snapshot.result.captures[0].attacker, AgentId(0));
    assert_eq!(snapshot.result.captures[0].defender, AgentId(2));
    assert!(snapshot.result.tags.is_empty());
    assert_eq!(snapshot.result.attackers_remaining, 1);
    assert_eq!(game.registry().count(Team::Attacker), 1);
    assert!(game.registry().get(AgentId(0)).is_none());
    assert_eq!(game.payoff(), 0.0);
}

#[test]
fn test_no_route_falls_back_to_neighbor() {
    // Attacker lives in {0, 1, 2}; the only flag is in {3, 4}
    let graph = GraphEnvironment::from_edge_list(0..5, &[(0, 1), (1, 2), (3, 4)]).unwrap();
    let mut config = GameConfig::default();
    config.agents = vec![AgentConfig::new("red", Team::Attacker, NodeId(1))];
    config.flags = vec![FlagConfig::new(NodeId(4), 1.0)];

    let mut game = initialize_game(config, graph).unwrap();
    let (tx, rx) = mpsc::channel();
    game.add_observer(Box::new(ChannelObserver::new(tx)));

    assert_eq!(game.step(), LoopState::Running);
    let snapshot = rx.recv().unwrap();

    let decision = &snapshot.decisions[0];
    assert!(matches!(
        decision.outcome,
        DecisionOutcome::Fallback {
            reason: FallbackReason::PathNotFound,
            ..
        }
    ));
    let position = game.registry().get(AgentId(0)).unwrap().position();
    assert!(position == NodeId(0) || position == NodeId(2));
    assert!(game.graph().contains(position));
    assert!(snapshot
        .events
        .iter()
        .any(|e| matches!(e.kind, GameEventKind::Fallback { .. })));
}

#[test]
fn test_all_attackers_captured_before_max_time() {
    let graph = path_graph(5);
    let agents = vec![
        Agent::new(AgentId(0), "red", Team::Attacker, NodeId(0)).with_strategy(Arc::new(RandomNeighbor)),
        Agent::new(AgentId(1), "blue", Team::Defender, NodeId(4))
            .with_capture_radius(1)
            .with_strategy(Arc::new(InterceptNearestAttacker)),
    ];
    let mut config = GameConfig::default();
    config.max_time = 100;
    let mut game = custom_game(graph, agents, &[], config);
    let log = MemoryLog::new();
    game.add_observer(Box::new(log.clone()));

    let summary = game.run();
    assert_eq!(summary.reason, TerminationReason::AllAttackersCaptured);
    assert!(summary.ticks < 100);
    assert_eq!(summary.attackers_remaining, 0);
    assert_eq!(summary.total_captures, 1);

    let records = log.records();
    let last = records.last().unwrap();
    assert!(last.is_last);
    assert_eq!(last.reason, Some(TerminationReason::AllAttackersCaptured));
    assert_eq!(records.iter().filter(|r| r.is_last).count(), 1);
    assert!(!last.agent_positions.contains_key("red"));
}

#[test]
fn test_max_time_bounds_the_run() {
    let mut config = GameConfig::default();
    config.max_time = 7;
    config.agents = vec![
        AgentConfig::new("red", Team::Attacker, NodeId(0)).with_strategy(StrategyKind::RandomNeighbor),
    ];

    let mut game = initialize_game(config, GraphEnvironment::grid(4, 4).unwrap()).unwrap();
    let log = MemoryLog::new();
    game.add_observer(Box::new(log.clone()));

    let summary = game.run();
    assert_eq!(summary.reason, TerminationReason::MaxTimeReached);
    assert_eq!(summary.ticks, 7);
    let records = log.records();
    assert_eq!(records.len(), 7);
    assert!(records[6].is_last);
    assert!(records[..6].iter().all(|r| !r.is_last));
}

#[test]
fn test_human_agent_moves_on_input() {
    let mut config = GameConfig::default();
    config.agents = vec![AgentConfig::new("player", Team::Attacker, NodeId(0)).with_strategy(StrategyKind::Human)];

    let mut game = initialize_game(config, path_graph(4)).unwrap();
    let (sender, provider) = input_channel(game.interrupt_handle());
    game.set_input_provider(Arc::new(provider));

    assert!(sender.send(NodeId(1)));
    game.step();
    assert_eq!(game.registry().get(AgentId(0)).unwrap().position(), NodeId(1));

    // Two hops away with speed 1: rejected, fallback picks a neighbor of 1
    assert!(sender.send(NodeId(3)));
    game.step();
    let position = game.registry().get(AgentId(0)).unwrap().position();
    assert!(position == NodeId(0) || position == NodeId(2));
}

#[test]
fn test_interrupt_unblocks_human_wait_and_finalizes_log() {
    let mut config = GameConfig::default();
    config.agents = vec![
        AgentConfig::new("player", Team::Attacker, NodeId(0)).with_strategy(StrategyKind::Human),
    ];

    let mut game = initialize_game(config, path_graph(3)).unwrap();
    let interrupt = game.interrupt_handle();
    // Keep the sender alive so the wait never ends on its own
    let (_sender, provider) = input_channel(interrupt.clone());
    game.set_input_provider(Arc::new(provider.with_poll_interval(Duration::from_millis(5))));
    let log = MemoryLog::new();
    game.add_observer(Box::new(log.clone()));

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        interrupt.interrupt();
    });

    let summary = game.run();
    stopper.join().unwrap();

    assert_eq!(summary.reason, TerminationReason::UserInterrupt);
    let last = log.last().unwrap();
    assert!(last.is_last);
    assert_eq!(last.reason, Some(TerminationReason::UserInterrupt));
    assert_eq!(last.agent_positions["player"], NodeId(0));
}

/// Reports an interrupt that nobody raised
#[derive(Debug)]
struct FalseInterrupt;

impl Strategy for FalseInterrupt {
    fn name(&self) -> &str {
        "false_interrupt"
    }

    fn decide(&self, _view: &GameStateView<'_>) -> std::result::Result<Action, DecisionError> {
        Err(DecisionError::Interrupted)
    }
}

#[test]
fn test_strategy_reporting_interrupt_does_not_end_game() {
    let agents = vec![
        Agent::new(AgentId(0), "liar", Team::Attacker, NodeId(0)).with_strategy(Arc::new(FalseInterrupt)),
        Agent::new(AgentId(1), "walker", Team::Attacker, NodeId(15)).with_strategy(Arc::new(RandomNeighbor)),
    ];
    let mut config = GameConfig::default();
    config.max_time = 10;
    let mut game = custom_game(GraphEnvironment::grid(4, 4).unwrap(), agents, &[], config);
    let (tx, rx) = mpsc::channel();
    game.add_observer(Box::new(ChannelObserver::new(tx)));

    let summary = game.run();
    assert_eq!(summary.reason, TerminationReason::MaxTimeReached);
    assert_eq!(summary.ticks, 10);
    assert!(!game.interrupt_handle().is_interrupted());

    let first = rx.try_iter().next().unwrap();
    assert!(matches!(
        first.decisions[0].outcome,
        DecisionOutcome::Fallback {
            reason: FallbackReason::DecisionFailure,
            ..
        }
    ));
    assert_eq!(first.decisions[1].outcome, DecisionOutcome::Accepted);
    assert_ne!(first.decisions[1].target, NodeId(15));
}

#[test]
fn test_human_without_provider_uses_fallback() {
    let mut config = GameConfig::default();
    config.agents = vec![AgentConfig::new("player", Team::Attacker, NodeId(1)).with_strategy(StrategyKind::Human)];

    let mut game = initialize_game(config, path_graph(3)).unwrap();
    let (tx, rx) = mpsc::channel();
    game.add_observer(Box::new(ChannelObserver::new(tx)));
    game.step();

    let snapshot = rx.recv().unwrap();
    assert!(matches!(
        snapshot.decisions[0].outcome,
        DecisionOutcome::Fallback {
            reason: FallbackReason::NoDecision,
            ..
        }
    ));
}

/// Observer that breaks on a given tick
struct FailOnTick(u64);

impl SnapshotObserver for FailOnTick {
    fn on_snapshot(&mut self, snapshot: &Arc<TickSnapshot>) -> Result<()> {
        if snapshot.tick == self.0 {
            return Err(PursuitError::Observer("sink unavailable".into()));
        }
        Ok(())
    }
}

#[test]
fn test_unhandled_error_still_writes_final_record() {
    let mut config = GameConfig::default();
    config.agents = vec![
        AgentConfig::new("red", Team::Attacker, NodeId(0)).with_strategy(StrategyKind::RandomNeighbor),
    ];

    let mut game = initialize_game(config, GraphEnvironment::grid(3, 3).unwrap()).unwrap();
    game.add_observer(Box::new(FailOnTick(3)));
    let log = MemoryLog::new();
    game.add_observer(Box::new(log.clone()));

    let summary = game.run();
    assert_eq!(summary.reason, TerminationReason::UnhandledError);
    assert_eq!(summary.ticks, 3);

    let records = log.records();
    let last = records.last().unwrap();
    assert!(last.is_last);
    assert_eq!(last.reason, Some(TerminationReason::UnhandledError));
    assert_eq!(records.iter().filter(|r| r.is_last).count(), 1);
}

#[test]
fn test_same_seed_same_game() {
    let scenario = || {
        let mut config = GameConfig::default();
        config.max_time = 40;
        config.seed = 99;
        config.defender.capture_radius = 1;
        config.agents = vec![
            AgentConfig::new("red_0", Team::Attacker, NodeId(0)).with_strategy(StrategyKind::RandomNeighbor),
            AgentConfig::new("red_1", Team::Attacker, NodeId(5)),
            AgentConfig::new("blue_0", Team::Defender, NodeId(35)),
        ];
        config.flags = vec![FlagConfig::new(NodeId(30), 2.0), FlagConfig::new(NodeId(5), 0.5)];
        config
    };

    let play = |config: GameConfig| {
        let mut game = initialize_game(config, GraphEnvironment::grid(6, 6).unwrap()).unwrap();
        let log = MemoryLog::new();
        game.add_observer(Box::new(log.clone()));
        let summary = game.run();
        let trace: Vec<_> = log
            .records()
            .into_iter()
            .map(|r| (r.time, r.payoff, r.agent_positions))
            .collect();
        (summary, trace)
    };

    assert_eq!(play(scenario()), play(scenario()));

    // Forcing the parallel decision path must not change anything
    let mut parallel = scenario();
    parallel.parallel_threshold = 1;
    assert_eq!(play(scenario()), play(parallel));
}

#[test]
fn test_toml_scenario_runs_to_completion() {
    let toml = r#"
        max_time = 30
        seed = 3

        [defender]
        capture_radius = 1

        [[agents]]
        name = "red"
        team = "attacker"
        start = 0

        [[agents]]
        name = "blue"
        team = "defender"
        start = 24

        [[flags]]
        node = 20
        weight = 1.0
        consumption = "single_use"
    "#;

    let config = GameConfig::from_toml_str(toml).unwrap();
    let mut game = initialize_game(config, GraphEnvironment::grid(5, 5).unwrap()).unwrap();
    let summary = game.run();

    assert!(summary.ticks <= 30);
    assert!(game.state().is_terminated());
    // A single-use flag pays out at most once
    assert!(summary.total_tags <= 1);
    assert!(summary.payoff <= 1.0);
}

#[test]
fn test_game_log_file_has_one_terminal_record() {
    let path = std::env::temp_dir().join(format!("graph_pursuit_{}.jsonl", uuid::Uuid::new_v4()));

    let mut config = GameConfig::default();
    config.max_time = 5;
    config.agents = vec![AgentConfig::new("red", Team::Attacker, NodeId(0))];
    let mut game = initialize_game(config, path_graph(4)).unwrap();
    game.add_observer(Box::new(GameLog::create(&path).unwrap()));
    game.run();

    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();
    let records: Vec<LogRecord> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.run_id == records[0].run_id));
    assert_eq!(records.iter().filter(|r| r.is_last).count(), 1);
    assert!(records[4].is_last);
}

#[test]
fn test_shortest_path_strategy_used_by_default() {
    let mut config = GameConfig::default();
    config.agents = vec![AgentConfig::new("red", Team::Attacker, NodeId(0))];
    let game = initialize_game(config, path_graph(2)).unwrap();
    let agent = game.registry().get(AgentId(0)).unwrap();
    assert_eq!(
        agent.strategy.as_ref().unwrap().name(),
        ShortestPathToNearestFlag.name()
    );
}
