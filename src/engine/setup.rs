//! Game initialization from configuration

use std::sync::Arc;

use crate::agent::{Agent, AgentRegistry, ExtensionParams, FlagBoard};
use crate::core::config::GameConfig;
use crate::core::error::Result;
use crate::core::types::AgentId;
use crate::engine::game_loop::GameLoop;
use crate::graph::GraphEnvironment;
use crate::strategy::StrategyKind;

/// Build the registry, flags and loop for one run
///
/// Agents get ids in configuration order. Team defaults fill in anything an
/// agent does not override. Start or flag nodes missing from the graph
/// abort here with `MalformedEnvironment`, before any tick runs.
pub fn initialize_game(config: GameConfig, graph: GraphEnvironment) -> Result<GameLoop> {
    config.validate()?;

    let mut registry = AgentRegistry::new();
    for (index, entry) in config.agents.iter().enumerate() {
        let defaults = config.team_defaults(entry.team);
        let kind = entry
            .strategy
            .or(defaults.strategy)
            .unwrap_or_else(|| StrategyKind::default_for(entry.team));

        let mut agent = Agent::new(AgentId(index as u32), entry.name.clone(), entry.team, entry.start)
            .with_speed(entry.speed.unwrap_or(defaults.speed))
            .with_capture_radius(entry.capture_radius.unwrap_or(defaults.capture_radius))
            .with_sensors(entry.sensors.clone().unwrap_or_else(|| defaults.sensors.clone()))
            .with_params(ExtensionParams::from_map(entry.params.clone())?);
        if let Some(strategy) = kind.build() {
            agent = agent.with_strategy(strategy);
        }

        tracing::debug!(
            "Agent '{}' ({}) {:?} at {} using {:?}",
            agent.name,
            agent.id,
            agent.team,
            agent.position(),
            kind
        );
        registry.insert(agent, &graph)?;
    }

    let flags = FlagBoard::new(&config.flags, &graph)?;

    tracing::info!(
        "Initialized game: {} agents, {} flags, {} nodes, max_time {}",
        registry.len(),
        flags.len(),
        graph.node_count(),
        config.max_time
    );

    GameLoop::new(Arc::new(config), Arc::new(graph), registry, flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{AgentConfig, FlagConfig};
    use crate::core::error::PursuitError;
    use crate::core::types::{NodeId, Team};
    use crate::sensor::SensorKind;

    fn config() -> GameConfig {
        let mut config = GameConfig::default();
        config.defender.capture_radius = 2;
        config.agents = vec![
            AgentConfig::new("red", Team::Attacker, NodeId(0)).with_speed(2),
            AgentConfig::new("blue", Team::Defender, NodeId(8)),
            AgentConfig::new("player", Team::Attacker, NodeId(1))
                .with_strategy(StrategyKind::Human)
                .with_sensors(vec![SensorKind::Neighbor]),
        ];
        config.flags = vec![FlagConfig::new(NodeId(4), 1.0)];
        config
    }

    #[test]
    fn test_team_defaults_and_overrides() {
        let game = initialize_game(config(), GraphEnvironment::grid(3, 3).unwrap()).unwrap();
        let registry = game.registry();

        let red = registry.get(AgentId(0)).unwrap();
        assert_eq!(red.speed, 2);
        assert_eq!(red.capture_radius, 0);
        assert_eq!(red.strategy.as_ref().unwrap().name(), "shortest_path_to_nearest_flag");

        let blue = registry.get(AgentId(1)).unwrap();
        assert_eq!(blue.speed, 1);
        assert_eq!(blue.capture_radius, 2);
        assert_eq!(blue.strategy.as_ref().unwrap().name(), "intercept_nearest_attacker");

        let player = registry.get(AgentId(2)).unwrap();
        assert!(player.strategy.is_none());
        assert_eq!(player.sensors, vec![SensorKind::Neighbor]);
    }

    #[test]
    fn test_unknown_start_node_is_malformed() {
        let mut config = config();
        config.agents[1].start = NodeId(99);
        let err = initialize_game(config, GraphEnvironment::grid(3, 3).unwrap()).err().unwrap();
        assert!(matches!(err, PursuitError::MalformedEnvironment(_)));
    }

    #[test]
    fn test_unknown_flag_node_is_malformed() {
        let mut config = config();
        config.flags.push(FlagConfig::new(NodeId(50), 2.0));
        let err = initialize_game(config, GraphEnvironment::grid(3, 3).unwrap()).err().unwrap();
        assert!(matches!(err, PursuitError::MalformedEnvironment(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = config();
        config.max_time = 0;
        let err = initialize_game(config, GraphEnvironment::grid(3, 3).unwrap()).err().unwrap();
        assert!(matches!(err, PursuitError::InvalidConfig(_)));
    }
}
