//! Attacker policy: head for the closest reachable flag

use crate::core::types::NodeId;
use crate::engine::view::GameStateView;
use crate::strategy::{Action, DecisionError, Strategy};

/// Moves `speed` hops along the shortest path to the nearest flag
///
/// Nearest means fewest hops; ties go to the lower flag id. Flags the map
/// sensor cannot route to are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortestPathToNearestFlag;

impl Strategy for ShortestPathToNearestFlag {
    fn name(&self) -> &str {
        "shortest_path_to_nearest_flag"
    }

    fn decide(&self, view: &GameStateView<'_>) -> Result<Action, DecisionError> {
        let map = view
            .map
            .as_ref()
            .ok_or_else(|| DecisionError::NoRoute("agent carries no map sensor".into()))?;

        let mut closest: Option<(u32, NodeId)> = None;
        for flag in &view.flags {
            let Ok(dist) = map.distance(view.position, flag.node) else {
                continue;
            };
            if closest.map_or(true, |(best, _)| dist < best) {
                closest = Some((dist, flag.node));
            }
        }

        let Some((_, target)) = closest else {
            return Err(DecisionError::NoRoute(format!(
                "no flag reachable from {}",
                view.position
            )));
        };

        Ok(Action::move_to(map.step_toward(view.position, target, view.speed)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AgentId, FlagId, Team};
    use crate::engine::view::{FlagView, GameStateView};
    use crate::graph::GraphEnvironment;
    use crate::sensor::{map_sensor, SensorScope};
    use crate::agent::{Agent, ExtensionParams};

    fn view_on<'a>(
        graph: &'a GraphEnvironment,
        agent: &'a Agent,
        params: &'a ExtensionParams,
        flags: Vec<FlagView>,
    ) -> GameStateView<'a> {
        let mut view = GameStateView::bare(agent, params, 1, 0.0, 0);
        view.flags = flags;
        view.map = Some(map_sensor(graph, agent, SensorScope::Unrestricted).unwrap());
        view
    }

    #[test]
    fn test_moves_toward_nearest_flag() {
        // 0 - 1 - 2 - 3 - 4 with a branch 2 - 5; flags on 4 and 5
        let graph = GraphEnvironment::from_edge_list(0..6, &[(0, 1), (1, 2), (2, 3), (3, 4), (2, 5)])
            .unwrap();
        let agent = Agent::new(AgentId(0), "red", Team::Attacker, NodeId(1));
        let params = ExtensionParams::new();
        let flags = vec![
            FlagView { id: FlagId(0), node: NodeId(4), weight: 1.0 },
            FlagView { id: FlagId(1), node: NodeId(5), weight: 1.0 },
        ];
        let view = view_on(&graph, &agent, &params, flags);

        let action = ShortestPathToNearestFlag.decide(&view).unwrap();
        // Flag at 5 is 2 hops away, flag at 4 is 3 hops away
        assert_eq!(action.target, NodeId(2));
    }

    #[test]
    fn test_no_reachable_flag_is_no_route() {
        let graph = GraphEnvironment::from_edge_list(0..4, &[(0, 1), (2, 3)]).unwrap();
        let agent = Agent::new(AgentId(0), "red", Team::Attacker, NodeId(0));
        let params = ExtensionParams::new();
        let flags = vec![FlagView { id: FlagId(0), node: NodeId(3), weight: 1.0 }];
        let view = view_on(&graph, &agent, &params, flags);

        assert!(matches!(
            ShortestPathToNearestFlag.decide(&view),
            Err(DecisionError::NoRoute(_))
        ));
    }

    #[test]
    fn test_without_map_sensor_is_no_route() {
        let agent = Agent::new(AgentId(0), "red", Team::Attacker, NodeId(0));
        let params = ExtensionParams::new();
        let view = GameStateView::bare(&agent, &params, 1, 0.0, 0);
        assert!(ShortestPathToNearestFlag.decide(&view).is_err());
    }
}
