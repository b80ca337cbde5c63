//! Defender policy: chase the nearest visible attacker

use crate::core::types::NodeId;
use crate::engine::view::GameStateView;
use crate::strategy::{Action, DecisionError, Strategy};

/// Steps toward the closest attacker reported by the agent sensor
///
/// Holds position when no attacker is visible or reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterceptNearestAttacker;

impl Strategy for InterceptNearestAttacker {
    fn name(&self) -> &str {
        "intercept_nearest_attacker"
    }

    fn decide(&self, view: &GameStateView<'_>) -> Result<Action, DecisionError> {
        let map = view
            .map
            .as_ref()
            .ok_or_else(|| DecisionError::NoRoute("agent carries no map sensor".into()))?;
        let Some(agents) = view.agents.as_ref() else {
            return Ok(Action::move_to(view.position));
        };

        let mut closest: Option<(u32, NodeId)> = None;
        for attacker in agents.attackers() {
            let Ok(dist) = map.distance(view.position, attacker.position) else {
                continue;
            };
            if closest.map_or(true, |(best, _)| dist < best) {
                closest = Some((dist, attacker.position));
            }
        }

        match closest {
            None => Ok(Action::move_to(view.position)),
            Some((_, target)) => {
                let next = map.step_toward(view.position, target, view.speed)?;
                Ok(Action::move_to(next))
            }
        }
    }
}
