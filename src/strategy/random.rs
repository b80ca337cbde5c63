//! Random walk over the neighbor sensor

use rand::seq::SliceRandom;

use crate::engine::view::GameStateView;
use crate::strategy::{Action, DecisionError, Strategy};

/// Picks a uniformly random neighbor; stays put on isolated nodes
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNeighbor;

impl Strategy for RandomNeighbor {
    fn name(&self) -> &str {
        "random_neighbor"
    }

    fn decide(&self, view: &GameStateView<'_>) -> Result<Action, DecisionError> {
        let neighbors = view
            .neighbors
            .as_ref()
            .ok_or_else(|| DecisionError::NoRoute("agent carries no neighbor sensor".into()))?;

        let mut rng = view.rng();
        let target = neighbors.choose(&mut rng).copied().unwrap_or(view.position);
        Ok(Action::move_to(target))
    }
}
