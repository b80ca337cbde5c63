//! Decision strategies for agents
//!
//! Architecture: one trait, several built-in policies
//! - `Strategy` is the only seam the engine calls into
//! - Built-ins are selected by `StrategyKind` from configuration
//! - `HumanInput` is the only policy allowed to block

pub mod human;
pub mod intercept;
pub mod random;
pub mod shortest_path;

pub use human::{input_channel, ChannelInputProvider, HumanInput, InputProvider, InputSender};
pub use intercept::InterceptNearestAttacker;
pub use random::RandomNeighbor;
pub use shortest_path::ShortestPathToNearestFlag;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::error::PursuitError;
use crate::core::types::{AgentId, NodeId, Team};
use crate::engine::view::GameStateView;

/// What a strategy asks the engine to do this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Node to end the tick on
    pub target: NodeId,
}

impl Action {
    pub fn move_to(target: NodeId) -> Self {
        Self { target }
    }
}

/// Why a strategy could not produce an action
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecisionError {
    #[error("No route: {0}")]
    NoRoute(String),

    #[error("Decision failed: {0}")]
    Failed(String),

    #[error("No input provider for agent {0}")]
    NoInputProvider(AgentId),

    #[error("Interrupted while waiting for input")]
    Interrupted,
}

/// Routing failures become `NoRoute`; anything else is a plain failure
impl From<PursuitError> for DecisionError {
    fn from(e: PursuitError) -> Self {
        if e.is_path_not_found() {
            DecisionError::NoRoute(e.to_string())
        } else {
            DecisionError::Failed(e.to_string())
        }
    }
}

/// Trait for agent decision procedures
pub trait Strategy: Send + Sync + fmt::Debug {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Choose a target node from a read-only view of the game
    fn decide(&self, view: &GameStateView<'_>) -> Result<Action, DecisionError>;

    /// Whether `decide` may suspend waiting for outside input
    fn may_block(&self) -> bool {
        false
    }
}

/// Built-in strategies selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    ShortestPathToNearestFlag,
    InterceptNearestAttacker,
    RandomNeighbor,
    /// Driven by the game's input provider
    Human,
}

impl StrategyKind {
    /// Default built-in for a team
    pub fn default_for(team: Team) -> Self {
        match team {
            Team::Attacker => Self::ShortestPathToNearestFlag,
            Team::Defender => Self::InterceptNearestAttacker,
        }
    }

    /// Instantiate the strategy; `Human` yields `None` (external input)
    pub fn build(self) -> Option<Arc<dyn Strategy>> {
        match self {
            Self::ShortestPathToNearestFlag => Some(Arc::new(ShortestPathToNearestFlag)),
            Self::InterceptNearestAttacker => Some(Arc::new(InterceptNearestAttacker)),
            Self::RandomNeighbor => Some(Arc::new(RandomNeighbor)),
            Self::Human => None,
        }
    }
}
