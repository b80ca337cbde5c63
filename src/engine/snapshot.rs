//! Immutable per-tick snapshot handed to observers

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, Flag};
use crate::core::types::{AgentId, NodeId, Team, Tick};
use crate::engine::events::GameEvent;
use crate::engine::game_loop::TerminationReason;
use crate::engine::invoker::Decision;
use crate::engine::resolver::TickResult;
use crate::graph::GraphEnvironment;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub name: String,
    pub team: Team,
    pub position: NodeId,
}

impl From<&Agent> for AgentSnapshot {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            name: agent.name.clone(),
            team: agent.team,
            position: agent.position(),
        }
    }
}

/// State of the game once a tick has fully resolved
///
/// Observers receive it behind an `Arc` and can hold on to it while the
/// next tick runs.
#[derive(Debug, Clone)]
pub struct TickSnapshot {
    pub tick: Tick,
    pub payoff: f64,
    pub graph: Arc<GraphEnvironment>,
    /// Active agents, ascending id
    pub agents: Vec<AgentSnapshot>,
    /// Every flag, including consumed ones
    pub flags: Vec<Flag>,
    pub result: TickResult,
    pub decisions: Vec<Decision>,
    pub events: Vec<GameEvent>,
    /// Set on the last snapshot of a run
    pub terminal: Option<TerminationReason>,
}

impl TickSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    pub fn agent(&self, id: AgentId) -> Option<&AgentSnapshot> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn team(&self, team: Team) -> impl Iterator<Item = &AgentSnapshot> {
        self.agents.iter().filter(move |a| a.team == team)
    }
}
