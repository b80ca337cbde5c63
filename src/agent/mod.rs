//! Agent registry - owns every agent's mutable state
//!
//! Only the game loop (position commit) and the interaction resolver
//! (removal on capture) write here. Strategies get read-only views.

pub mod flag;
pub mod params;

pub use flag::{Consumption, Flag, FlagBoard};
pub use params::{ExtensionParams, ParamValue};

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::error::{PursuitError, Result};
use crate::core::types::{AgentId, NodeId, Team};
use crate::graph::GraphEnvironment;
use crate::sensor::SensorKind;
use crate::strategy::Strategy;

/// One agent in the game
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub team: Team,
    position: NodeId,
    /// Max hops per tick
    pub speed: u32,
    /// Max hop distance for captures (defenders) and tags (attackers)
    pub capture_radius: u32,
    pub sensors: Vec<SensorKind>,
    /// `None` means the agent is driven by external input
    pub strategy: Option<Arc<dyn Strategy>>,
    pub params: ExtensionParams,
}

impl Agent {
    pub fn new(id: AgentId, name: impl Into<String>, team: Team, position: NodeId) -> Self {
        Self {
            id,
            name: name.into(),
            team,
            position,
            speed: 1,
            capture_radius: 0,
            sensors: vec![SensorKind::Map, SensorKind::Agent, SensorKind::Neighbor],
            strategy: None,
            params: ExtensionParams::default(),
        }
    }

    pub fn with_speed(mut self, speed: u32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_capture_radius(mut self, radius: u32) -> Self {
        self.capture_radius = radius;
        self
    }

    pub fn with_sensors(mut self, sensors: Vec<SensorKind>) -> Self {
        self.sensors = sensors;
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_params(mut self, params: ExtensionParams) -> Self {
        self.params = params;
        self
    }

    pub fn position(&self) -> NodeId {
        self.position
    }

    pub fn has_sensor(&self, kind: SensorKind) -> bool {
        self.sensors.contains(&kind)
    }
}

/// Active agents keyed by id
///
/// Iteration is always ascending by `AgentId`. The set only shrinks after
/// the game starts.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<AgentId, Agent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent, validating its id and start node
    pub fn insert(&mut self, agent: Agent, graph: &GraphEnvironment) -> Result<()> {
        if self.agents.contains_key(&agent.id) {
            return Err(PursuitError::DuplicateAgent(agent.id));
        }
        if !graph.contains(agent.position) {
            return Err(PursuitError::MalformedEnvironment(format!(
                "agent '{}' starts on unknown node {}",
                agent.name, agent.position
            )));
        }
        self.agents.insert(agent.id, agent);
        Ok(())
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Agents in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn team(&self, team: Team) -> impl Iterator<Item = &Agent> {
        self.agents.values().filter(move |a| a.team == team)
    }

    pub fn count(&self, team: Team) -> usize {
        self.team(team).count()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Commit a new position; the node must exist in the graph
    pub(crate) fn commit_position(
        &mut self,
        id: AgentId,
        node: NodeId,
        graph: &GraphEnvironment,
    ) -> Result<()> {
        if !graph.contains(node) {
            return Err(PursuitError::NodeNotFound(node));
        }
        let agent = self.agents.get_mut(&id).ok_or(PursuitError::AgentNotFound(id))?;
        agent.position = node;
        Ok(())
    }

    pub(crate) fn set_strategy(&mut self, id: AgentId, strategy: Option<Arc<dyn Strategy>>) -> Result<()> {
        let agent = self.agents.get_mut(&id).ok_or(PursuitError::AgentNotFound(id))?;
        agent.strategy = strategy;
        Ok(())
    }

    /// Remove a captured agent
    pub(crate) fn remove(&mut self, id: AgentId) -> Option<Agent> {
        self.agents.remove(&id)
    }
}
