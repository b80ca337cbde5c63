//! Sensors - restricted read-only projections of global truth
//!
//! Each sensor is a pure function of (graph, registry, observer). None of
//! them hold state, so results do not depend on call order or on other
//! agents querying at the same time.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentRegistry};
use crate::core::error::{PursuitError, Result};
use crate::core::types::{AgentId, NodeId, Team};
use crate::graph::GraphEnvironment;

/// Sensors an agent may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Map,
    Agent,
    Neighbor,
}

/// How far a sensor reaches from the observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorScope {
    #[default]
    Unrestricted,
    /// Hop radius around the observer's node
    Radius(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub map: SensorScope,
    pub agent: SensorScope,
}

/// Map sensor output: graph topology, optionally clipped to a radius
///
/// Queries never look past the visible area. Routing only passes through
/// visible nodes, so a clipped view cannot report distances it could not
/// have measured.
#[derive(Debug, Clone)]
pub struct MapView<'a> {
    graph: &'a GraphEnvironment,
    visible: Option<AHashSet<NodeId>>,
}

impl<'a> MapView<'a> {
    pub fn is_visible(&self, node: NodeId) -> bool {
        match &self.visible {
            None => self.graph.contains(node),
            Some(set) => set.contains(&node),
        }
    }

    /// Visible nodes, ascending
    pub fn visible_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<_> = match &self.visible {
            None => self.graph.node_ids().collect(),
            Some(set) => set.iter().copied().collect(),
        };
        nodes.sort();
        nodes
    }

    /// Visible neighbors of a visible node, ascending
    pub fn neighbors(&self, node: NodeId) -> Result<Vec<NodeId>> {
        self.ensure_visible(node)?;
        Ok(self
            .graph
            .neighbors(node)?
            .iter()
            .copied()
            .filter(|&n| self.is_visible(n))
            .collect())
    }

    /// Hop distance through visible nodes
    pub fn distance(&self, from: NodeId, to: NodeId) -> Result<u32> {
        let path = self.path(from, to)?;
        Ok((path.len() - 1) as u32)
    }

    /// Speed-bounded next node toward a visible target
    pub fn step_toward(&self, from: NodeId, to: NodeId, budget: u32) -> Result<NodeId> {
        let path = self.path(from, to)?;
        let index = (budget as usize).min(path.len() - 1);
        Ok(path[index])
    }

    fn path(&self, from: NodeId, to: NodeId) -> Result<Vec<NodeId>> {
        self.ensure_visible(from)?;
        self.ensure_visible(to)?;
        self.graph.shortest_path_within(from, to, |n| self.is_visible(n))
    }

    fn ensure_visible(&self, node: NodeId) -> Result<()> {
        if self.is_visible(node) {
            Ok(())
        } else {
            Err(PursuitError::NodeNotFound(node))
        }
    }
}

/// Another agent as seen by the observer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedAgent {
    pub id: AgentId,
    pub name: String,
    pub team: Team,
    pub position: NodeId,
}

/// Agent sensor output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentView {
    /// Ascending by agent id, observer excluded
    pub agents: Vec<ObservedAgent>,
}

impl AgentView {
    pub fn team(&self, team: Team) -> impl Iterator<Item = &ObservedAgent> {
        self.agents.iter().filter(move |a| a.team == team)
    }

    pub fn attackers(&self) -> impl Iterator<Item = &ObservedAgent> {
        self.team(Team::Attacker)
    }

    pub fn defenders(&self) -> impl Iterator<Item = &ObservedAgent> {
        self.team(Team::Defender)
    }
}

/// Everything the observer's carried sensors report this tick
#[derive(Debug, Clone)]
pub struct SensorReadings<'a> {
    pub map: Option<MapView<'a>>,
    pub agents: Option<AgentView>,
    pub neighbors: Option<Vec<NodeId>>,
}

/// Map sensor
pub fn map_sensor<'a>(
    graph: &'a GraphEnvironment,
    observer: &Agent,
    scope: SensorScope,
) -> Result<MapView<'a>> {
    let visible = match scope {
        SensorScope::Unrestricted => None,
        SensorScope::Radius(r) => Some(
            graph
                .distances_from(observer.position(), Some(r))?
                .keys()
                .copied()
                .collect(),
        ),
    };
    Ok(MapView { graph, visible })
}

/// Agent sensor
pub fn agent_sensor(
    graph: &GraphEnvironment,
    registry: &AgentRegistry,
    observer: &Agent,
    scope: SensorScope,
) -> Result<AgentView> {
    let in_range = match scope {
        SensorScope::Unrestricted => None,
        SensorScope::Radius(r) => Some(graph.distances_from(observer.position(), Some(r))?),
    };

    let agents = registry
        .iter()
        .filter(|a| a.id != observer.id)
        .filter(|a| {
            in_range
                .as_ref()
                .map_or(true, |range| range.contains_key(&a.position()))
        })
        .map(|a| ObservedAgent {
            id: a.id,
            name: a.name.clone(),
            team: a.team,
            position: a.position(),
        })
        .collect();

    Ok(AgentView { agents })
}

/// Neighbor sensor: immediate neighbors of the observer's node, ascending
pub fn neighbor_sensor(graph: &GraphEnvironment, observer: &Agent) -> Result<Vec<NodeId>> {
    Ok(graph.neighbors(observer.position())?.iter().copied().collect())
}

/// Run every sensor the observer carries
pub fn observe<'a>(
    graph: &'a GraphEnvironment,
    registry: &AgentRegistry,
    observer: &Agent,
    config: &SensorConfig,
) -> Result<SensorReadings<'a>> {
    let map = if observer.has_sensor(SensorKind::Map) {
        Some(map_sensor(graph, observer, config.map)?)
    } else {
        None
    };
    let agents = if observer.has_sensor(SensorKind::Agent) {
        Some(agent_sensor(graph, registry, observer, config.agent)?)
    } else {
        None
    };
    let neighbors = if observer.has_sensor(SensorKind::Neighbor) {
        Some(neighbor_sensor(graph, observer)?)
    } else {
        None
    };

    Ok(SensorReadings {
        map,
        agents,
        neighbors,
    })
}
