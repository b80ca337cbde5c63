//! Read-only graph the game is played on
//!
//! Distances are unweighted hop counts. Adjacency sets are ordered so that
//! breadth-first search visits neighbors in ascending id order, which makes
//! shortest-path tie-breaking deterministic.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{PursuitError, Result};
use crate::core::types::{NodeId, Vec2};

/// Semantic type of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Regular,
    FlagEligible,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Vec2,
    #[serde(default)]
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: NodeId, position: Vec2) -> Self {
        Self {
            id,
            position,
            kind: NodeKind::Regular,
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Undirected edge between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub length: f32,
    /// Intermediate drawing points; routing never looks at them
    #[serde(default)]
    pub curve: Option<Vec<Vec2>>,
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId, length: f32) -> Self {
        Self {
            source,
            target,
            length,
            curve: None,
        }
    }
}

/// Immutable queryable graph
#[derive(Debug, Clone)]
pub struct GraphEnvironment {
    nodes: BTreeMap<NodeId, Node>,
    edges: Vec<Edge>,
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl GraphEnvironment {
    /// Build a graph, rejecting duplicate nodes and dangling edges
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self> {
        let mut node_map = BTreeMap::new();
        let mut adjacency: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();

        for node in nodes {
            let id = node.id;
            if node_map.insert(id, node).is_some() {
                return Err(PursuitError::MalformedEnvironment(format!(
                    "duplicate node {}",
                    id
                )));
            }
            adjacency.insert(id, BTreeSet::new());
        }

        for edge in &edges {
            if !node_map.contains_key(&edge.source) || !node_map.contains_key(&edge.target) {
                return Err(PursuitError::MalformedEnvironment(format!(
                    "edge {} -> {} references an unknown node",
                    edge.source, edge.target
                )));
            }
            if !edge.length.is_finite() || edge.length < 0.0 {
                return Err(PursuitError::MalformedEnvironment(format!(
                    "edge {} -> {} has invalid length {}",
                    edge.source, edge.target, edge.length
                )));
            }
            // Self-loops never help routing
            if edge.source == edge.target {
                continue;
            }
            if let Some(set) = adjacency.get_mut(&edge.source) {
                set.insert(edge.target);
            }
            if let Some(set) = adjacency.get_mut(&edge.target) {
                set.insert(edge.source);
            }
        }

        Ok(Self {
            nodes: node_map,
            edges,
            adjacency,
        })
    }

    /// Convenience constructor from bare ids and unit-length edges
    pub fn from_edge_list(
        node_ids: impl IntoIterator<Item = u32>,
        edges: &[(u32, u32)],
    ) -> Result<Self> {
        let nodes = node_ids
            .into_iter()
            .map(|id| Node::new(NodeId(id), Vec2::new(id as f32, 0.0)))
            .collect();
        let edges = edges
            .iter()
            .map(|&(a, b)| Edge::new(NodeId(a), NodeId(b), 1.0))
            .collect();
        Self::new(nodes, edges)
    }

    /// 4-connected grid; node id = y * width + x
    ///
    /// Fails when `width * height` does not fit a node id.
    pub fn grid(width: u32, height: u32) -> Result<Self> {
        let count = width.checked_mul(height).ok_or_else(|| {
            PursuitError::MalformedEnvironment(format!("{}x{} grid exceeds the node id range", width, height))
        })?;
        let mut nodes = Vec::with_capacity(count as usize);
        let mut adjacency = BTreeMap::new();
        let mut edges = Vec::new();

        for y in 0..height {
            for x in 0..width {
                let id = NodeId(y * width + x);
                nodes.push(Node::new(id, Vec2::new(x as f32, y as f32)));
                adjacency.insert(id, BTreeSet::new());
                if x + 1 < width {
                    edges.push(Edge::new(id, NodeId(id.0 + 1), 1.0));
                }
                if y + 1 < height {
                    edges.push(Edge::new(id, NodeId(id.0 + width), 1.0));
                }
            }
        }

        for edge in &edges {
            adjacency.entry(edge.source).or_insert_with(BTreeSet::new).insert(edge.target);
            adjacency.entry(edge.target).or_insert_with(BTreeSet::new).insert(edge.source);
        }

        Ok(Self {
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
            edges,
            adjacency,
        })
    }

    /// Mark a node as flag-eligible (construction-time only)
    pub fn with_node_kind(mut self, id: NodeId, kind: NodeKind) -> Result<Self> {
        let node = self.nodes.get_mut(&id).ok_or(PursuitError::NodeNotFound(id))?;
        node.kind = kind;
        Ok(self)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Nodes in ascending id order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Immediate neighbors of a node, ascending
    pub fn neighbors(&self, id: NodeId) -> Result<&BTreeSet<NodeId>> {
        self.adjacency.get(&id).ok_or(PursuitError::NodeNotFound(id))
    }

    /// Hop distance between two nodes
    pub fn distance(&self, from: NodeId, to: NodeId) -> Result<u32> {
        let path = self.shortest_path(from, to)?;
        Ok((path.len() - 1) as u32)
    }

    /// Shortest path including both endpoints
    ///
    /// Returns `NoPath` when the nodes lie in different components.
    pub fn shortest_path(&self, from: NodeId, to: NodeId) -> Result<Vec<NodeId>> {
        self.shortest_path_within(from, to, |_| true)
    }

    /// Shortest path that only passes through nodes accepted by `allowed`
    ///
    /// Both endpoints must be allowed, otherwise the search reports `NoPath`.
    pub fn shortest_path_within(
        &self,
        from: NodeId,
        to: NodeId,
        allowed: impl Fn(NodeId) -> bool,
    ) -> Result<Vec<NodeId>> {
        self.ensure_known(from)?;
        self.ensure_known(to)?;

        if !allowed(from) || !allowed(to) {
            return Err(PursuitError::NoPath { from, to });
        }
        if from == to {
            return Ok(vec![from]);
        }

        let mut came_from: AHashMap<NodeId, NodeId> = AHashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(from);
        came_from.insert(from, from);

        while let Some(current) = queue.pop_front() {
            for &next in &self.adjacency[&current] {
                if came_from.contains_key(&next) || !allowed(next) {
                    continue;
                }
                came_from.insert(next, current);
                if next == to {
                    return Ok(reconstruct_path(&came_from, from, to));
                }
                queue.push_back(next);
            }
        }

        Err(PursuitError::NoPath { from, to })
    }

    /// Node reached after following the shortest path for at most `budget` hops
    pub fn step_toward(&self, from: NodeId, to: NodeId, budget: u32) -> Result<NodeId> {
        let path = self.shortest_path(from, to)?;
        let index = (budget as usize).min(path.len() - 1);
        Ok(path[index])
    }

    /// Hop distances from `origin` to every node within `max_hops`
    ///
    /// `None` explores the whole component.
    pub fn distances_from(&self, origin: NodeId, max_hops: Option<u32>) -> Result<AHashMap<NodeId, u32>> {
        self.ensure_known(origin)?;

        let mut dist = AHashMap::new();
        let mut queue = VecDeque::new();
        dist.insert(origin, 0);
        queue.push_back(origin);

        while let Some(current) = queue.pop_front() {
            let d = dist[&current];
            if max_hops.is_some_and(|limit| d >= limit) {
                continue;
            }
            for &next in &self.adjacency[&current] {
                if !dist.contains_key(&next) {
                    dist.insert(next, d + 1);
                    queue.push_back(next);
                }
            }
        }

        Ok(dist)
    }

    fn ensure_known(&self, id: NodeId) -> Result<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(PursuitError::NodeNotFound(id))
        }
    }
}

/// Reconstruct path from came_from map
fn reconstruct_path(came_from: &AHashMap<NodeId, NodeId>, start: NodeId, goal: NodeId) -> Vec<NodeId> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        current = came_from[&current];
        path.push(current);
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: u32) -> GraphEnvironment {
        let edges: Vec<_> = (0..n.saturating_sub(1)).map(|i| (i, i + 1)).collect();
        GraphEnvironment::from_edge_list(0..n, &edges).unwrap()
    }

    #[test]
    fn test_neighbors_sorted() {
        let graph = GraphEnvironment::from_edge_list(0..4, &[(0, 3), (0, 1), (0, 2)]).unwrap();
        let neighbors: Vec<_> = graph.neighbors(NodeId(0)).unwrap().iter().copied().collect();
        assert_eq!(neighbors, vec![NodeId(1), NodeId(2), NodeId(3)]);
    }

    #[test]
    fn test_distance_along_line() {
        let graph = line(5);
        assert_eq!(graph.distance(NodeId(0), NodeId(4)).unwrap(), 4);
        assert_eq!(graph.distance(NodeId(2), NodeId(2)).unwrap(), 0);
    }

    #[test]
    fn test_distance_unknown_node() {
        let graph = line(3);
        assert!(matches!(
            graph.distance(NodeId(0), NodeId(99)),
            Err(PursuitError::NodeNotFound(NodeId(99)))
        ));
    }

    #[test]
    fn test_distance_disconnected() {
        let graph = GraphEnvironment::from_edge_list(0..4, &[(0, 1), (2, 3)]).unwrap();
        assert!(matches!(
            graph.distance(NodeId(0), NodeId(3)),
            Err(PursuitError::NoPath { .. })
        ));
    }

    #[test]
    fn test_step_toward_respects_budget() {
        let graph = line(6);
        assert_eq!(graph.step_toward(NodeId(0), NodeId(5), 2).unwrap(), NodeId(2));
        assert_eq!(graph.step_toward(NodeId(0), NodeId(5), 0).unwrap(), NodeId(0));
        // Budget larger than the path stops at the goal
        assert_eq!(graph.step_toward(NodeId(0), NodeId(5), 10).unwrap(), NodeId(5));
    }

    #[test]
    fn test_step_toward_tie_breaks_on_lowest_id() {
        // Square 0-1-3 and 0-2-3: both routes are length 2
        let graph = GraphEnvironment::from_edge_list(0..4, &[(0, 1), (0, 2), (1, 3), (2, 3)]).unwrap();
        assert_eq!(graph.step_toward(NodeId(0), NodeId(3), 1).unwrap(), NodeId(1));
    }

    #[test]
    fn test_grid_layout() {
        let graph = GraphEnvironment::grid(3, 2).unwrap();
        assert_eq!(graph.node_count(), 6);
        assert_eq!(graph.edge_count(), 7);
        assert_eq!(graph.distance(NodeId(0), NodeId(5)).unwrap(), 3);
    }

    #[test]
    fn test_dangling_edge_is_malformed() {
        let result = GraphEnvironment::from_edge_list(0..2, &[(0, 5)]);
        assert!(matches!(result, Err(PursuitError::MalformedEnvironment(_))));
    }

    #[test]
    fn test_duplicate_node_is_malformed() {
        let nodes = vec![
            Node::new(NodeId(1), Vec2::default()),
            Node::new(NodeId(1), Vec2::default()),
        ];
        assert!(GraphEnvironment::new(nodes, vec![]).is_err());
    }

    #[test]
    fn test_distances_from_limited() {
        let graph = line(6);
        let within = graph.distances_from(NodeId(0), Some(2)).unwrap();
        assert_eq!(within.len(), 3);
        assert_eq!(within.get(&NodeId(2)), Some(&2));
        assert!(!within.contains_key(&NodeId(3)));
    }

    #[test]
    fn test_with_node_kind_marks_flag_nodes() {
        let graph = line(3).with_node_kind(NodeId(2), NodeKind::FlagEligible).unwrap();
        assert_eq!(graph.node(NodeId(2)).unwrap().kind, NodeKind::FlagEligible);
        assert_eq!(graph.node(NodeId(0)).unwrap().kind, NodeKind::Regular);
        assert!(line(3).with_node_kind(NodeId(9), NodeKind::FlagEligible).is_err());
    }

    #[test]
    fn test_grid_rejects_oversized_dimensions() {
        let err = GraphEnvironment::grid(u32::MAX, 2).unwrap_err();
        assert!(matches!(err, PursuitError::MalformedEnvironment(_)));
    }

    #[test]
    fn test_shortest_path_within_avoids_disallowed_nodes() {
        // 0 - 1 - 2 with a detour 0 - 3 - 4 - 2
        let graph =
            GraphEnvironment::from_edge_list(0..5, &[(0, 1), (1, 2), (0, 3), (3, 4), (4, 2)]).unwrap();
        let path = graph.shortest_path_within(NodeId(0), NodeId(2), |n| n != NodeId(1)).unwrap();
        assert_eq!(path, vec![NodeId(0), NodeId(3), NodeId(4), NodeId(2)]);

        let blocked = graph.shortest_path_within(NodeId(0), NodeId(2), |n| n.0 < 2);
        assert!(blocked.unwrap_err().is_path_not_found());
    }
}
