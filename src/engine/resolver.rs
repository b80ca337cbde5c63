//! Capture and tag resolution
//!
//! `resolve` is a pure function of the committed post-move state; `apply`
//! is the only part that mutates. Running `resolve` twice on the same
//! state yields the same result.

use std::collections::BTreeSet;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentRegistry, Consumption, FlagBoard};
use crate::core::config::{ResolutionOrder, ResolutionPolicy, TagRule};
use crate::core::error::Result;
use crate::core::types::{AgentId, FlagId, NodeId, Team};
use crate::graph::GraphEnvironment;

/// An attacker caught by a defender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    pub attacker: AgentId,
    pub defender: AgentId,
}

/// An attacker scoring a flag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub attacker: AgentId,
    pub flag: FlagId,
    pub weight: f64,
}

/// Outcome of one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickResult {
    pub captures: Vec<Capture>,
    pub tags: Vec<Tag>,
    pub attackers_remaining: usize,
    pub defenders_remaining: usize,
}

impl TickResult {
    /// Result with no interactions, just the current counts
    pub fn counts_only(registry: &AgentRegistry) -> Self {
        Self {
            captures: Vec::new(),
            tags: Vec::new(),
            attackers_remaining: registry.count(Team::Attacker),
            defenders_remaining: registry.count(Team::Defender),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InteractionResolver {
    policy: ResolutionPolicy,
}

impl InteractionResolver {
    pub fn new(policy: ResolutionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    /// Detect captures and tags on the committed positions
    pub fn resolve(
        &self,
        graph: &GraphEnvironment,
        registry: &AgentRegistry,
        flags: &FlagBoard,
    ) -> Result<TickResult> {
        let attackers: Vec<&Agent> = registry.team(Team::Attacker).collect();
        let defenders: Vec<&Agent> = registry.team(Team::Defender).collect();

        let (captures, tags) = match self.policy.order {
            ResolutionOrder::CapturesFirst => {
                let captures = find_captures(graph, &attackers, &defenders)?;
                let captured: BTreeSet<AgentId> = captures.iter().map(|c| c.attacker).collect();
                let survivors: Vec<&Agent> = attackers
                    .iter()
                    .copied()
                    .filter(|a| !captured.contains(&a.id))
                    .collect();
                let tags = self.find_tags(graph, &survivors, flags)?;
                (captures, tags)
            }
            ResolutionOrder::TagsFirst => {
                let tags = self.find_tags(graph, &attackers, flags)?;
                let captures = find_captures(graph, &attackers, &defenders)?;
                (captures, tags)
            }
        };

        Ok(TickResult {
            attackers_remaining: attackers.len() - captures.len(),
            defenders_remaining: defenders.len(),
            captures,
            tags,
        })
    }

    /// Remove captured attackers and consume single-use flags
    pub(crate) fn apply(&self, result: &TickResult, registry: &mut AgentRegistry, flags: &mut FlagBoard) {
        for capture in &result.captures {
            registry.remove(capture.attacker);
        }
        for tag in &result.tags {
            flags.consume(tag.flag);
        }
    }

    fn find_tags(
        &self,
        graph: &GraphEnvironment,
        attackers: &[&Agent],
        flags: &FlagBoard,
    ) -> Result<Vec<Tag>> {
        let mut tags = Vec::new();
        let mut consumed: BTreeSet<FlagId> = BTreeSet::new();

        for attacker in attackers {
            let reach = match self.policy.tag_rule {
                TagRule::WithinRadius => Some(within(graph, attacker.position(), attacker.capture_radius)?),
                TagRule::ExactNode => None,
            };

            for flag in flags.available() {
                if consumed.contains(&flag.id) {
                    continue;
                }
                let hit = match &reach {
                    Some(reach) => reach.contains_key(&flag.node),
                    None => flag.node == attacker.position(),
                };
                if hit {
                    tags.push(Tag {
                        attacker: attacker.id,
                        flag: flag.id,
                        weight: flag.weight,
                    });
                    if flag.consumption == Consumption::SingleUse {
                        consumed.insert(flag.id);
                    }
                }
            }
        }

        Ok(tags)
    }
}

/// Each attacker is captured at most once, by the lowest-id defender in range
fn find_captures(
    graph: &GraphEnvironment,
    attackers: &[&Agent],
    defenders: &[&Agent],
) -> Result<Vec<Capture>> {
    let mut reach = Vec::with_capacity(defenders.len());
    for defender in defenders {
        reach.push((defender.id, within(graph, defender.position(), defender.capture_radius)?));
    }

    let mut captures = Vec::new();
    for attacker in attackers {
        if let Some((defender, _)) = reach
            .iter()
            .find(|(_, area)| area.contains_key(&attacker.position()))
        {
            captures.push(Capture {
                attacker: attacker.id,
                defender: *defender,
            });
        }
    }
    Ok(captures)
}

/// Nodes within `radius` hops; unreachable nodes are simply absent
fn within(graph: &GraphEnvironment, origin: NodeId, radius: u32) -> Result<AHashMap<NodeId, u32>> {
    graph.distances_from(origin, Some(radius))
}
