//! Per-agent, per-tick read-only state handed to strategies
//!
//! Built fresh for every decision call and dropped right after it.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, ExtensionParams, FlagBoard};
use crate::core::types::{AgentId, FlagId, NodeId, Team, Tick};
use crate::sensor::{AgentView, MapView, SensorReadings};

/// A flag as strategies see it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlagView {
    pub id: FlagId,
    pub node: NodeId,
    pub weight: f64,
}

/// Everything a strategy may read when choosing its action
#[derive(Debug, Clone)]
pub struct GameStateView<'a> {
    pub agent: AgentId,
    pub name: &'a str,
    pub team: Team,
    pub position: NodeId,
    pub speed: u32,
    pub capture_radius: u32,
    pub params: &'a ExtensionParams,
    /// Flags still available, ascending id
    pub flags: Vec<FlagView>,
    pub tick: Tick,
    pub payoff: f64,
    pub map: Option<MapView<'a>>,
    pub agents: Option<AgentView>,
    pub neighbors: Option<Vec<NodeId>>,
    /// Seed reserved for this agent on this tick
    pub rng_seed: u64,
}

impl<'a> GameStateView<'a> {
    /// View with no flags and no sensor readings
    pub fn bare(
        agent: &'a Agent,
        params: &'a ExtensionParams,
        tick: Tick,
        payoff: f64,
        rng_seed: u64,
    ) -> Self {
        Self {
            agent: agent.id,
            name: &agent.name,
            team: agent.team,
            position: agent.position(),
            speed: agent.speed,
            capture_radius: agent.capture_radius,
            params,
            flags: Vec::new(),
            tick,
            payoff,
            map: None,
            agents: None,
            neighbors: None,
            rng_seed,
        }
    }

    pub(crate) fn build(
        agent: &'a Agent,
        flags: &FlagBoard,
        readings: SensorReadings<'a>,
        tick: Tick,
        payoff: f64,
        rng_seed: u64,
    ) -> Self {
        let mut view = Self::bare(agent, &agent.params, tick, payoff, rng_seed);
        view.flags = flags
            .available()
            .map(|f| FlagView {
                id: f.id,
                node: f.node,
                weight: f.weight,
            })
            .collect();
        view.map = readings.map;
        view.agents = readings.agents;
        view.neighbors = readings.neighbors;
        view
    }

    pub fn flag_positions(&self) -> Vec<NodeId> {
        self.flags.iter().map(|f| f.node).collect()
    }

    pub fn flag_weights(&self) -> Vec<f64> {
        self.flags.iter().map(|f| f.weight).collect()
    }

    /// Deterministic RNG for this agent and tick
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.rng_seed)
    }
}

/// Mix the run seed with tick, agent and purpose into one stream seed
pub(crate) fn derive_seed(base: u64, tick: Tick, agent: AgentId, salt: u64) -> u64 {
    let mut x = base
        ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (u64::from(agent.0)).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
        ^ salt.wrapping_mul(0x1656_67B1_9E37_79F9);
    // splitmix64 finalizer
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}
