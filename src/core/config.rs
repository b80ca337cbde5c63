//! Game configuration
//!
//! One immutable structure built once at startup (usually from TOML) and
//! shared with every component for the duration of a run.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::agent::{Consumption, ParamValue};
use crate::core::error::{PursuitError, Result};
use crate::core::types::{NodeId, Team, Tick};
use crate::sensor::{SensorConfig, SensorKind};
use crate::strategy::StrategyKind;

/// Upper bound on per-agent extension parameters
pub const MAX_EXTENSION_PARAMS: usize = 16;

/// Order in which captures and tags are evaluated within one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOrder {
    /// A captured attacker cannot also score in the same tick
    #[default]
    CapturesFirst,
    /// Tags are credited before captures remove attackers
    TagsFirst,
}

/// How an attacker has to approach a flag to tag it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagRule {
    /// Graph distance to the flag node <= attacker capture radius
    #[default]
    WithinRadius,
    /// Attacker must stand on the flag node
    ExactNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionPolicy {
    pub order: ResolutionOrder,
    pub tag_rule: TagRule,
}

/// Weights for the payoff accumulator
///
/// `payoff_next = payoff_prev + tag_weight * sum(tag weights) - capture_weight * captures`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoffWeights {
    pub tag_weight: f64,
    pub capture_weight: f64,
}

impl Default for PayoffWeights {
    fn default() -> Self {
        Self {
            tag_weight: 1.0,
            capture_weight: 0.0,
        }
    }
}

/// Parameters shared by every agent of a team unless overridden
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamDefaults {
    pub speed: u32,
    pub capture_radius: u32,
    pub sensors: Vec<SensorKind>,
    /// `None` picks the team's built-in strategy
    pub strategy: Option<StrategyKind>,
}

impl Default for TeamDefaults {
    fn default() -> Self {
        Self {
            speed: 1,
            capture_radius: 0,
            sensors: vec![SensorKind::Map, SensorKind::Agent, SensorKind::Neighbor],
            strategy: None,
        }
    }
}

/// One agent as described by the scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub team: Team,
    pub start: NodeId,
    #[serde(default)]
    pub speed: Option<u32>,
    #[serde(default)]
    pub capture_radius: Option<u32>,
    #[serde(default)]
    pub sensors: Option<Vec<SensorKind>>,
    #[serde(default)]
    pub strategy: Option<StrategyKind>,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, team: Team, start: NodeId) -> Self {
        Self {
            name: name.into(),
            team,
            start,
            speed: None,
            capture_radius: None,
            sensors: None,
            strategy: None,
            params: BTreeMap::new(),
        }
    }

    pub fn with_speed(mut self, speed: u32) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_capture_radius(mut self, radius: u32) -> Self {
        self.capture_radius = Some(radius);
        self
    }

    pub fn with_sensors(mut self, sensors: Vec<SensorKind>) -> Self {
        self.sensors = Some(sensors);
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

/// One flag as described by the scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagConfig {
    pub node: NodeId,
    pub weight: f64,
    #[serde(default)]
    pub consumption: Consumption,
}

impl FlagConfig {
    pub fn new(node: NodeId, weight: f64) -> Self {
        Self {
            node,
            weight,
            consumption: Consumption::default(),
        }
    }

    pub fn with_consumption(mut self, consumption: Consumption) -> Self {
        self.consumption = consumption;
        self
    }
}

/// Complete configuration for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Hard bound on the number of ticks
    pub max_time: Tick,
    /// Seed for every random choice made by the engine
    pub seed: u64,
    /// Automated agents needed before decisions are evaluated in parallel
    pub parallel_threshold: usize,
    pub resolution: ResolutionPolicy,
    pub payoff: PayoffWeights,
    pub sensors: SensorConfig,
    pub attacker: TeamDefaults,
    pub defender: TeamDefaults,
    pub agents: Vec<AgentConfig>,
    pub flags: Vec<FlagConfig>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_time: 1000,
            seed: 42,
            parallel_threshold: 64,
            resolution: ResolutionPolicy::default(),
            payoff: PayoffWeights::default(),
            sensors: SensorConfig::default(),
            attacker: TeamDefaults::default(),
            defender: TeamDefaults::default(),
            agents: Vec::new(),
            flags: Vec::new(),
        }
    }
}

impl GameConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: GameConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn team_defaults(&self, team: Team) -> &TeamDefaults {
        match team {
            Team::Attacker => &self.attacker,
            Team::Defender => &self.defender,
        }
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_time == 0 {
            return Err(PursuitError::InvalidConfig("max_time must be positive".into()));
        }

        if !self.payoff.tag_weight.is_finite() || !self.payoff.capture_weight.is_finite() {
            return Err(PursuitError::InvalidConfig("payoff weights must be finite".into()));
        }

        let mut names = AHashSet::new();
        for agent in &self.agents {
            if agent.name.trim().is_empty() {
                return Err(PursuitError::InvalidConfig("agent name must not be empty".into()));
            }
            if !names.insert(agent.name.as_str()) {
                return Err(PursuitError::InvalidConfig(format!(
                    "duplicate agent name '{}'",
                    agent.name
                )));
            }
            if agent.params.len() > MAX_EXTENSION_PARAMS {
                return Err(PursuitError::InvalidConfig(format!(
                    "agent '{}' has {} params (max {})",
                    agent.name,
                    agent.params.len(),
                    MAX_EXTENSION_PARAMS
                )));
            }
            if agent.params.keys().any(|k| k.trim().is_empty()) {
                return Err(PursuitError::InvalidConfig(format!(
                    "agent '{}' has an empty param key",
                    agent.name
                )));
            }
        }

        for (i, flag) in self.flags.iter().enumerate() {
            if !flag.weight.is_finite() {
                return Err(PursuitError::InvalidConfig(format!(
                    "flag {} weight must be finite",
                    i
                )));
            }
        }

        Ok(())
    }
}
