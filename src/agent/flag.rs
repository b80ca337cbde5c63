//! Flags - weighted target nodes for attackers

use serde::{Deserialize, Serialize};

use crate::core::config::FlagConfig;
use crate::core::error::{PursuitError, Result};
use crate::core::types::{FlagId, NodeId};
use crate::graph::GraphEnvironment;

/// What happens to a flag once it is tagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consumption {
    /// Removed after the first tag
    SingleUse,
    /// Stays available and can be tagged again
    #[default]
    Persistent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub id: FlagId,
    pub node: NodeId,
    pub weight: f64,
    pub consumption: Consumption,
    pub available: bool,
}

/// All flags of a game, indexed by `FlagId`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlagBoard {
    flags: Vec<Flag>,
}

impl FlagBoard {
    /// Build the board, rejecting flags on unknown nodes
    pub fn new(configs: &[FlagConfig], graph: &GraphEnvironment) -> Result<Self> {
        let mut flags = Vec::with_capacity(configs.len());
        for (i, config) in configs.iter().enumerate() {
            if !graph.contains(config.node) {
                return Err(PursuitError::MalformedEnvironment(format!(
                    "flag {} placed on unknown node {}",
                    i, config.node
                )));
            }
            flags.push(Flag {
                id: FlagId(i as u32),
                node: config.node,
                weight: config.weight,
                consumption: config.consumption,
                available: true,
            });
        }
        Ok(Self { flags })
    }

    pub fn get(&self, id: FlagId) -> Option<&Flag> {
        self.flags.get(id.0 as usize)
    }

    /// Every flag, including consumed ones
    pub fn all(&self) -> &[Flag] {
        &self.flags
    }

    /// Flags that can still be tagged, ascending id
    pub fn available(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter().filter(|f| f.available)
    }

    pub fn available_count(&self) -> usize {
        self.available().count()
    }

    /// Mark a single-use flag as consumed; persistent flags are untouched
    pub(crate) fn consume(&mut self, id: FlagId) {
        if let Some(flag) = self.flags.get_mut(id.0 as usize) {
            if flag.consumption == Consumption::SingleUse {
                flag.available = false;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
