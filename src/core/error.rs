use thiserror::Error;

use crate::core::types::{AgentId, NodeId};

#[derive(Error, Debug)]
pub enum PursuitError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("No path from {from} to {to}")]
    NoPath { from: NodeId, to: NodeId },

    #[error("Malformed environment: {0}")]
    MalformedEnvironment(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Duplicate agent id: {0}")]
    DuplicateAgent(AgentId),

    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("Observer error: {0}")]
    Observer(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl PursuitError {
    /// Routing failures are recovered locally by the fallback policy
    pub fn is_path_not_found(&self) -> bool {
        matches!(self, Self::NodeNotFound(_) | Self::NoPath { .. })
    }
}

pub type Result<T> = std::result::Result<T, PursuitError>;
