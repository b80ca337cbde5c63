pub mod config;
pub mod error;
pub mod types;

pub use config::GameConfig;
pub use error::{PursuitError, Result};
pub use types::{AgentId, FlagId, NodeId, Team, Tick, Vec2};
