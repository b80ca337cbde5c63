//! Graph Pursuit - discrete-time pursuit-evasion on graphs
//!
//! Attackers race for weighted flag nodes while defenders try to capture
//! them. Each agent decides through a pluggable strategy that only sees
//! what its sensors expose.

pub mod agent;
pub mod core;
pub mod engine;
pub mod graph;
pub mod record;
pub mod sensor;
pub mod strategy;

pub use crate::core::{GameConfig, PursuitError, Result};
pub use crate::engine::{initialize_game, GameLoop, GameSummary, TerminationReason};
