//! Game event log

use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, FlagId, Tick};
use crate::engine::game_loop::TerminationReason;
use crate::engine::invoker::FallbackReason;

/// Log entry for game events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub tick: Tick,
    pub kind: GameEventKind,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEventKind {
    Started,
    Fallback { agent: AgentId, reason: FallbackReason },
    Captured { attacker: AgentId, defender: AgentId },
    Tagged { attacker: AgentId, flag: FlagId, weight: f64 },
    Terminated { reason: TerminationReason },
}

/// Events from a single tick
#[derive(Debug, Clone, Default)]
pub struct GameEventLog {
    pub events: Vec<GameEvent>,
}

impl GameEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: GameEventKind, description: String, tick: Tick) {
        self.events.push(GameEvent {
            tick,
            kind,
            description,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<GameEvent> {
        self.events
    }
}
