//! Strategy invoker - one decision per active agent per tick
//!
//! Every decision reads the same frozen pre-tick state; nothing is
//! committed here. A failing strategy only ever costs its own agent the
//! fallback move.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::{Agent, AgentRegistry, FlagBoard};
use crate::core::error::PursuitError;
use crate::core::types::{AgentId, NodeId, Tick};
use crate::engine::interrupt::InterruptHandle;
use crate::engine::view::{derive_seed, GameStateView};
use crate::graph::GraphEnvironment;
use crate::sensor::{self, SensorConfig};
use crate::strategy::{Action, DecisionError, InputProvider};

const STRATEGY_SALT: u64 = 0x5EED_0001;
const FALLBACK_SALT: u64 = 0x5EED_0002;

/// Which recovery path replaced an agent's own choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FallbackReason {
    /// Strategy reported it could not route
    PathNotFound,
    /// Returned node is not reachable within speed
    InvalidAction,
    /// Strategy errored or panicked
    DecisionFailure,
    /// No strategy and no input provider
    NoDecision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionOutcome {
    Accepted,
    Fallback { reason: FallbackReason, detail: String },
}

/// Action chosen for one agent this tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub agent: AgentId,
    pub from: NodeId,
    pub target: NodeId,
    pub outcome: DecisionOutcome,
}

impl Decision {
    pub fn is_fallback(&self) -> bool {
        matches!(self.outcome, DecisionOutcome::Fallback { .. })
    }
}

/// Failures that end a tick early
#[derive(Error, Debug)]
pub enum TickError {
    #[error("Interrupted")]
    Interrupted,

    #[error(transparent)]
    Engine(#[from] PursuitError),
}

/// Frozen pre-tick state shared by all decisions of a tick
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub graph: &'a GraphEnvironment,
    pub registry: &'a AgentRegistry,
    pub flags: &'a FlagBoard,
    pub sensors: &'a SensorConfig,
    pub tick: Tick,
    pub payoff: f64,
    pub seed: u64,
}

#[derive(Debug)]
pub struct StrategyInvoker {
    input: Option<Arc<dyn InputProvider>>,
    parallel_threshold: usize,
    interrupt: InterruptHandle,
}

impl StrategyInvoker {
    pub fn new(parallel_threshold: usize, interrupt: InterruptHandle) -> Self {
        Self {
            input: None,
            parallel_threshold,
            interrupt,
        }
    }

    pub fn set_input_provider(&mut self, provider: Arc<dyn InputProvider>) {
        self.input = Some(provider);
    }

    /// Decide for every active agent, returned in ascending agent id order
    ///
    /// Automated strategies run first (in parallel once there are at least
    /// `parallel_threshold` of them), then agents that may block for input
    /// run one at a time, ascending.
    pub fn decide_all(&self, ctx: &TickContext<'_>) -> Result<Vec<Decision>, TickError> {
        if self.interrupt.is_interrupted() {
            return Err(TickError::Interrupted);
        }

        let (automated, blocking): (Vec<&Agent>, Vec<&Agent>) = ctx
            .registry
            .iter()
            .partition(|a| a.strategy.as_ref().is_some_and(|s| !s.may_block()));

        let mut decisions: Vec<Decision> = if automated.len() >= self.parallel_threshold {
            automated
                .par_iter()
                .map(|agent| self.decide_one(ctx, agent))
                .collect::<Result<Vec<_>, TickError>>()?
        } else {
            automated
                .iter()
                .map(|agent| self.decide_one(ctx, agent))
                .collect::<Result<Vec<_>, TickError>>()?
        };

        for agent in blocking {
            decisions.push(self.decide_one(ctx, agent)?);
        }

        decisions.sort_by_key(|d| d.agent);
        Ok(decisions)
    }

    fn decide_one(&self, ctx: &TickContext<'_>, agent: &Agent) -> Result<Decision, TickError> {
        let readings = sensor::observe(ctx.graph, ctx.registry, agent, ctx.sensors)?;
        let seed = derive_seed(ctx.seed, ctx.tick, agent.id, STRATEGY_SALT);
        let view = GameStateView::build(agent, ctx.flags, readings, ctx.tick, ctx.payoff, seed);
        let from = agent.position();

        let (reason, detail) = match self.invoke(agent, &view) {
            Ok(action) => match check_reachable(ctx.graph, from, action.target, agent.speed) {
                Ok(()) => {
                    return Ok(Decision {
                        agent: agent.id,
                        from,
                        target: action.target,
                        outcome: DecisionOutcome::Accepted,
                    });
                }
                Err(detail) => (FallbackReason::InvalidAction, detail),
            },
            // Only a raised interrupt ends the tick; a strategy claiming one is just failing
            Err(DecisionError::Interrupted) if self.interrupt.is_interrupted() => {
                return Err(TickError::Interrupted);
            }
            Err(e @ DecisionError::NoRoute(_)) => (FallbackReason::PathNotFound, e.to_string()),
            Err(e @ (DecisionError::Failed(_) | DecisionError::Interrupted)) => {
                (FallbackReason::DecisionFailure, e.to_string())
            }
            Err(e @ DecisionError::NoInputProvider(_)) => (FallbackReason::NoDecision, e.to_string()),
        };

        let target = fallback_target(ctx, agent)?;
        tracing::warn!(
            "Agent '{}' ({}) fell back to {} at tick {}: {:?} ({})",
            agent.name,
            agent.id,
            target,
            ctx.tick,
            reason,
            detail
        );

        Ok(Decision {
            agent: agent.id,
            from,
            target,
            outcome: DecisionOutcome::Fallback { reason, detail },
        })
    }

    fn invoke(&self, agent: &Agent, view: &GameStateView<'_>) -> Result<Action, DecisionError> {
        let call = || match &agent.strategy {
            Some(strategy) => strategy.decide(view),
            None => match &self.input {
                Some(provider) => provider.request_action(view),
                None => Err(DecisionError::NoInputProvider(agent.id)),
            },
        };

        match panic::catch_unwind(AssertUnwindSafe(call)) {
            Ok(result) => result,
            Err(payload) => Err(DecisionError::Failed(format!(
                "strategy panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }
}

/// Target must exist and lie within `speed` hops of `from`
fn check_reachable(
    graph: &GraphEnvironment,
    from: NodeId,
    target: NodeId,
    speed: u32,
) -> Result<(), String> {
    match graph.distance(from, target) {
        Ok(d) if d <= speed => Ok(()),
        Ok(d) => Err(format!("target {} is {} hops away (speed {})", target, d, speed)),
        Err(e) => Err(e.to_string()),
    }
}

/// Uniformly random immediate neighbor; isolated agents stay put
fn fallback_target(ctx: &TickContext<'_>, agent: &Agent) -> Result<NodeId, TickError> {
    let neighbors = sensor::neighbor_sensor(ctx.graph, agent)?;
    let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(ctx.seed, ctx.tick, agent.id, FALLBACK_SALT));
    Ok(neighbors.choose(&mut rng).copied().unwrap_or(agent.position()))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
