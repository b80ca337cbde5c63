//! Game loop - drives ticks until a termination condition
//!
//! Tick order: advance the counter, gather decisions against the frozen
//! pre-tick state, commit every move, resolve captures then tags, fold the
//! payoff, check termination, publish the snapshot. An interrupt or an
//! unhandled error in any phase still ends with one terminal snapshot.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentRegistry, FlagBoard};
use crate::core::config::GameConfig;
use crate::core::error::{PursuitError, Result};
use crate::core::types::{AgentId, Team, Tick};
use crate::engine::events::{GameEventKind, GameEventLog};
use crate::engine::interrupt::InterruptHandle;
use crate::engine::invoker::{panic_message, Decision, DecisionOutcome, StrategyInvoker, TickContext, TickError};
use crate::engine::payoff;
use crate::engine::publish::{SnapshotObserver, SnapshotPublisher};
use crate::engine::resolver::{InteractionResolver, TickResult};
use crate::engine::snapshot::{AgentSnapshot, TickSnapshot};
use crate::graph::GraphEnvironment;
use crate::strategy::{InputProvider, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminationReason {
    AllAttackersCaptured,
    MaxTimeReached,
    UserInterrupt,
    UnhandledError,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::AllAttackersCaptured => "all attackers captured",
            Self::MaxTimeReached => "max time reached",
            Self::UserInterrupt => "user interrupt",
            Self::UnhandledError => "unhandled error",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    Running,
    Terminated(TerminationReason),
}

impl LoopState {
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}

/// What a finished run reports to its caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub reason: TerminationReason,
    pub ticks: Tick,
    pub payoff: f64,
    pub attackers_remaining: usize,
    pub defenders_remaining: usize,
    pub total_captures: usize,
    pub total_tags: usize,
}

pub struct GameLoop {
    config: Arc<GameConfig>,
    graph: Arc<GraphEnvironment>,
    registry: AgentRegistry,
    flags: FlagBoard,
    invoker: StrategyInvoker,
    resolver: InteractionResolver,
    publisher: SnapshotPublisher,
    interrupt: InterruptHandle,
    state: LoopState,
    tick: Tick,
    payoff: f64,
    total_captures: usize,
    total_tags: usize,
    /// Events raised outside a tick, carried into the next snapshot
    pending: GameEventLog,
}

impl GameLoop {
    /// Build a loop over an already populated registry and flag board
    pub fn new(
        config: Arc<GameConfig>,
        graph: Arc<GraphEnvironment>,
        registry: AgentRegistry,
        flags: FlagBoard,
    ) -> Result<Self> {
        config.validate()?;

        let interrupt = InterruptHandle::new();
        let mut pending = GameEventLog::new();
        pending.push(
            GameEventKind::Started,
            format!(
                "{} attackers, {} defenders, {} flags on {} nodes",
                registry.count(Team::Attacker),
                registry.count(Team::Defender),
                flags.len(),
                graph.node_count()
            ),
            0,
        );

        Ok(Self {
            invoker: StrategyInvoker::new(config.parallel_threshold, interrupt.clone()),
            resolver: InteractionResolver::new(config.resolution),
            publisher: SnapshotPublisher::new(),
            interrupt,
            state: LoopState::Running,
            tick: 0,
            payoff: 0.0,
            total_captures: 0,
            total_tags: 0,
            pending,
            config,
            graph,
            registry,
            flags,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn graph(&self) -> &Arc<GraphEnvironment> {
        &self.graph
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn flags(&self) -> &FlagBoard {
        &self.flags
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn payoff(&self) -> f64 {
        self.payoff
    }

    /// Handle that stops the loop (and any pending input wait) when raised
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub fn add_observer(&mut self, observer: Box<dyn SnapshotObserver>) {
        self.publisher.subscribe(observer);
    }

    /// Provider consulted for agents without an automated strategy
    pub fn set_input_provider(&mut self, provider: Arc<dyn InputProvider>) {
        self.invoker.set_input_provider(provider);
    }

    /// Replace an agent's strategy; only allowed before the first tick
    pub fn assign_strategy(&mut self, id: AgentId, strategy: Arc<dyn Strategy>) -> Result<()> {
        if self.tick > 0 {
            return Err(PursuitError::InvalidConfig(
                "strategies are fixed once the game has started".into(),
            ));
        }
        self.registry.set_strategy(id, Some(strategy))
    }

    /// Run ticks until the loop terminates
    pub fn run(&mut self) -> GameSummary {
        loop {
            if let LoopState::Terminated(reason) = self.step() {
                return self.summary(reason);
            }
        }
    }

    /// Advance one tick; a no-op once terminated
    pub fn step(&mut self) -> LoopState {
        if self.state.is_terminated() {
            return self.state;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_tick()));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(TickError::Interrupted)) => {
                tracing::info!("Interrupted at tick {}", self.tick);
                self.terminate(TerminationReason::UserInterrupt, "interrupted".to_string());
            }
            Ok(Err(TickError::Engine(e))) => {
                tracing::error!("Tick {} failed: {}", self.tick, e);
                self.terminate(TerminationReason::UnhandledError, e.to_string());
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!("Tick {} panicked: {}", self.tick, message);
                self.terminate(TerminationReason::UnhandledError, message);
            }
        }

        self.state
    }

    fn summary(&self, reason: TerminationReason) -> GameSummary {
        GameSummary {
            reason,
            ticks: self.tick,
            payoff: self.payoff,
            attackers_remaining: self.registry.count(Team::Attacker),
            defenders_remaining: self.registry.count(Team::Defender),
            total_captures: self.total_captures,
            total_tags: self.total_tags,
        }
    }

    fn run_tick(&mut self) -> std::result::Result<(), TickError> {
        self.tick += 1;
        let tick = self.tick;
        let mut events = std::mem::take(&mut self.pending);

        let decisions = {
            let ctx = TickContext {
                graph: &self.graph,
                registry: &self.registry,
                flags: &self.flags,
                sensors: &self.config.sensors,
                tick,
                payoff: self.payoff,
                seed: self.config.seed,
            };
            self.invoker.decide_all(&ctx)?
        };

        for decision in &decisions {
            if let DecisionOutcome::Fallback { reason, detail } = &decision.outcome {
                events.push(
                    GameEventKind::Fallback {
                        agent: decision.agent,
                        reason: *reason,
                    },
                    detail.clone(),
                    tick,
                );
            }
        }

        for decision in &decisions {
            self.registry
                .commit_position(decision.agent, decision.target, &self.graph)?;
        }

        let result = self.resolver.resolve(&self.graph, &self.registry, &self.flags)?;
        self.resolver.apply(&result, &mut self.registry, &mut self.flags);
        self.payoff = payoff::combine(self.payoff, &result.captures, &result.tags, &self.config.payoff);
        self.total_captures += result.captures.len();
        self.total_tags += result.tags.len();

        for capture in &result.captures {
            tracing::info!("Tick {}: {} captured {}", tick, capture.defender, capture.attacker);
            events.push(
                GameEventKind::Captured {
                    attacker: capture.attacker,
                    defender: capture.defender,
                },
                format!("{} captured by {}", capture.attacker, capture.defender),
                tick,
            );
        }
        for tag in &result.tags {
            tracing::info!(
                "Tick {}: {} tagged {} (weight {})",
                tick,
                tag.attacker,
                tag.flag,
                tag.weight
            );
            events.push(
                GameEventKind::Tagged {
                    attacker: tag.attacker,
                    flag: tag.flag,
                    weight: tag.weight,
                },
                format!("{} tagged {}", tag.attacker, tag.flag),
                tick,
            );
        }

        tracing::debug!(
            "Tick {} resolved: {} attackers, {} defenders, payoff {:.3}",
            tick,
            result.attackers_remaining,
            result.defenders_remaining,
            self.payoff
        );

        let terminal = if result.attackers_remaining == 0 {
            Some(TerminationReason::AllAttackersCaptured)
        } else if tick >= self.config.max_time {
            Some(TerminationReason::MaxTimeReached)
        } else {
            None
        };

        match terminal {
            None => {
                let snapshot = self.snapshot(result, decisions, events, None);
                self.publisher.publish(&snapshot)?;
            }
            Some(reason) => {
                tracing::info!("Game over at tick {}: {} (payoff {:.3})", tick, reason, self.payoff);
                events.push(GameEventKind::Terminated { reason }, reason.to_string(), tick);
                self.state = LoopState::Terminated(reason);
                let snapshot = self.snapshot(result, decisions, events, Some(reason));
                self.publish_final(&snapshot);
            }
        }

        Ok(())
    }

    /// Terminate outside the normal flow, with one best-effort final publish
    fn terminate(&mut self, reason: TerminationReason, detail: String) {
        self.state = LoopState::Terminated(reason);

        let mut events = std::mem::take(&mut self.pending);
        events.push(GameEventKind::Terminated { reason }, detail, self.tick);
        let result = TickResult::counts_only(&self.registry);
        let snapshot = self.snapshot(result, Vec::new(), events, Some(reason));
        self.publish_final(&snapshot);
    }

    /// Final snapshots never fail the loop; errors and panics are logged
    fn publish_final(&mut self, snapshot: &Arc<TickSnapshot>) {
        let publisher = &mut self.publisher;
        match panic::catch_unwind(AssertUnwindSafe(|| publisher.publish(snapshot))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Final snapshot publish failed: {}", e),
            Err(payload) => tracing::error!(
                "Final snapshot publish panicked: {}",
                panic_message(payload.as_ref())
            ),
        }
    }

    fn snapshot(
        &self,
        result: TickResult,
        decisions: Vec<Decision>,
        events: GameEventLog,
        terminal: Option<TerminationReason>,
    ) -> Arc<TickSnapshot> {
        Arc::new(TickSnapshot {
            tick: self.tick,
            payoff: self.payoff,
            graph: Arc::clone(&self.graph),
            agents: self.registry.iter().map(AgentSnapshot::from).collect(),
            flags: self.flags.all().to_vec(),
            result,
            decisions,
            events: events.into_events(),
            terminal,
        })
    }
}
