//! Simulation engine - per-tick orchestration
//!
//! The loop owns all mutable game state. Decisions read a frozen view,
//! moves commit together, then captures and tags resolve and a snapshot
//! goes out to observers.

pub mod events;
pub mod game_loop;
pub mod interrupt;
pub mod invoker;
pub mod payoff;
pub mod publish;
pub mod resolver;
pub mod setup;
pub mod snapshot;
pub mod view;

pub use events::{GameEvent, GameEventKind, GameEventLog};
pub use game_loop::{GameLoop, GameSummary, LoopState, TerminationReason};
pub use interrupt::InterruptHandle;
pub use invoker::{Decision, DecisionOutcome, FallbackReason, StrategyInvoker, TickContext, TickError};
pub use publish::{ChannelObserver, SnapshotObserver, SnapshotPublisher};
pub use resolver::{Capture, InteractionResolver, Tag, TickResult};
pub use setup::initialize_game;
pub use snapshot::{AgentSnapshot, TickSnapshot};
pub use view::{FlagView, GameStateView};
