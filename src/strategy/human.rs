//! Human input - the only decision path that may block a tick
//!
//! The wait has no timeout. It polls the game's interrupt handle so that an
//! interrupt always unblocks it and the loop can exit cleanly.

use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::types::NodeId;
use crate::engine::interrupt::InterruptHandle;
use crate::engine::view::GameStateView;
use crate::strategy::{Action, DecisionError, Strategy};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Source of actions for agents without an automated strategy
pub trait InputProvider: Send + Sync + fmt::Debug {
    fn request_action(&self, view: &GameStateView<'_>) -> Result<Action, DecisionError>;
}

/// Strategy wrapper that delegates to an input provider
#[derive(Debug, Clone)]
pub struct HumanInput {
    provider: Arc<dyn InputProvider>,
}

impl HumanInput {
    pub fn new(provider: Arc<dyn InputProvider>) -> Self {
        Self { provider }
    }
}

impl Strategy for HumanInput {
    fn name(&self) -> &str {
        "human"
    }

    fn decide(&self, view: &GameStateView<'_>) -> Result<Action, DecisionError> {
        self.provider.request_action(view)
    }

    fn may_block(&self) -> bool {
        true
    }
}

/// Sending half handed to whatever reads the player's choices
#[derive(Debug, Clone)]
pub struct InputSender {
    sender: Sender<NodeId>,
}

impl InputSender {
    /// Queue a target node; false once the game side is gone
    pub fn send(&self, node: NodeId) -> bool {
        self.sender.send(node).is_ok()
    }
}

/// Provider fed through a channel, one node per request
#[derive(Debug)]
pub struct ChannelInputProvider {
    receiver: Mutex<Receiver<NodeId>>,
    interrupt: InterruptHandle,
    poll_interval: Duration,
}

impl ChannelInputProvider {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Create a connected sender/provider pair
pub fn input_channel(interrupt: InterruptHandle) -> (InputSender, ChannelInputProvider) {
    let (sender, receiver) = mpsc::channel();
    (
        InputSender { sender },
        ChannelInputProvider {
            receiver: Mutex::new(receiver),
            interrupt,
            poll_interval: DEFAULT_POLL_INTERVAL,
        },
    )
}

impl InputProvider for ChannelInputProvider {
    fn request_action(&self, view: &GameStateView<'_>) -> Result<Action, DecisionError> {
        let receiver = self
            .receiver
            .lock()
            .map_err(|_| DecisionError::Failed("input channel lock poisoned".into()))?;

        tracing::info!(
            "Waiting for input: agent '{}' at {} (tick {})",
            view.name,
            view.position,
            view.tick
        );

        loop {
            if self.interrupt.is_interrupted() {
                return Err(DecisionError::Interrupted);
            }
            match receiver.recv_timeout(self.poll_interval) {
                Ok(node) => return Ok(Action::move_to(node)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(DecisionError::Failed("input channel closed".into()));
                }
            }
        }
    }
}
