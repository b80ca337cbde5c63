//! One-way snapshot publication to logging and visualization consumers

use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::core::error::{PursuitError, Result};
use crate::engine::snapshot::TickSnapshot;

/// Consumer of resolved tick snapshots
///
/// Observers only ever read; nothing they do feeds back into the game.
pub trait SnapshotObserver: Send {
    fn on_snapshot(&mut self, snapshot: &Arc<TickSnapshot>) -> Result<()>;
}

/// Fans snapshots out to every registered observer
#[derive(Default)]
pub struct SnapshotPublisher {
    observers: Vec<Box<dyn SnapshotObserver>>,
}

impl fmt::Debug for SnapshotPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotPublisher")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Box<dyn SnapshotObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver to all observers; a failing observer does not starve the rest
    ///
    /// Returns the first error seen.
    pub fn publish(&mut self, snapshot: &Arc<TickSnapshot>) -> Result<()> {
        let mut first_error = None;
        for observer in &mut self.observers {
            if let Err(e) = observer.on_snapshot(snapshot) {
                tracing::error!("Snapshot observer failed at tick {}: {}", snapshot.tick, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Forwards snapshots over a channel, e.g. to a visualization thread
#[derive(Debug)]
pub struct ChannelObserver {
    sender: Sender<Arc<TickSnapshot>>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<Arc<TickSnapshot>>) -> Self {
        Self { sender }
    }
}

impl SnapshotObserver for ChannelObserver {
    fn on_snapshot(&mut self, snapshot: &Arc<TickSnapshot>) -> Result<()> {
        self.sender
            .send(Arc::clone(snapshot))
            .map_err(|_| PursuitError::Observer("snapshot receiver dropped".into()))
    }
}
