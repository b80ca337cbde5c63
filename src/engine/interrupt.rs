//! Cooperative cancellation for the game loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag raised by Ctrl-C handlers or embedding code
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
