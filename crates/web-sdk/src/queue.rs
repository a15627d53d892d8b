//! FIFO buffer for events logged before the collector is ready.

use std::collections::VecDeque;

use trackwire_core::QueuedEvent;

/// Unbounded while the gate is closed; drained exactly once when it opens.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<QueuedEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, event: QueuedEvent) {
        self.events.push_back(event);
    }

    /// Remove and return every entry in insertion order.
    pub fn drain_all(&mut self) -> Vec<QueuedEvent> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
