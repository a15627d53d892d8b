//! Readiness gate: holds events back until the collector is present.
//!
//! `NotReady → Ready` or `NotReady → Failed`; both targets are terminal.
//! The state and the pending queue sit under one lock so an event is
//! either buffered before the transition or delivered after it, never lost
//! in between.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use trackwire_core::{GateState, QueuedEvent};

use crate::queue::EventQueue;

/// Outcome of offering an event to the gate.
#[derive(Debug, PartialEq)]
pub enum Admission {
    /// Gate is open: deliver now.
    Deliver(QueuedEvent),
    /// Gate is closed: buffered for the drain.
    Buffered,
    /// Gate has failed: the event will never be delivered.
    Dropped(QueuedEvent),
}

struct GateInner {
    state: GateState,
    queue: EventQueue,
}

pub struct ReadinessGate {
    inner: Mutex<GateInner>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GateInner {
                state: GateState::NotReady,
                queue: EventQueue::new(),
            }),
        }
    }

    pub fn state(&self) -> GateState {
        self.inner.lock().state
    }

    /// Number of events waiting for the gate to open.
    pub fn pending(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn admit(&self, event: QueuedEvent) -> Admission {
        let mut inner = self.inner.lock();
        match inner.state {
            GateState::Ready => Admission::Deliver(event),
            GateState::NotReady => {
                inner.queue.enqueue(event);
                Admission::Buffered
            }
            GateState::Failed => Admission::Dropped(event),
        }
    }

    /// Open the gate. Returns the buffered events in FIFO order, or `None`
    /// when the gate already left `NotReady`.
    pub fn open(&self) -> Option<Vec<QueuedEvent>> {
        let mut inner = self.inner.lock();
        if inner.state != GateState::NotReady {
            return None;
        }
        inner.state = GateState::Ready;
        Some(inner.queue.drain_all())
    }

    /// Give up. Returns how many buffered events are stranded, or `None`
    /// when the gate already left `NotReady`.
    pub fn fail(&self) -> Option<usize> {
        let mut inner = self.inner.lock();
        if inner.state != GateState::NotReady {
            return None;
        }
        inner.state = GateState::Failed;
        Some(inner.queue.len())
    }
}

/// Poll `check` every `delay`, at most `attempts` times, strictly one after
/// another. Returns the attempt number that saw the collector.
pub async fn poll_for_collector(
    check: impl Fn() -> bool,
    attempts: u32,
    delay: Duration,
) -> Option<u32> {
    for attempt in 1..=attempts {
        tokio::time::sleep(delay).await;
        if check() {
            return Some(attempt);
        }
        debug!(attempt, attempts, "collector not present yet");
    }
    None
}
