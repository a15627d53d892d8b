//! Event dispatcher: the single path from adaptors (and the public
//! `log_event`) to the collector.
//!
//! Sanitizes the name, stamps a dispatch-time timestamp, and forwards. Any
//! failure drops the event; it is only logged when debug mode is on.
//!
//! Deliveries are serialized, and opening the gate delivers its backlog
//! under the same lock, so nothing admitted after the transition can
//! overtake a buffered event.

use std::sync::Arc;

use parking_lot::ReentrantMutex;
use tracing::{debug, warn};

use trackwire_core::{
    sanitize_event_name, PendingEvent, Properties, QueuedEvent, TrackError, TrackResult,
};

use crate::events::TrackedEvent;
use crate::gate::{Admission, ReadinessGate};
use crate::page::Page;

pub struct Dispatcher {
    page: Arc<Page>,
    gate: Arc<ReadinessGate>,
    debug: bool,
    // reentrant: a collector may log from inside `track`
    delivery: ReentrantMutex<()>,
}

impl Dispatcher {
    pub fn new(page: Arc<Page>, gate: Arc<ReadinessGate>, debug: bool) -> Self {
        Self {
            page,
            gate,
            debug,
            delivery: ReentrantMutex::new(()),
        }
    }

    /// Log an event. Safe to call in any gate state; never fails.
    pub fn log_event(&self, event_name: &str, properties: Properties) {
        match self.gate.admit(QueuedEvent::new(event_name, properties)) {
            Admission::Deliver(event) => self.deliver(event),
            Admission::Buffered => {
                debug!(event = %event_name, "collector not ready, event queued");
            }
            Admission::Dropped(event) => {
                if self.debug {
                    warn!(event = %event.event_name, "collector never became ready, event dropped");
                }
            }
        }
    }

    /// Flatten a typed record and log it.
    pub fn emit<E: TrackedEvent>(&self, event_name: &str, record: &E) {
        match record.to_properties() {
            Ok(properties) => self.log_event(event_name, properties),
            Err(e) => self.report_failure(event_name, &e),
        }
    }

    /// Open the gate and deliver its backlog. Returns how many events were
    /// buffered, or `None` when the gate had already left `NotReady`.
    pub fn open_gate(&self) -> Option<usize> {
        let _order = self.delivery.lock();
        let queued = self.gate.open()?;
        let count = queued.len();
        self.drain(queued);
        Some(count)
    }

    /// Deliver events drained from the gate, in order.
    pub fn drain(&self, events: Vec<QueuedEvent>) {
        if !events.is_empty() {
            debug!(count = events.len(), "delivering queued events");
        }
        for event in events {
            self.deliver(event);
        }
    }

    /// Record a failure caught at the dispatch boundary.
    pub fn report_failure(&self, context: &str, error: &TrackError) {
        if self.debug {
            warn!(context, error = %error, "event dropped");
        }
    }

    fn deliver(&self, event: QueuedEvent) {
        let _order = self.delivery.lock();
        let raw_name = event.event_name.clone();
        if let Err(e) = self.try_deliver(event) {
            self.report_failure(&raw_name, &e);
        }
    }

    fn try_deliver(&self, event: QueuedEvent) -> TrackResult<()> {
        let pending = PendingEvent::stamp(event);
        let name = sanitize_event_name(&pending.raw_name);
        if name.is_empty() {
            return Err(TrackError::EmptyEventName(pending.raw_name));
        }
        let properties = pending.enhanced_properties();
        let collector = self
            .page
            .collector()
            .ok_or(TrackError::CollectorUnavailable)?;

        collector.track(&name, &properties)?;
        debug!(event = %name, raw = %pending.raw_name, "event sent to collector");
        Ok(())
    }
}
