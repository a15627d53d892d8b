//! The external analytics collector the tracker forwards to.
//!
//! On a real page this is the collector's global `track(name, properties)`
//! function; embeddings wrap it in a [`Collector`]. The in-memory
//! implementations here back tests and the replay tool.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::error::{TrackError, TrackResult};
use crate::types::Properties;

/// Anything that accepts `(event name, properties)` pairs.
pub trait Collector: Send + Sync {
    fn track(&self, event_name: &str, properties: &Properties) -> TrackResult<()>;
}

/// One recorded `track` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackCall {
    pub event_name: String,
    pub properties: Properties,
}

/// In-memory collector that records every call.
#[derive(Default)]
pub struct CaptureCollector {
    calls: Mutex<Vec<TrackCall>>,
}

impl CaptureCollector {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<TrackCall> {
        self.calls.lock().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|c| c.event_name.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn count_named(&self, event_name: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.event_name == event_name)
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl Collector for CaptureCollector {
    fn track(&self, event_name: &str, properties: &Properties) -> TrackResult<()> {
        self.calls.lock().push(TrackCall {
            event_name: event_name.to_string(),
            properties: properties.clone(),
        });
        Ok(())
    }
}

/// Collector whose `track` always fails.
pub struct FailingCollector;

impl Collector for FailingCollector {
    fn track(&self, event_name: &str, _properties: &Properties) -> TrackResult<()> {
        Err(TrackError::Collector(format!("rejected {event_name}")))
    }
}

/// Convenience: create a capture collector for tests.
pub fn capture_collector() -> Arc<CaptureCollector> {
    Arc::new(CaptureCollector::new())
}
