//! JSON-lines collector: one line per `track` call.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use trackwire_core::{Collector, Properties, TrackError, TrackResult};

#[derive(Serialize)]
struct TrackLine<'a> {
    at_ms: u64,
    event: &'a str,
    properties: &'a Properties,
}

pub struct JsonLinesCollector<W> {
    out: Mutex<W>,
    started: Instant,
    delivered: AtomicUsize,
}

impl<W: Write + Send> JsonLinesCollector<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            started: Instant::now(),
            delivered: AtomicUsize::new(0),
        }
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Write a line that is not a `track` call (the summary).
    pub fn write_line<T: Serialize>(&self, value: &T) -> TrackResult<()> {
        let line = serde_json::to_string(value)?;
        let mut out = self.out.lock();
        writeln!(out, "{line}").map_err(|e| TrackError::Collector(e.to_string()))?;
        out.flush().map_err(|e| TrackError::Collector(e.to_string()))
    }
}

impl<W: Write + Send> Collector for JsonLinesCollector<W> {
    fn track(&self, event_name: &str, properties: &Properties) -> TrackResult<()> {
        self.write_line(&TrackLine {
            at_ms: self.started.elapsed().as_millis() as u64,
            event: event_name,
            properties,
        })?;
        self.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
