use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Property bag handed to the collector alongside the event name.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Property key that carries the dispatch-time timestamp.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Interaction sources the tracker can observe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Native `<form>` submissions.
    Forms,
    /// Embedded form widget (Tally).
    FormWidget,
    /// Scheduling widget (Calendly).
    Scheduling,
    /// CRM meetings widget (HubSpot).
    CrmScheduling,
    OutboundLinks,
    ContactLinks,
    ScrollDepth,
}

impl SourceId {
    pub const ALL: [SourceId; 7] = [
        SourceId::Forms,
        SourceId::FormWidget,
        SourceId::Scheduling,
        SourceId::CrmScheduling,
        SourceId::OutboundLinks,
        SourceId::ContactLinks,
        SourceId::ScrollDepth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Forms => "forms",
            SourceId::FormWidget => "form_widget",
            SourceId::Scheduling => "scheduling",
            SourceId::CrmScheduling => "crm_scheduling",
            SourceId::OutboundLinks => "outbound_links",
            SourceId::ContactLinks => "contact_links",
            SourceId::ScrollDepth => "scroll_depth",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event captured before the collector was ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedEvent {
    pub event_name: String,
    pub properties: Properties,
}

impl QueuedEvent {
    pub fn new(event_name: impl Into<String>, properties: Properties) -> Self {
        Self {
            event_name: event_name.into(),
            properties,
        }
    }
}

/// An event at dispatch time. The timestamp is taken here, not at capture.
#[derive(Debug, Clone)]
pub struct PendingEvent {
    pub raw_name: String,
    pub properties: Properties,
    pub timestamp: DateTime<Utc>,
}

impl PendingEvent {
    pub fn stamp(event: QueuedEvent) -> Self {
        Self {
            raw_name: event.event_name,
            properties: event.properties,
            timestamp: Utc::now(),
        }
    }

    /// Properties with the ISO-8601 timestamp merged in, replacing any
    /// caller-supplied `timestamp` key.
    pub fn enhanced_properties(&self) -> Properties {
        let mut props = self.properties.clone();
        props.insert(
            TIMESTAMP_KEY.to_string(),
            serde_json::Value::String(
                self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        );
        props
    }
}

/// Readiness of the external collector, as seen by the tracker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    NotReady,
    Ready,
    Failed,
}
