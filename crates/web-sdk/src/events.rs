//! Typed per-source event records. Each adaptor builds one of these and the
//! dispatcher flattens it into a property map only at the collector boundary.

use serde::{Deserialize, Serialize};

use trackwire_core::{Properties, TrackError, TrackResult};

/// A record that can be handed to the collector as a property map.
pub trait TrackedEvent: Serialize {
    fn to_properties(&self) -> TrackResult<Properties> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(TrackError::Payload(format!(
                "event record serialized to non-object: {other}"
            ))),
        }
    }
}

/// Native `<form>` submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSubmission {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
}

/// Embedded form widget submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetFormSubmission {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_name: Option<String>,
    pub form_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
}

/// Scheduling widget booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub form_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitee_id: Option<String>,
}

/// CRM meetings widget booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingBooked {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_date: Option<String>,
    /// Forwarded as the widget sent it (epoch milliseconds or a date string).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_start: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_end: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_duration: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollDepthReached {
    pub percentage: u32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundLink {
    pub url: String,
}

/// `tel:` / `mailto:` link. Serializes as `{"number": ..}` or `{"email": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContactLink {
    Phone { number: String },
    Email { email: String },
}

impl ContactLink {
    /// Subtype key used to pick the configured event name.
    pub fn subtype(&self) -> &'static str {
        match self {
            ContactLink::Phone { .. } => "phone",
            ContactLink::Email { .. } => "email",
        }
    }
}

impl TrackedEvent for FormSubmission {}
impl TrackedEvent for WidgetFormSubmission {}
impl TrackedEvent for ScheduledEvent {}
impl TrackedEvent for MeetingBooked {}
impl TrackedEvent for ScrollDepthReached {}
impl TrackedEvent for OutboundLink {}
impl TrackedEvent for ContactLink {}
impl TrackedEvent for Properties {}
