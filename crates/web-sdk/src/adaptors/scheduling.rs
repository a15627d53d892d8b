//! Scheduling widget (Calendly): bookings arrive as namespaced
//! `postMessage` events from the inline embed.

use serde_json::Value;
use url::Url;

use trackwire_core::{SourceId, TrackError, TrackResult};

use super::messages::decode_data;
use super::InstallContext;
use crate::events::ScheduledEvent;
use crate::page::MessageEvent;

pub const WIDGET_ORIGIN: &str = "https://calendly.com";
pub const SCHEDULED_EVENT: &str = "calendly.event_scheduled";
/// Attribute the inline embed keeps its booking page URL in.
pub const EMBED_URL_ATTRIBUTE: &str = "data-url";

pub fn matches(message: &MessageEvent) -> bool {
    if message.origin != WIDGET_ORIGIN {
        return false;
    }
    decode_data(&message.data)
        .get("event")
        .and_then(Value::as_str)
        == Some(SCHEDULED_EVENT)
}

pub fn handle(ctx: &InstallContext, message: &MessageEvent) -> TrackResult<()> {
    let embed = ctx
        .page
        .find_first(|el| {
            el.attr(EMBED_URL_ATTRIBUTE)
                .is_some_and(|url| url.starts_with(WIDGET_ORIGIN))
        })
        .ok_or_else(|| TrackError::MissingElement("scheduling widget embed".into()))?;
    let form_url = ctx
        .page
        .attribute(embed, EMBED_URL_ATTRIBUTE)
        .ok_or_else(|| TrackError::MissingElement("scheduling widget url".into()))?;

    let event_name = match ctx.nearest_override(embed) {
        Some(name) => name,
        None => ctx.default_name(SourceId::Scheduling, None)?,
    };

    let data = decode_data(&message.data);
    let record = ScheduledEvent {
        form_url,
        event_id: payload_str(&data, "/payload/event/uri")
            .and_then(|u| id_after_segment(u, "scheduled_events")),
        invitee_id: payload_str(&data, "/payload/invitee/uri")
            .and_then(|u| id_after_segment(u, "invitees")),
    };
    ctx.dispatcher.emit(&event_name, &record);
    Ok(())
}

fn payload_str<'a>(data: &'a Value, pointer: &str) -> Option<&'a str> {
    data.pointer(pointer).and_then(Value::as_str)
}

/// `https://api.calendly.com/scheduled_events/ABC/invitees/XYZ` with
/// segment `invitees` yields `XYZ`.
pub fn id_after_segment(uri: &str, segment: &str) -> Option<String> {
    let url = Url::parse(uri).ok()?;
    let mut segments = url.path_segments()?;
    segments.find(|s| *s == segment)?;
    segments
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
