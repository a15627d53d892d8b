//! CRM meetings widget (HubSpot): a successful booking posts a message
//! carrying the booking response.

use serde_json::Value;

use trackwire_core::{SourceId, TrackError, TrackResult};

use super::messages::decode_data;
use super::InstallContext;
use crate::events::MeetingBooked;
use crate::page::MessageEvent;

pub const ORIGIN_DOMAIN: &str = "hubspot.com";
pub const CONTAINER_CLASS: &str = "meetings-iframe-container";

const BOOKING: &str = "/meetingsPayload/bookingResponse";

pub fn matches(message: &MessageEvent) -> bool {
    message.origin.contains(ORIGIN_DOMAIN)
        && decode_data(&message.data)
            .get("meetingBookSucceeded")
            .and_then(Value::as_bool)
            == Some(true)
}

pub fn handle(ctx: &InstallContext, message: &MessageEvent) -> TrackResult<()> {
    let container = ctx
        .page
        .first_by_class(CONTAINER_CLASS)
        .ok_or_else(|| TrackError::MissingElement(format!(".{CONTAINER_CLASS}")))?;

    let event_name = match ctx.nearest_override(container) {
        Some(name) => name,
        None => ctx.default_name(SourceId::CrmScheduling, None)?,
    };

    let data = decode_data(&message.data);

    let record = MeetingBooked {
        organizer: booking_field(&data, "/postResponse/organizer/name")
            .and_then(Value::as_str)
            .map(str::to_string),
        meeting_date: booking_field(&data, "/event/dateString")
            .and_then(Value::as_str)
            .map(str::to_string),
        meeting_start: booking_value(&data, "/postResponse/timerange/start"),
        meeting_end: booking_value(&data, "/postResponse/timerange/end"),
        meeting_duration: booking_value(&data, "/event/duration"),
    };
    ctx.dispatcher.emit(&event_name, &record);
    Ok(())
}

fn booking_field<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    data.pointer(&format!("{BOOKING}{path}"))
}

fn booking_value(data: &Value, path: &str) -> Option<Value> {
    booking_field(data, path).filter(|v| !v.is_null()).cloned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::gate::ReadinessGate;
    use crate::page::Page;
    use serde_json::json;
    use std::sync::Arc;
    use trackwire_core::collector::capture_collector;
    use trackwire_core::EffectiveConfig;

    fn booked() -> MessageEvent {
        MessageEvent {
            origin: "https://meetings.hubspot.com".into(),
            data: json!({
                "meetingBookSucceeded": true,
                "meetingsPayload": {
                    "bookingResponse": {
                        "event": {"dateString": "2026-10-20", "duration": 1_800_000},
                        "postResponse": {
                            "organizer": {"name": "Dana Lee"},
                            "timerange": {"start": 1_792_508_400_000_i64, "end": 1_792_510_200_000_i64}
                        }
                    }
                }
            }),
        }
    }

    #[test]
    fn test_matches() {
        assert!(matches(&booked()));

        let pending = MessageEvent {
            origin: "https://meetings.hubspot.com".into(),
            data: json!({"meetingBookSucceeded": false}),
        };
        assert!(!matches(&pending));

        let mut elsewhere = booked();
        elsewhere.origin = "https://example.com".into();
        assert!(!matches(&elsewhere));
    }

    #[test]
    fn test_handle_reads_nested_fields() {
        let page = Arc::new(Page::new("https://example.com/").unwrap());
        let container = page.create_element("div", None);
        page.set_attribute(container, "class", "meetings-iframe-container");
        page.set_attribute(container, "data-event-name", "Sales Call Booked");

        let collector = capture_collector();
        page.install_collector(collector.clone());
        let gate = Arc::new(ReadinessGate::new());
        gate.open();
        let ctx = InstallContext {
            page: page.clone(),
            dispatcher: Arc::new(Dispatcher::new(page, gate, false)),
            config: Arc::new(EffectiveConfig::default()),
        };

        handle(&ctx, &booked()).unwrap();

        let calls = collector.calls();
        let call = &calls[0];
        assert_eq!(call.event_name, "sales_call_booked");
        assert_eq!(call.properties["organizer"], "Dana Lee");
        assert_eq!(call.properties["meeting_date"], "2026-10-20");
        assert_eq!(call.properties["meeting_start"], 1_792_508_400_000_i64);
        assert_eq!(call.properties["meeting_end"], 1_792_510_200_000_i64);
        assert_eq!(call.properties["meeting_duration"], 1_800_000);
    }

    #[test]
    fn test_times_forwarded_as_given() {
        let page = Arc::new(Page::new("https://example.com/").unwrap());
        let container = page.create_element("div", None);
        page.set_attribute(container, "class", "meetings-iframe-container");
        let collector = capture_collector();
        page.install_collector(collector.clone());
        let gate = Arc::new(ReadinessGate::new());
        gate.open();
        let ctx = InstallContext {
            page: page.clone(),
            dispatcher: Arc::new(Dispatcher::new(page, gate, false)),
            config: Arc::new(EffectiveConfig::default()),
        };

        let message = MessageEvent {
            origin: "https://meetings.hubspot.com".into(),
            data: json!({
                "meetingBookSucceeded": true,
                "meetingsPayload": {"bookingResponse": {
                    "event": {"duration": 1800000.0},
                    "postResponse": {"timerange": {
                        "start": "2026-10-20T15:00:00Z",
                        "end": "2026-10-20T15:30:00Z"
                    }}
                }}
            }),
        };
        handle(&ctx, &message).unwrap();

        let calls = collector.calls();
        let props = &calls[0].properties;
        assert_eq!(props["meeting_start"], "2026-10-20T15:00:00Z");
        assert_eq!(props["meeting_end"], "2026-10-20T15:30:00Z");
        assert_eq!(props["meeting_duration"], json!(1800000.0));
    }

    #[test]
    fn test_sparse_payload_still_tracks() {
        let page = Arc::new(Page::new("https://example.com/").unwrap());
        let container = page.create_element("div", None);
        page.set_attribute(container, "class", "meetings-iframe-container");
        let collector = capture_collector();
        page.install_collector(collector.clone());
        let gate = Arc::new(ReadinessGate::new());
        gate.open();
        let ctx = InstallContext {
            page: page.clone(),
            dispatcher: Arc::new(Dispatcher::new(page, gate, false)),
            config: Arc::new(EffectiveConfig::default()),
        };

        let message = MessageEvent {
            origin: "https://meetings.hubspot.com".into(),
            data: json!({"meetingBookSucceeded": true}),
        };
        handle(&ctx, &message).unwrap();

        let calls = collector.calls();
        let call = &calls[0];
        assert_eq!(call.event_name, "meeting_booked");
        assert!(!call.properties.contains_key("organizer"));
    }
}
