//! Embedded form widget (Tally): submissions arrive as `postMessage`
//! events from the widget's iframe.

use serde_json::Value;

use trackwire_core::{SourceId, TrackError, TrackResult};

use super::messages::decode_data;
use super::InstallContext;
use crate::events::WidgetFormSubmission;
use crate::page::MessageEvent;

pub const WIDGET_ORIGIN: &str = "https://tally.so";
pub const SUBMITTED_EVENT: &str = "Tally.FormSubmitted";

pub fn matches(message: &MessageEvent) -> bool {
    message.origin == WIDGET_ORIGIN
        && decode_data(&message.data)
            .get("event")
            .and_then(Value::as_str)
            == Some(SUBMITTED_EVENT)
}

pub fn handle(ctx: &InstallContext, message: &MessageEvent) -> TrackResult<()> {
    let data = decode_data(&message.data);
    let payload = data
        .get("payload")
        .ok_or_else(|| TrackError::Payload("submission without payload".into()))?;
    let form_id = payload
        .get("formId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| TrackError::Payload("submission without formId".into()))?;

    let embed_marker = format!("/embed/{form_id}");
    let iframe = ctx
        .page
        .find_first(|el| {
            el.tag == "iframe"
                && ["src", "data-tally-src"]
                    .iter()
                    .filter_map(|attr| el.attr(attr))
                    .any(|src| src.contains(&embed_marker))
        })
        .ok_or_else(|| TrackError::MissingElement(format!("widget iframe for form {form_id}")))?;

    let event_name = match ctx.nearest_override(iframe) {
        Some(name) => name,
        None => ctx.default_name(SourceId::FormWidget, None)?,
    };

    let record = WidgetFormSubmission {
        form_name: ctx.page.attribute(iframe, "title"),
        form_id: form_id.to_string(),
        response_id: payload.get("id").and_then(Value::as_str).map(str::to_string),
    };
    ctx.dispatcher.emit(&event_name, &record);
    Ok(())
}
