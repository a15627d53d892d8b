//! Cross-origin message routing.
//!
//! One `message` listener on the window feeds an ordered routing table.
//! Each [`MessageRoute`] is selected by origin plus a payload predicate;
//! the first match handles the message.

use std::borrow::Cow;
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tracing::debug;

use trackwire_core::{EffectiveConfig, SourceId, TrackResult};

use super::{crm, form_widget, scheduling, InstallContext, SourceAdaptor};
use crate::page::{DomEvent, EventKind, EventTarget, MessageEvent};

/// Third-party integrations that report through `postMessage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRoute {
    FormWidget,
    Scheduling,
    CrmScheduling,
}

impl MessageRoute {
    pub const ALL: [MessageRoute; 3] = [
        MessageRoute::FormWidget,
        MessageRoute::Scheduling,
        MessageRoute::CrmScheduling,
    ];

    pub fn source(&self) -> SourceId {
        match self {
            MessageRoute::FormWidget => SourceId::FormWidget,
            MessageRoute::Scheduling => SourceId::Scheduling,
            MessageRoute::CrmScheduling => SourceId::CrmScheduling,
        }
    }

    pub fn matches(&self, message: &MessageEvent) -> bool {
        match self {
            MessageRoute::FormWidget => form_widget::matches(message),
            MessageRoute::Scheduling => scheduling::matches(message),
            MessageRoute::CrmScheduling => crm::matches(message),
        }
    }

    pub fn handle(&self, ctx: &InstallContext, message: &MessageEvent) -> TrackResult<()> {
        match self {
            MessageRoute::FormWidget => form_widget::handle(ctx, message),
            MessageRoute::Scheduling => scheduling::handle(ctx, message),
            MessageRoute::CrmScheduling => crm::handle(ctx, message),
        }
    }
}

/// Routing table over the enabled message-driven sources.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    routes: Vec<MessageRoute>,
}

impl MessageRouter {
    pub fn new(routes: Vec<MessageRoute>) -> Self {
        Self { routes }
    }

    pub fn from_config(config: &EffectiveConfig) -> Self {
        Self::new(
            MessageRoute::ALL
                .into_iter()
                .filter(|route| config.is_enabled(route.source()))
                .collect(),
        )
    }

    pub fn routes(&self) -> &[MessageRoute] {
        &self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First route accepting `message`.
    pub fn route(&self, message: &MessageEvent) -> Option<MessageRoute> {
        self.routes.iter().copied().find(|r| r.matches(message))
    }
}

impl SourceAdaptor for MessageRouter {
    fn name(&self) -> &str {
        "messages"
    }

    fn install(&self, ctx: &InstallContext) -> Result<()> {
        let router = self.clone();
        let listener_ctx = ctx.clone();
        ctx.page.add_event_listener(
            EventTarget::Window,
            EventKind::Message,
            Arc::new(move |event| {
                let DomEvent::Message(message) = event else {
                    return;
                };
                let Some(route) = router.route(message) else {
                    return;
                };
                debug!(source = %route.source(), origin = %message.origin, "routing widget message");
                if let Err(e) = route.handle(&listener_ctx, message) {
                    listener_ctx
                        .dispatcher
                        .report_failure(route.source().as_str(), &e);
                }
            }),
        );
        Ok(())
    }
}

/// Widgets post either a JSON object or a JSON-encoded string.
pub(crate) fn decode_data(data: &Value) -> Cow<'_, Value> {
    match data {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed) => Cow::Owned(parsed),
            Err(_) => Cow::Borrowed(data),
        },
        other => Cow::Borrowed(other),
    }
}
