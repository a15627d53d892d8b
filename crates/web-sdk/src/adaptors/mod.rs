//! Source adaptors: one per tracked interaction source.
//!
//! Each adaptor implements [`SourceAdaptor`] and is installed once, after
//! the collector is ready. Listener-bound adaptors resolve their event name
//! at install time; message-driven sources share the single
//! [`messages::MessageRouter`] and resolve per message.

pub mod crm;
pub mod form_widget;
pub mod forms;
pub mod links;
pub mod messages;
pub mod scheduling;
pub mod scroll;

use std::sync::Arc;

use anyhow::Result;

use trackwire_core::{EffectiveConfig, SourceId, TrackError, TrackResult};

use crate::dispatcher::Dispatcher;
use crate::page::{NodeId, Page};

/// Adaptor trait: wires one interaction source into the page.
pub trait SourceAdaptor: Send + Sync {
    /// Identifier used in logs (e.g. "forms", "messages").
    fn name(&self) -> &str;

    /// Attach listeners or annotate elements. Failures are isolated per
    /// adaptor by the caller.
    fn install(&self, ctx: &InstallContext) -> Result<()>;
}

/// Everything an adaptor needs at install time and inside its listeners.
#[derive(Clone)]
pub struct InstallContext {
    pub page: Arc<Page>,
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<EffectiveConfig>,
}

impl InstallContext {
    /// Configured event name for `source`, before element overrides.
    /// Fails when the source's configuration is malformed.
    pub fn default_name(&self, source: SourceId, subtype: Option<&str>) -> TrackResult<String> {
        self.config
            .require_source(source)?
            .event_name
            .resolve(subtype)
            .map(str::to_string)
            .ok_or_else(|| TrackError::Config(format!("no event name configured for {source}")))
    }

    /// Override carried by `node` or its nearest ancestor.
    pub fn nearest_override(&self, node: NodeId) -> Option<String> {
        let attribute = &self.config.markup.override_attribute;
        self.page
            .closest_with_attribute(node, attribute)
            .and_then(|owner| self.page.attribute(owner, attribute))
    }

    /// Override carried by `node` itself.
    pub fn direct_override(&self, node: NodeId) -> Option<String> {
        self.page
            .attribute(node, &self.config.markup.override_attribute)
    }
}

/// Build the adaptors for every enabled source, in install order.
pub fn enabled_adaptors(config: &EffectiveConfig) -> Vec<Box<dyn SourceAdaptor>> {
    let mut adaptors: Vec<Box<dyn SourceAdaptor>> = Vec::new();

    if config.is_enabled(SourceId::Forms) {
        adaptors.push(Box::new(forms::FormsAdaptor));
    }

    let router = messages::MessageRouter::from_config(config);
    if !router.is_empty() {
        adaptors.push(Box::new(router));
    }

    if config.is_enabled(SourceId::OutboundLinks) {
        adaptors.push(Box::new(links::OutboundLinksAdaptor));
    }
    if config.is_enabled(SourceId::ContactLinks) {
        adaptors.push(Box::new(links::ContactLinksAdaptor));
    }
    if config.is_enabled(SourceId::ScrollDepth) {
        adaptors.push(Box::new(scroll::ScrollDepthAdaptor::from_config(config)));
    }

    adaptors
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_adaptor_set() {
        let names: Vec<String> = enabled_adaptors(&EffectiveConfig::default())
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(names, vec!["forms", "messages", "outbound_links", "contact_links"]);
    }

    #[test]
    fn test_all_message_sources_disabled_skips_router() {
        let config = EffectiveConfig::resolve(&json!({
            "tracking": {
                "form_widget": {"enabled": false},
                "scheduling": {"enabled": false},
                "crm_scheduling": {"enabled": false},
                "scroll_depth": {"enabled": true}
            }
        }))
        .unwrap();
        let names: Vec<String> = enabled_adaptors(&config)
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(names, vec!["forms", "outbound_links", "contact_links", "scroll_depth"]);
    }
}
