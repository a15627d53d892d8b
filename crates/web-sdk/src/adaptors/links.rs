//! Outbound and contact links.
//!
//! These adaptors do not listen for clicks. They annotate anchors with the
//! collector's tracking attributes and leave capture to the collector's own
//! delegated click handling. Only anchors present at install time are
//! annotated.

use anyhow::Result;
use serde_json::Value;
use tracing::debug;
use url::Url;

use trackwire_core::{sanitize_event_name, SourceId};

use super::{InstallContext, SourceAdaptor};
use crate::events::{ContactLink, OutboundLink, TrackedEvent};
use crate::page::NodeId;

const TEL_SCHEME: &str = "tel:";
const MAILTO_SCHEME: &str = "mailto:";

fn has_scheme(href: &str, scheme: &str) -> bool {
    href.get(..scheme.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
}

fn is_contact_href(href: &str) -> bool {
    has_scheme(href, TEL_SCHEME) || has_scheme(href, MAILTO_SCHEME)
}

/// Resolve `href` against the page and return it when it leaves the page's
/// host.
pub fn outbound_url(page_location: &Url, href: &str) -> Option<Url> {
    if is_contact_href(href) {
        return None;
    }
    let target = page_location.join(href).ok()?;
    let host = target.host_str()?;
    if Some(host) == page_location.host_str() {
        return None;
    }
    Some(target)
}

/// Parse a `tel:` / `mailto:` href by stripping its scheme.
pub fn contact_link(href: &str) -> Option<ContactLink> {
    if has_scheme(href, TEL_SCHEME) {
        Some(ContactLink::Phone {
            number: href[TEL_SCHEME.len()..].to_string(),
        })
    } else if has_scheme(href, MAILTO_SCHEME) {
        Some(ContactLink::Email {
            email: href[MAILTO_SCHEME.len()..].to_string(),
        })
    } else {
        None
    }
}

/// Write `<prefix>="<name>"` and `<prefix>-<key>="<value>"` onto `anchor`.
fn annotate<E: TrackedEvent>(
    ctx: &InstallContext,
    anchor: NodeId,
    event_name: &str,
    record: &E,
) -> Result<bool> {
    let name = sanitize_event_name(event_name);
    if name.is_empty() {
        debug!(raw = %event_name, "skipping anchor with empty event name");
        return Ok(false);
    }
    let prefix = &ctx.config.markup.annotation_attribute;
    ctx.page.set_attribute(anchor, prefix, name);
    for (key, value) in record.to_properties()? {
        let value = match value {
            Value::String(s) => s,
            other => other.to_string(),
        };
        ctx.page.set_attribute(anchor, &format!("{prefix}-{key}"), value);
    }
    Ok(true)
}

pub struct OutboundLinksAdaptor;

impl SourceAdaptor for OutboundLinksAdaptor {
    fn name(&self) -> &str {
        "outbound_links"
    }

    fn install(&self, ctx: &InstallContext) -> Result<()> {
        let default_name = ctx.default_name(SourceId::OutboundLinks, None)?;
        let location = ctx.page.location();
        let mut annotated = 0usize;

        for anchor in ctx.page.elements_by_tag("a") {
            let Some(href) = ctx.page.attribute(anchor, "href") else {
                continue;
            };
            let Some(target) = outbound_url(&location, &href) else {
                continue;
            };
            let event_name = ctx
                .direct_override(anchor)
                .unwrap_or_else(|| default_name.clone());
            let record = OutboundLink {
                url: target.to_string(),
            };
            if annotate(ctx, anchor, &event_name, &record)? {
                annotated += 1;
            }
        }

        debug!(annotated, "outbound links annotated");
        Ok(())
    }
}

pub struct ContactLinksAdaptor;

impl SourceAdaptor for ContactLinksAdaptor {
    fn name(&self) -> &str {
        "contact_links"
    }

    fn install(&self, ctx: &InstallContext) -> Result<()> {
        let mut annotated = 0usize;

        for anchor in ctx.page.elements_by_tag("a") {
            let Some(record) = ctx
                .page
                .attribute(anchor, "href")
                .and_then(|href| contact_link(&href))
            else {
                continue;
            };
            let event_name = match ctx.direct_override(anchor) {
                Some(name) => name,
                None => ctx.default_name(SourceId::ContactLinks, Some(record.subtype()))?,
            };
            if annotate(ctx, anchor, &event_name, &record)? {
                annotated += 1;
            }
        }

        debug!(annotated, "contact links annotated");
        Ok(())
    }
}
