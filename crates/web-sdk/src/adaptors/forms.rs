//! Native form submissions.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use trackwire_core::SourceId;

use super::{InstallContext, SourceAdaptor};
use crate::events::FormSubmission;
use crate::page::{EventKind, EventTarget};

/// Binds a `submit` listener to every `<form>` present at install time.
pub struct FormsAdaptor;

impl SourceAdaptor for FormsAdaptor {
    fn name(&self) -> &str {
        "forms"
    }

    fn install(&self, ctx: &InstallContext) -> Result<()> {
        let default_name = ctx.default_name(SourceId::Forms, None)?;
        let forms = ctx.page.elements_by_tag("form");

        for form in &forms {
            let form = *form;
            let event_name = ctx
                .nearest_override(form)
                .unwrap_or_else(|| default_name.clone());
            let page = ctx.page.clone();
            let dispatcher = ctx.dispatcher.clone();

            ctx.page.add_event_listener(
                EventTarget::Element(form),
                EventKind::Submit,
                Arc::new(move |_| {
                    let record = FormSubmission {
                        form_name: page.attribute(form, "name"),
                        form_id: page.attribute(form, "id"),
                    };
                    dispatcher.emit(&event_name, &record);
                }),
            );
        }

        debug!(count = forms.len(), "form listeners attached");
        Ok(())
    }
}
