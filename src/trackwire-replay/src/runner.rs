//! Drives a scenario through the registry on the runtime clock.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use trackwire_core::{Collector, GateState};
use trackwire_web_sdk::Registry;

use crate::scenario::{Action, Scenario};

/// State of the page after the scenario settled.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub steps: usize,
    pub skipped: usize,
    pub state: Option<GateState>,
    pub pending: usize,
    pub adaptors: Vec<String>,
}

pub async fn replay(
    scenario: &Scenario,
    overrides: Value,
    grace: Duration,
    collector: Arc<dyn Collector>,
) -> Result<Summary> {
    let (page, keyed) = scenario.build_page()?;
    let registry = Registry::new();
    registry.bootstrap(page.clone(), grace);
    registry.configure(overrides);

    let start = Instant::now();
    let mut skipped = 0;

    for step in &scenario.steps {
        sleep_until(start + Duration::from_millis(step.at_ms)).await;
        debug!(at_ms = step.at_ms, action = ?step.action, "step");

        match &step.action {
            Action::CollectorReady => page.install_collector(collector.clone()),
            Action::LogEvent { name, properties } => {
                // the public API exists once the tracker does; calling it commits
                let tracker = registry
                    .instance()
                    .unwrap_or_else(|| registry.commit(page.clone()));
                tracker.log_event(name, properties.clone());
            }
            Action::Submit { element } => match keyed.get(element) {
                Some(node) => page.submit(*node),
                None => {
                    warn!(element = %element, "submit target not declared, step skipped");
                    skipped += 1;
                }
            },
            Action::Message { origin, data } => page.post_message(origin, data.clone()),
            Action::ScrollTo { scroll_y } => page.scroll_to(*scroll_y),
        }
    }

    let last = scenario.steps.last().map_or(0, |s| s.at_ms);
    sleep_until(start + Duration::from_millis(last + scenario.settle_ms)).await;

    let tracker = registry.instance();
    let summary = Summary {
        steps: scenario.steps.len(),
        skipped,
        state: tracker.as_ref().map(|t| t.state()),
        pending: tracker.as_ref().map_or(0, |t| t.pending()),
        adaptors: tracker
            .as_ref()
            .map(|t| t.installed_adaptors())
            .unwrap_or_default(),
    };
    info!(
        steps = summary.steps,
        skipped = summary.skipped,
        state = ?summary.state,
        "scenario settled"
    );
    Ok(summary)
}
