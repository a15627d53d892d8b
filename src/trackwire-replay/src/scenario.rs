//! Recorded page scenarios.
//!
//! A scenario describes the page as it was at load time (location, viewport,
//! elements) and a list of timed steps that happened afterwards.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use trackwire_core::Properties;
use trackwire_web_sdk::page::{NodeId, Page, Viewport};

/// How long to keep the clock running after the last step.
pub const DEFAULT_SETTLE_MS: u64 = 30_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub location: String,
    #[serde(default)]
    pub viewport: Viewport,
    /// Inline overrides, applied on top of file and environment overrides.
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_settle_ms() -> u64 {
    DEFAULT_SETTLE_MS
}

/// An element present at load time. `key` lets steps and children refer
/// to it; parents must be listed before their children.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementSpec {
    #[serde(default)]
    pub key: Option<String>,
    pub tag: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Milliseconds after page load.
    #[serde(default)]
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// The collector script finished loading.
    CollectorReady,
    /// Page code called `logEvent`.
    LogEvent {
        name: String,
        #[serde(default)]
        properties: Properties,
    },
    Submit {
        element: String,
    },
    Message {
        origin: String,
        data: Value,
    },
    ScrollTo {
        scroll_y: f64,
    },
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let mut scenario: Scenario = serde_json::from_str(raw)?;
        // stable: steps recorded at the same instant keep file order
        scenario.steps.sort_by_key(|s| s.at_ms);
        Ok(scenario)
    }

    /// Build the load-time page. Returns the page and the keyed elements.
    pub fn build_page(&self) -> Result<(Arc<Page>, HashMap<String, NodeId>)> {
        let page = Page::new(&self.location)
            .with_context(|| format!("invalid page location {:?}", self.location))?;
        page.set_viewport(self.viewport);

        let mut keyed = HashMap::new();
        for decl in &self.elements {
            let parent = match &decl.parent {
                Some(key) => match keyed.get(key) {
                    Some(node) => Some(*node),
                    None => bail!("element parent {key:?} is not declared before its child"),
                },
                None => None,
            };
            let node = page.create_element(&decl.tag, parent);
            for (name, value) in &decl.attributes {
                page.set_attribute(node, name, value.as_str());
            }
            if let Some(key) = &decl.key {
                if keyed.insert(key.clone(), node).is_some() {
                    bail!("duplicate element key {key:?}");
                }
            }
        }

        Ok((Arc::new(page), keyed))
    }
}
