//! Tracker configuration. Page-supplied overrides are merged over the
//! defaults once at startup; the result is immutable afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{TrackError, TrackResult};
use crate::types::SourceId;

/// Fully resolved tracker configuration.
///
/// Resolution is lenient: a malformed top-level option falls back to its
/// default, unknown sources are ignored, and a malformed source entry is
/// kept as [`SourceEntry::Malformed`] so only that source fails, when its
/// adaptor installs.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub debug: bool,
    pub retry_attempts: u32,
    pub retry_delay_sec: f64,
    pub markup: MarkupConfig,
    pub tracking: BTreeMap<SourceId, SourceEntry>,
}

/// One source's configuration as supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEntry {
    Valid(SourceConfig),
    /// Did not match the expected shape. The switch is still honoured.
    Malformed { enabled: bool, error: String },
}

impl SourceEntry {
    pub fn enabled(&self) -> bool {
        match self {
            SourceEntry::Valid(config) => config.enabled,
            SourceEntry::Malformed { enabled, .. } => *enabled,
        }
    }

    fn parse(id: SourceId, raw: &Value) -> Self {
        match serde_json::from_value::<SourceConfig>(raw.clone()) {
            Ok(config) => SourceEntry::Valid(config),
            Err(e) => SourceEntry::Malformed {
                enabled: raw
                    .get("enabled")
                    .and_then(Value::as_bool)
                    .unwrap_or_else(default_enabled),
                error: format!("tracking.{id}: {e}"),
            },
        }
    }
}

/// Problems found while resolving. None of them is fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigIssue {
    /// A top-level option had the wrong shape; its default was used.
    Invalid { key: String, error: String },
    /// A `tracking` key that names no known source.
    UnknownSource(String),
    /// A source entry had the wrong shape; that source will fail to install.
    MalformedSource(SourceId),
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::Invalid { key, error } => write!(f, "{key}: {error}, default used"),
            ConfigIssue::UnknownSource(key) => write!(f, "unknown tracking source {key:?} ignored"),
            ConfigIssue::MalformedSource(id) => write!(f, "tracking.{id} is malformed"),
        }
    }
}

/// Attribute names shared with the host page and the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupConfig {
    /// Attribute carrying a per-element event-name override.
    #[serde(default = "default_override_attribute")]
    pub override_attribute: String,
    /// Attribute prefix the collector's delegated click tracking reads.
    #[serde(default = "default_annotation_attribute")]
    pub annotation_attribute: String,
}

/// Per-source switch and naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub event_name: EventName,
    /// Scroll depth only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Vec<u32>>,
    /// Scroll depth only: delay before the initial, scroll-less check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_check_delay_ms: Option<u64>,
    /// Scroll depth only: skip the initial check when the page loaded
    /// already scrolled past the lowest threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_initial_if_scrolled: Option<bool>,
}

/// A single event name, or one per subtype (e.g. `phone` / `email`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventName {
    Single(String),
    BySubtype(BTreeMap<String, String>),
}

impl EventName {
    /// Pick the name for `subtype`. A subtype mapping without a match
    /// falls back to its `default` entry.
    pub fn resolve(&self, subtype: Option<&str>) -> Option<&str> {
        match self {
            EventName::Single(name) => Some(name.as_str()),
            EventName::BySubtype(names) => subtype
                .and_then(|s| names.get(s))
                .or_else(|| names.get("default"))
                .map(String::as_str),
        }
    }
}

impl SourceConfig {
    fn named(enabled: bool, event_name: &str) -> Self {
        Self {
            enabled,
            event_name: EventName::Single(event_name.to_string()),
            thresholds: None,
            initial_check_delay_ms: None,
            skip_initial_if_scrolled: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}
fn default_retry_attempts() -> u32 {
    20
}
fn default_retry_delay_sec() -> f64 {
    0.5
}
fn default_override_attribute() -> String {
    "data-event-name".to_string()
}
fn default_annotation_attribute() -> String {
    "data-umami-event".to_string()
}

pub const DEFAULT_SCROLL_THRESHOLDS: [u32; 4] = [25, 50, 75, 100];
pub const DEFAULT_INITIAL_SCROLL_CHECK_MS: u64 = 1000;

fn default_tracking() -> BTreeMap<SourceId, SourceConfig> {
    let contact_names = BTreeMap::from([
        ("phone".to_string(), "phone_click".to_string()),
        ("email".to_string(), "email_click".to_string()),
    ]);

    BTreeMap::from([
        (SourceId::Forms, SourceConfig::named(true, "form_submit")),
        (SourceId::FormWidget, SourceConfig::named(true, "form_submit")),
        (SourceId::Scheduling, SourceConfig::named(true, "meeting_scheduled")),
        (SourceId::CrmScheduling, SourceConfig::named(true, "meeting_booked")),
        (SourceId::OutboundLinks, SourceConfig::named(true, "outbound_link_click")),
        (
            SourceId::ContactLinks,
            SourceConfig {
                enabled: true,
                event_name: EventName::BySubtype(contact_names),
                thresholds: None,
                initial_check_delay_ms: None,
                skip_initial_if_scrolled: None,
            },
        ),
        (
            SourceId::ScrollDepth,
            SourceConfig {
                enabled: false,
                event_name: EventName::Single("scroll_depth".to_string()),
                thresholds: Some(DEFAULT_SCROLL_THRESHOLDS.to_vec()),
                initial_check_delay_ms: Some(DEFAULT_INITIAL_SCROLL_CHECK_MS),
                skip_initial_if_scrolled: Some(true),
            },
        ),
    ])
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            override_attribute: default_override_attribute(),
            annotation_attribute: default_annotation_attribute(),
        }
    }
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            debug: false,
            retry_attempts: default_retry_attempts(),
            retry_delay_sec: default_retry_delay_sec(),
            markup: MarkupConfig::default(),
            tracking: default_tracking()
                .into_iter()
                .map(|(id, config)| (id, SourceEntry::Valid(config)))
                .collect(),
        }
    }
}

/// Merge `overrides` over `defaults`.
///
/// Objects merge recursively (a missing default counts as an empty object);
/// arrays and scalars replace the default wholesale.
pub fn merge_options(defaults: &Value, overrides: &Value) -> Value {
    let mut merged = match defaults {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    if let Value::Object(entries) = overrides {
        for (key, value) in entries {
            let next = match value {
                Value::Object(_) => {
                    let base = merged
                        .get(key)
                        .cloned()
                        .unwrap_or_else(|| Value::Object(Map::new()));
                    merge_options(&base, value)
                }
                other => other.clone(),
            };
            merged.insert(key.clone(), next);
        }
    }

    Value::Object(merged)
}

fn option<T: DeserializeOwned>(
    merged: &Value,
    key: &str,
    fallback: T,
    issues: &mut Vec<ConfigIssue>,
) -> T {
    let Some(raw) = merged.get(key) else {
        return fallback;
    };
    serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
        issues.push(ConfigIssue::Invalid {
            key: key.to_string(),
            error: e.to_string(),
        });
        fallback
    })
}

fn tracking_entries(
    merged: &Value,
    fallback: BTreeMap<SourceId, SourceEntry>,
    issues: &mut Vec<ConfigIssue>,
) -> BTreeMap<SourceId, SourceEntry> {
    let Some(raw) = merged.get("tracking").and_then(Value::as_object) else {
        issues.push(ConfigIssue::Invalid {
            key: "tracking".to_string(),
            error: "expected an object".to_string(),
        });
        return fallback;
    };

    let mut entries = BTreeMap::new();
    for (key, value) in raw {
        let Ok(id) = serde_json::from_value::<SourceId>(Value::String(key.clone())) else {
            issues.push(ConfigIssue::UnknownSource(key.clone()));
            continue;
        };
        let entry = SourceEntry::parse(id, value);
        if matches!(entry, SourceEntry::Malformed { .. }) {
            issues.push(ConfigIssue::MalformedSource(id));
        }
        entries.insert(id, entry);
    }
    entries
}

impl EffectiveConfig {
    /// Defaults as a JSON tree, the left-hand side of [`merge_options`].
    pub fn defaults_value() -> TrackResult<Value> {
        Ok(json!({
            "debug": false,
            "retry_attempts": default_retry_attempts(),
            "retry_delay_sec": default_retry_delay_sec(),
            "markup": serde_json::to_value(MarkupConfig::default())?,
            "tracking": serde_json::to_value(default_tracking())?,
        }))
    }

    /// Merge page-supplied overrides over the defaults and type the result.
    pub fn resolve(overrides: &Value) -> TrackResult<Self> {
        Ok(Self::resolve_with_issues(overrides)?.0)
    }

    /// Like [`EffectiveConfig::resolve`], also returning what was ignored
    /// or replaced by a default.
    pub fn resolve_with_issues(overrides: &Value) -> TrackResult<(Self, Vec<ConfigIssue>)> {
        let merged = merge_options(&Self::defaults_value()?, overrides);
        let mut issues = Vec::new();
        let defaults = Self::default();

        let config = Self {
            debug: option(&merged, "debug", defaults.debug, &mut issues),
            retry_attempts: option(&merged, "retry_attempts", defaults.retry_attempts, &mut issues),
            retry_delay_sec: option(&merged, "retry_delay_sec", defaults.retry_delay_sec, &mut issues),
            markup: option(&merged, "markup", defaults.markup, &mut issues),
            tracking: tracking_entries(&merged, defaults.tracking, &mut issues),
        };
        Ok((config, issues))
    }

    /// Typed configuration of a well-formed source.
    pub fn source(&self, id: SourceId) -> Option<&SourceConfig> {
        match self.tracking.get(&id)? {
            SourceEntry::Valid(config) => Some(config),
            SourceEntry::Malformed { .. } => None,
        }
    }

    /// Typed configuration of `id`, or why there is none.
    pub fn require_source(&self, id: SourceId) -> TrackResult<&SourceConfig> {
        match self.tracking.get(&id) {
            Some(SourceEntry::Valid(config)) => Ok(config),
            Some(SourceEntry::Malformed { error, .. }) => Err(TrackError::Config(error.clone())),
            None => Err(TrackError::Config(format!("no configuration for source {id}"))),
        }
    }

    pub fn is_enabled(&self, id: SourceId) -> bool {
        self.tracking.get(&id).is_some_and(SourceEntry::enabled)
    }

    /// Configured event name for a source, before per-element overrides.
    pub fn event_name(&self, id: SourceId, subtype: Option<&str>) -> Option<&str> {
        self.source(id).and_then(|s| s.event_name.resolve(subtype))
    }

    /// Polling interval of the readiness gate. Non-finite or negative
    /// values fall back to the default.
    pub fn retry_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.retry_delay_sec)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_retry_delay_sec()))
    }

    /// Load overrides from an optional config file plus `TRACKWIRE__*`
    /// environment variables (`__` separates nesting levels).
    pub fn load_overrides(path: Option<&Path>) -> Result<Value, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("TRACKWIRE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("tracking.scroll_depth.thresholds"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
