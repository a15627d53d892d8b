//! Process-wide registry holding at most one tracker instance.
//!
//! Startup is two-phase. A page may [`Registry::configure`] the tracker
//! during a short grace window opened by [`Registry::bootstrap`]; when the
//! window closes the registry commits with whatever was registered (or the
//! defaults). An explicit [`Registry::initialize_once`] commits early.
//! Every later call returns the same instance.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use trackwire_core::EffectiveConfig;

use crate::page::Page;
use crate::tracker::Tracker;

/// Window during which page code can still supply configuration.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(100);

pub type InstanceHandle = Arc<Tracker>;

#[derive(Default)]
struct Slot {
    pending: Option<Value>,
    instance: Option<InstanceHandle>,
    grace: Option<JoinHandle<()>>,
}

#[derive(Clone, Default)]
pub struct Registry {
    slot: Arc<Mutex<Slot>>,
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process.
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Registry::new)
    }

    pub fn instance(&self) -> Option<InstanceHandle> {
        self.slot.lock().instance.clone()
    }

    /// Phase one: register configuration overrides for the pending commit.
    /// Returns `false` once an instance exists.
    pub fn configure(&self, overrides: Value) -> bool {
        let mut slot = self.slot.lock();
        if slot.instance.is_some() {
            debug!("tracker already initialized, configuration ignored");
            return false;
        }
        slot.pending = Some(overrides);
        true
    }

    /// Phase two: commit with the registered configuration.
    pub fn commit(&self, page: Arc<Page>) -> InstanceHandle {
        self.initialize_once(page, None)
    }

    /// Create the instance unless one exists. Explicit `overrides` take
    /// precedence over anything registered with [`Registry::configure`].
    pub fn initialize_once(&self, page: Arc<Page>, overrides: Option<Value>) -> InstanceHandle {
        let mut slot = self.slot.lock();
        if let Some(grace) = slot.grace.take() {
            grace.abort();
        }
        Self::commit_locked(&mut slot, page, overrides)
    }

    /// Open the grace window: unless an instance is created first, commit
    /// after `grace`. Returns `false` when nothing was scheduled.
    pub fn bootstrap(&self, page: Arc<Page>, grace: Duration) -> bool {
        let mut slot = self.slot.lock();
        if slot.instance.is_some() || slot.grace.is_some() {
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no timer runtime, committing without grace window");
            Self::commit_locked(&mut slot, page, None);
            return false;
        };

        let registry = self.clone();
        slot.grace = Some(runtime.spawn(async move {
            tokio::time::sleep(grace).await;
            let mut slot = registry.slot.lock();
            slot.grace = None;
            if slot.instance.is_none() {
                debug!("grace window closed, self-initializing");
                Self::commit_locked(&mut slot, page, None);
            }
        }));
        true
    }

    fn commit_locked(slot: &mut Slot, page: Arc<Page>, overrides: Option<Value>) -> InstanceHandle {
        if let Some(existing) = &slot.instance {
            if overrides.is_some() {
                debug!("tracker already initialized, configuration ignored");
            }
            return existing.clone();
        }

        let overrides = overrides
            .or_else(|| slot.pending.take())
            .unwrap_or(Value::Null);
        let config = match EffectiveConfig::resolve_with_issues(&overrides) {
            Ok((config, issues)) => {
                for issue in &issues {
                    warn!(issue = %issue, "tracker configuration");
                }
                config
            }
            Err(e) => {
                warn!(error = %e, "invalid tracker configuration, using defaults");
                EffectiveConfig::default()
            }
        };

        let tracker = Tracker::start(page, config);
        info!(tracker = %tracker.id(), "tracker initialized");
        slot.instance = Some(tracker.clone());
        tracker
    }
}
