//! Tracker instance: ties the readiness gate, dispatcher and adaptors to
//! one page.
//!
//! On start the collector is checked once. When present the gate opens at
//! once; otherwise a single background task polls on the configured
//! schedule. Opening drains the queue, then installs every enabled adaptor.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use trackwire_core::{EffectiveConfig, GateState, Properties};

use crate::adaptors::{enabled_adaptors, InstallContext};
use crate::dispatcher::Dispatcher;
use crate::gate::{poll_for_collector, ReadinessGate};
use crate::page::Page;

pub struct Tracker {
    id: Uuid,
    config: Arc<EffectiveConfig>,
    page: Arc<Page>,
    gate: Arc<ReadinessGate>,
    dispatcher: Arc<Dispatcher>,
    installed: Mutex<Vec<String>>,
}

impl Tracker {
    /// Create a tracker for `page` and begin the readiness handshake.
    ///
    /// Polling needs a tokio runtime; without one a missing collector
    /// fails the gate immediately.
    pub fn start(page: Arc<Page>, config: EffectiveConfig) -> Arc<Self> {
        let config = Arc::new(config);
        let gate = Arc::new(ReadinessGate::new());
        let dispatcher = Arc::new(Dispatcher::new(page.clone(), gate.clone(), config.debug));
        let tracker = Arc::new(Self {
            id: Uuid::new_v4(),
            config,
            page,
            gate,
            dispatcher,
            installed: Mutex::new(Vec::new()),
        });

        if tracker.page.has_collector() {
            tracker.on_ready();
        } else {
            tracker.spawn_polling();
        }
        tracker
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    pub fn state(&self) -> GateState {
        self.gate.state()
    }

    /// Events waiting for the collector.
    pub fn pending(&self) -> usize {
        self.gate.pending()
    }

    /// Names of the adaptors installed so far, in install order.
    pub fn installed_adaptors(&self) -> Vec<String> {
        self.installed.lock().clone()
    }

    /// Log an event from page code. Safe in any state; never fails.
    pub fn log_event(&self, event_name: &str, properties: Properties) {
        self.dispatcher.log_event(event_name, properties);
    }

    fn spawn_polling(self: &Arc<Self>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!(tracker = %self.id, "no timer runtime, cannot wait for collector");
            self.on_failed();
            return;
        };

        let attempts = self.config.retry_attempts;
        let delay = self.config.retry_delay();
        debug!(tracker = %self.id, attempts, delay_ms = delay.as_millis() as u64, "waiting for collector");

        let tracker = self.clone();
        runtime.spawn(async move {
            let page = tracker.page.clone();
            match poll_for_collector(move || page.has_collector(), attempts, delay).await {
                Some(attempt) => {
                    debug!(tracker = %tracker.id, attempt, "collector detected");
                    tracker.on_ready();
                }
                None => tracker.on_failed(),
            }
        });
    }

    fn on_ready(&self) {
        let Some(queued) = self.dispatcher.open_gate() else {
            return;
        };
        info!(tracker = %self.id, queued, "collector ready");
        self.install_adaptors();
    }

    fn on_failed(&self) {
        if let Some(stranded) = self.gate.fail() {
            warn!(
                tracker = %self.id,
                attempts = self.config.retry_attempts,
                stranded,
                "collector never became available, tracking disabled"
            );
        }
    }

    fn install_adaptors(&self) {
        let ctx = InstallContext {
            page: self.page.clone(),
            dispatcher: self.dispatcher.clone(),
            config: self.config.clone(),
        };

        for adaptor in enabled_adaptors(&self.config) {
            match adaptor.install(&ctx) {
                Ok(()) => self.installed.lock().push(adaptor.name().to_string()),
                Err(e) => {
                    if self.config.debug {
                        warn!(adaptor = adaptor.name(), error = %e, "adaptor setup failed");
                    }
                }
            }
        }

        info!(
            tracker = %self.id,
            adaptors = ?self.installed.lock(),
            "adaptors installed"
        );
    }
}
