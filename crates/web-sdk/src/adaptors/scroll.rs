//! Scroll depth milestones.
//!
//! Each configured threshold fires at most once per page load, in ascending
//! order. Tracking arms on the first real `scroll` event, or after a short
//! deferred check. The deferred check stands down when the page loaded
//! already scrolled past the lowest threshold (anchor-link landings), unless
//! that heuristic is switched off.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use tracing::{debug, warn};

use trackwire_core::config::{DEFAULT_INITIAL_SCROLL_CHECK_MS, DEFAULT_SCROLL_THRESHOLDS};
use trackwire_core::{EffectiveConfig, SourceId};

use super::{InstallContext, SourceAdaptor};
use crate::events::ScrollDepthReached;
use crate::page::{EventKind, EventTarget, Viewport};

/// Percentage of the scrollable range currently scrolled, or `None` when
/// the page does not scroll.
pub fn scroll_percentage(viewport: &Viewport) -> Option<u32> {
    let range = viewport.scroll_height - viewport.inner_height;
    if range.is_nan() || range <= 0.0 {
        return None;
    }
    let pct = (100.0 * viewport.scroll_y / range).round();
    Some(pct.max(0.0) as u32)
}

/// Which thresholds have fired so far.
#[derive(Debug)]
pub struct ScrollTracker {
    thresholds: Vec<u32>,
    reached: Mutex<BTreeSet<u32>>,
    armed: AtomicBool,
}

impl ScrollTracker {
    pub fn new(mut thresholds: Vec<u32>) -> Self {
        thresholds.sort_unstable();
        thresholds.dedup();
        Self {
            thresholds,
            reached: Mutex::new(BTreeSet::new()),
            armed: AtomicBool::new(false),
        }
    }

    pub fn thresholds(&self) -> &[u32] {
        &self.thresholds
    }

    /// Mark tracking as armed; returns `true` for the first caller only.
    pub fn arm(&self) -> bool {
        !self.armed.swap(true, Ordering::SeqCst)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Thresholds newly crossed at `percentage`, ascending. Each threshold
    /// is returned once over the tracker's lifetime.
    pub fn crossed(&self, percentage: u32) -> Vec<u32> {
        let mut reached = self.reached.lock();
        self.thresholds
            .iter()
            .copied()
            .filter(|t| percentage >= *t)
            .filter(|t| reached.insert(*t))
            .collect()
    }

    /// Whether the deferred check should stand down for `percentage`.
    pub fn already_past_first(&self, percentage: u32) -> bool {
        self.thresholds
            .first()
            .is_some_and(|lowest| percentage >= *lowest)
    }
}

pub struct ScrollDepthAdaptor {
    thresholds: Vec<u32>,
    initial_check_delay: Duration,
    skip_initial_if_scrolled: bool,
}

impl ScrollDepthAdaptor {
    pub fn from_config(config: &EffectiveConfig) -> Self {
        let source = config.source(SourceId::ScrollDepth);
        Self {
            thresholds: source
                .and_then(|s| s.thresholds.clone())
                .unwrap_or_else(|| DEFAULT_SCROLL_THRESHOLDS.to_vec()),
            initial_check_delay: Duration::from_millis(
                source
                    .and_then(|s| s.initial_check_delay_ms)
                    .unwrap_or(DEFAULT_INITIAL_SCROLL_CHECK_MS),
            ),
            skip_initial_if_scrolled: source
                .and_then(|s| s.skip_initial_if_scrolled)
                .unwrap_or(true),
        }
    }
}

/// Fire every newly crossed threshold for the page's current position.
fn evaluate(ctx: &InstallContext, tracker: &ScrollTracker, event_name: &str) {
    let Some(percentage) = scroll_percentage(&ctx.page.viewport()) else {
        return;
    };
    let crossed = tracker.crossed(percentage);
    if crossed.is_empty() {
        return;
    }
    let url = ctx.page.location().to_string();
    for threshold in crossed {
        ctx.dispatcher.emit(
            event_name,
            &ScrollDepthReached {
                percentage: threshold,
                url: url.clone(),
            },
        );
    }
}

impl SourceAdaptor for ScrollDepthAdaptor {
    fn name(&self) -> &str {
        "scroll_depth"
    }

    fn install(&self, ctx: &InstallContext) -> Result<()> {
        let event_name = ctx.default_name(SourceId::ScrollDepth, None)?;
        let tracker = Arc::new(ScrollTracker::new(self.thresholds.clone()));

        {
            let listener_ctx = ctx.clone();
            let tracker = tracker.clone();
            let event_name = event_name.clone();
            ctx.page.add_event_listener(
                EventTarget::Window,
                EventKind::Scroll,
                Arc::new(move |_| {
                    if tracker.arm() {
                        debug!("scroll tracking armed by first scroll");
                    }
                    evaluate(&listener_ctx, &tracker, &event_name);
                }),
            );
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no timer runtime, deferred scroll check skipped");
            return Ok(());
        };
        let ctx = ctx.clone();
        let delay = self.initial_check_delay;
        let skip_if_scrolled = self.skip_initial_if_scrolled;
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if tracker.is_armed() {
                return;
            }
            let percentage = scroll_percentage(&ctx.page.viewport()).unwrap_or(0);
            if skip_if_scrolled && tracker.already_past_first(percentage) {
                debug!(percentage, "page loaded past first threshold, waiting for a real scroll");
                return;
            }
            if tracker.arm() {
                evaluate(&ctx, &tracker, &event_name);
            }
        });

        Ok(())
    }
}
