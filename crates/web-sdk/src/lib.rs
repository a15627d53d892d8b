//! Page-side analytics enrichment: listens for form submissions, widget
//! bookings, link clicks and scroll depth, and forwards normalized events to
//! the analytics collector already present on the page.
//!
//! # Modules
//!
//! - [`page`]: Host page model (document, window, listeners, collector slot)
//! - [`gate`]: Readiness gate holding events until the collector exists
//! - [`queue`]: FIFO buffer behind the gate
//! - [`dispatcher`]: Name sanitization, timestamping and delivery
//! - [`adaptors`]: Per-source adaptors and the message routing table
//! - [`events`]: Typed per-source event records
//! - [`tracker`]: One tracker instance wired to a page
//! - [`registry`]: Process-wide single-instance lifecycle

pub mod adaptors;
pub mod dispatcher;
pub mod events;
pub mod gate;
pub mod page;
pub mod queue;
pub mod registry;
pub mod tracker;

pub use adaptors::SourceAdaptor;
pub use dispatcher::Dispatcher;
pub use gate::ReadinessGate;
pub use page::Page;
pub use registry::{InstanceHandle, Registry};
pub use tracker::Tracker;
