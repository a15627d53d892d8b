pub mod collector;
pub mod config;
pub mod error;
pub mod sanitize;
pub mod types;

pub use collector::Collector;
pub use config::{ConfigIssue, EffectiveConfig, SourceEntry};
pub use error::{TrackError, TrackResult};
pub use sanitize::sanitize_event_name;
pub use types::{GateState, PendingEvent, Properties, QueuedEvent, SourceId};
