//! Vehicle motion and road-hazard monitoring core.
//!
//! Two independent streaming pipelines:
//! - motion safety: raw accelerometer/gyroscope samples are conditioned and
//!   classified into debounced [`Event`]s (impact, sudden brake, fall)
//! - hazard tracking: per-frame detector output is filtered with non-max
//!   suppression and associated into persistent [`Track`]s
//!
//! Both are synchronous and allocation-light; results leave through a [`Sink`].

pub mod conditioner;
pub mod config;
pub mod detection;
pub mod error;
pub mod incident;
pub mod session;
pub mod sink;
pub mod tracker;
pub mod types;

pub use config::{DetectionConfig, FallCooldown, MonitorConfig, MotionConfig, TrackerConfig};
pub use detection::{BBox, DetectionCandidate, DetectionFilter};
pub use error::{MonitorError, MonitorResult};
pub use incident::{Event, EventClassifier, EventKind};
pub use session::{HazardSession, MotionSession, SensorAvailability, SessionMetadata, SessionState};
pub use sink::{FnSink, NullSink, Sink};
pub use tracker::{Track, TrackManager};
pub use types::{AccelSample, GyroSample, SensorSample, Vec3};
