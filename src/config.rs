//! Construction-time tunables for both pipelines.
//!
//! Every section deserializes with per-field defaults, so a config file only
//! needs to name the values it overrides.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

/// Which timestamp gates fall events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallCooldown {
    /// Falls keep their own cooldown timestamp
    Independent,
    /// Falls are gated by (and refresh) the impact cooldown timestamp
    SharedWithImpact,
}

impl FromStr for FallCooldown {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "independent" => Ok(FallCooldown::Independent),
            "shared" | "shared_with_impact" => Ok(FallCooldown::SharedWithImpact),
            other => Err(MonitorError::InvalidParameters(format!(
                "unknown fall cooldown mode '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for FallCooldown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallCooldown::Independent => write!(f, "independent"),
            FallCooldown::SharedWithImpact => write!(f, "shared_with_impact"),
        }
    }
}

/// Signal conditioning and event classification tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Horizontal linear acceleration (m/s²) that starts a braking episode
    pub brake_threshold: f64,
    /// Braking must persist this long before it is confirmed
    pub brake_min_duration_ms: i64,
    /// Total linear acceleration (m/s²) treated as an impact
    pub impact_threshold: f64,
    /// Rotation rate magnitude (deg/s) treated as a fall or rollover
    pub fall_rotation_threshold: f64,
    /// Minimum spacing between two events of the same kind
    pub cooldown_ms: i64,
    /// Gravity EMA weight on the previous estimate, in [0, 1).
    ///
    /// At 0.9 a sustained deceleration folds into the gravity estimate before
    /// `brake_min_duration_ms` elapses; raise it towards 1 to confirm long braking.
    pub gravity_alpha: f64,
    /// Per-axis magnitudes below this are clamped to zero
    pub noise_deadzone: f64,
    /// Moving-average window length in samples
    pub ma_window: usize,
    pub fall_cooldown: FallCooldown,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            brake_threshold: 10.0,
            brake_min_duration_ms: 800,
            impact_threshold: 20.0,
            fall_rotation_threshold: 200.0,
            cooldown_ms: 2000,
            gravity_alpha: 0.9,
            noise_deadzone: 0.1,
            ma_window: 5,
            fall_cooldown: FallCooldown::Independent,
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> MonitorResult<()> {
        if !(0.0..1.0).contains(&self.gravity_alpha) {
            return Err(invalid("gravity_alpha must be in [0, 1)"));
        }
        if self.ma_window == 0 {
            return Err(invalid("ma_window must be at least 1"));
        }
        for (name, value) in [
            ("brake_threshold", self.brake_threshold),
            ("impact_threshold", self.impact_threshold),
            ("fall_rotation_threshold", self.fall_rotation_threshold),
            ("noise_deadzone", self.noise_deadzone),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(&format!("{} must be a non-negative number", name)));
            }
        }
        if self.brake_min_duration_ms < 0 || self.cooldown_ms < 0 {
            return Err(invalid("durations must be non-negative"));
        }
        Ok(())
    }
}

/// Detection post-processing tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub score_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    /// Class names indexed by detector class id
    pub labels: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.3,
            iou_threshold: 0.5,
            max_detections: 20,
            labels: Vec::new(),
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> MonitorResult<()> {
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(invalid("score_threshold must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(invalid("iou_threshold must be in [0, 1]"));
        }
        if self.max_detections == 0 {
            return Err(invalid("max_detections must be at least 1"));
        }
        Ok(())
    }
}

/// Track association tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Minimum IOU for an overlap match
    pub iou_threshold: f32,
    /// Maximum center distance (normalized units) for the fallback match
    pub center_distance_threshold: f32,
    /// Score assigned to a center-distance fallback match
    pub center_fallback_score: f32,
    /// Frames a track may go unmatched before it is dropped
    pub max_lost: u32,
    /// Minimum candidate score to open a new track
    pub min_detection_confidence: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.2,
            center_distance_threshold: 0.6,
            center_fallback_score: 0.3,
            max_lost: 5,
            min_detection_confidence: 0.3,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> MonitorResult<()> {
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(invalid("tracker iou_threshold must be in [0, 1]"));
        }
        if !self.center_distance_threshold.is_finite() || self.center_distance_threshold < 0.0 {
            return Err(invalid("center_distance_threshold must be non-negative"));
        }
        if !(self.center_fallback_score > 0.0 && self.center_fallback_score <= 1.0) {
            return Err(invalid("center_fallback_score must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.min_detection_confidence) {
            return Err(invalid("min_detection_confidence must be in [0, 1]"));
        }
        Ok(())
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub motion: MotionConfig,
    pub detection: DetectionConfig,
    pub tracker: TrackerConfig,
}

impl MonitorConfig {
    pub fn from_json_str(json: &str) -> MonitorResult<Self> {
        let config: MonitorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> MonitorResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> MonitorResult<()> {
        self.motion.validate()?;
        self.detection.validate()?;
        self.tracker.validate()
    }
}

fn invalid(msg: &str) -> MonitorError {
    MonitorError::InvalidParameters(msg.to_string())
}
