use serde::{Deserialize, Serialize};

use crate::config::{FallCooldown, MotionConfig};
use crate::types::{GyroSample, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Impact,
    SuddenBrake,
    Fall,
}

/// Discrete safety event handed to an external sink
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub timestamp_ms: i64,
    /// m/s² for impact and braking, deg/s for falls
    pub trigger_magnitude: f64,
    /// Linear acceleration (impact, braking) or rotation rate in deg/s (fall)
    pub vector: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrakeState {
    Idle,
    Braking { start_time_ms: i64 },
}

/// Threshold, hysteresis and cooldown logic over conditioned samples.
///
/// Timestamps that were never set do not gate anything, so the first qualifying
/// sample of a session always fires.
pub struct EventClassifier {
    brake_threshold: f64,
    brake_min_duration_ms: i64,
    impact_threshold: f64,
    fall_rotation_threshold: f64,
    cooldown_ms: i64,
    fall_cooldown: FallCooldown,

    brake_state: BrakeState,
    last_brake_confirm_ms: Option<i64>,
    last_impact_ms: Option<i64>,
    last_fall_ms: Option<i64>,
}

impl EventClassifier {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            brake_threshold: config.brake_threshold,
            brake_min_duration_ms: config.brake_min_duration_ms,
            impact_threshold: config.impact_threshold,
            fall_rotation_threshold: config.fall_rotation_threshold,
            cooldown_ms: config.cooldown_ms,
            fall_cooldown: config.fall_cooldown,
            brake_state: BrakeState::Idle,
            last_brake_confirm_ms: None,
            last_impact_ms: None,
            last_fall_ms: None,
        }
    }

    /// Classify one conditioned (gravity-free) acceleration sample.
    ///
    /// Impact is checked first; a single sample can yield both an impact and a
    /// braking confirmation.
    pub fn process_accel(&mut self, timestamp_ms: i64, linear: &Vec3) -> Vec<Event> {
        let mut events = Vec::new();
        let horizontal = linear.x.hypot(linear.y);
        let total = linear.norm();

        if total > self.impact_threshold
            && cooled_down(self.last_impact_ms, timestamp_ms, self.cooldown_ms)
        {
            self.last_impact_ms = Some(timestamp_ms);
            log::debug!("impact {:.2} m/s² at {}", total, timestamp_ms);
            events.push(Event {
                kind: EventKind::Impact,
                timestamp_ms,
                trigger_magnitude: total,
                vector: *linear,
            });
        }

        if let Some(event) = self.update_brake(timestamp_ms, horizontal, linear) {
            events.push(event);
        }

        events
    }

    fn update_brake(&mut self, timestamp_ms: i64, horizontal: f64, linear: &Vec3) -> Option<Event> {
        if horizontal.is_nan() || horizontal <= self.brake_threshold {
            self.brake_state = BrakeState::Idle;
            return None;
        }

        let start_time_ms = match self.brake_state {
            BrakeState::Idle => {
                self.brake_state = BrakeState::Braking {
                    start_time_ms: timestamp_ms,
                };
                timestamp_ms
            }
            BrakeState::Braking { start_time_ms } => start_time_ms,
        };

        // Stays in Braking after a confirmation; a sustained episode re-fires only
        // once the cooldown has passed again.
        if timestamp_ms - start_time_ms >= self.brake_min_duration_ms
            && cooled_down(self.last_brake_confirm_ms, timestamp_ms, self.cooldown_ms)
        {
            self.last_brake_confirm_ms = Some(timestamp_ms);
            log::debug!(
                "sudden brake {:.2} m/s² after {} ms",
                horizontal,
                timestamp_ms - start_time_ms
            );
            return Some(Event {
                kind: EventKind::SuddenBrake,
                timestamp_ms,
                trigger_magnitude: horizontal,
                vector: *linear,
            });
        }

        None
    }

    /// Classify one gyroscope sample (rad/s)
    pub fn process_gyro(&mut self, sample: &GyroSample) -> Option<Event> {
        let rotation = sample.degrees_per_sec();
        let magnitude = rotation.norm();
        if magnitude.is_nan() || magnitude <= self.fall_rotation_threshold {
            return None;
        }

        let cooldown_ms = self.cooldown_ms;
        let gate = match self.fall_cooldown {
            FallCooldown::Independent => &mut self.last_fall_ms,
            FallCooldown::SharedWithImpact => &mut self.last_impact_ms,
        };
        if !cooled_down(*gate, sample.timestamp_ms, cooldown_ms) {
            return None;
        }
        *gate = Some(sample.timestamp_ms);

        log::debug!("fall {:.1} deg/s at {}", magnitude, sample.timestamp_ms);
        Some(Event {
            kind: EventKind::Fall,
            timestamp_ms: sample.timestamp_ms,
            trigger_magnitude: magnitude,
            vector: rotation,
        })
    }

    pub fn brake_state(&self) -> BrakeState {
        self.brake_state
    }

    /// Back to Idle with all cooldowns cleared
    pub fn reset(&mut self) {
        self.brake_state = BrakeState::Idle;
        self.last_brake_confirm_ms = None;
        self.last_impact_ms = None;
        self.last_fall_ms = None;
    }
}

fn cooled_down(last_ms: Option<i64>, now_ms: i64, cooldown_ms: i64) -> bool {
    last_ms.map_or(true, |last| now_ms - last >= cooldown_ms)
}
