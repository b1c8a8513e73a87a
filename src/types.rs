//! Sensor sample types delivered by the host platform.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Three-axis quantity (m/s² for acceleration, rad/s or deg/s for rotation)
pub type Vec3 = Vector3<f64>;

/// Accelerometer sample, m/s² including gravity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    pub timestamp_ms: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelSample {
    pub fn new(x: f64, y: f64, z: f64, timestamp_ms: i64) -> Self {
        Self { timestamp_ms, x, y, z }
    }

    pub fn vector(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn magnitude(&self) -> f64 {
        self.vector().norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Gyroscope sample, rad/s
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GyroSample {
    pub timestamp_ms: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl GyroSample {
    pub fn new(x: f64, y: f64, z: f64, timestamp_ms: i64) -> Self {
        Self { timestamp_ms, x, y, z }
    }

    pub fn vector(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Per-axis rotation rate in degrees per second
    pub fn degrees_per_sec(&self) -> Vec3 {
        self.vector().map(f64::to_degrees)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Combined reading as recorded by the host; either part may be absent.
///
/// Each part carries its own timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorSample {
    #[serde(default)]
    pub accel: Option<AccelSample>,
    #[serde(default)]
    pub gyro: Option<GyroSample>,
}

impl SensorSample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accel(mut self, accel: AccelSample) -> Self {
        self.accel = Some(accel);
        self
    }

    pub fn with_gyro(mut self, gyro: GyroSample) -> Self {
        self.gyro = Some(gyro);
        self
    }
}
