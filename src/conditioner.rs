//! Accelerometer conditioning: gravity separation, moving-average denoising,
//! and a dead zone for sensor noise.

use std::collections::VecDeque;

use crate::config::MotionConfig;
use crate::types::Vec3;

/// Simple moving average over a bounded window
pub struct MovingAverage {
    window: VecDeque<f64>,
    window_size: usize,
}

impl MovingAverage {
    /// Create an averager over the last `window_size` values (minimum 1)
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        MovingAverage {
            window: VecDeque::with_capacity(window_size),
            window_size,
        }
    }

    /// Push a value and return the mean of the current window
    pub fn apply(&mut self, value: f64) -> f64 {
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(value);

        self.window.iter().sum::<f64>() / self.window.len() as f64
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

/// Per-axis exponential moving average tracking the gravity component.
///
/// `gravity = alpha * gravity + (1 - alpha) * raw`, so the estimate stays inside
/// the hull of the previous estimate and the newest sample.
#[derive(Debug, Clone)]
pub struct GravityFilter {
    gravity: Vec3,
    alpha: f64,
}

impl GravityFilter {
    pub fn new(alpha: f64) -> Self {
        Self {
            gravity: Vec3::zeros(),
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// Fold in a raw sample and return the updated gravity estimate
    pub fn update(&mut self, raw: &Vec3) -> Vec3 {
        self.gravity = self.gravity * self.alpha + raw * (1.0 - self.alpha);
        self.gravity
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn reset(&mut self) {
        self.gravity = Vec3::zeros();
    }
}

/// Turns raw accelerometer readings into denoised linear acceleration.
///
/// The gravity estimate also follows any sustained load. With the default
/// `gravity_alpha` of 0.9 and a 5-sample window, a constant 12 m/s² deceleration is
/// absorbed within about 20 samples and never exceeds the brake threshold after
/// smoothing. Sustained braking only reaches the classifier with a much slower
/// gravity filter (alpha close to 1).
pub struct SignalConditioner {
    gravity: GravityFilter,
    axes: [MovingAverage; 3],
    deadzone: f64,
}

impl SignalConditioner {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            gravity: GravityFilter::new(config.gravity_alpha),
            axes: [
                MovingAverage::new(config.ma_window),
                MovingAverage::new(config.ma_window),
                MovingAverage::new(config.ma_window),
            ],
            deadzone: config.noise_deadzone,
        }
    }

    /// Condition one raw sample (m/s², gravity included).
    ///
    /// The first samples after construction or `reset` carry a cold-start transient
    /// while the gravity estimate converges. A non-finite sample yields zero and
    /// leaves the filter state untouched.
    pub fn condition(&mut self, raw: &Vec3) -> Vec3 {
        if !raw.iter().all(|v| v.is_finite()) {
            log::warn!("ignoring non-finite accel sample {:?}", raw);
            return Vec3::zeros();
        }
        let gravity = self.gravity.update(raw);
        let raw_linear = raw - gravity;

        let mut linear = Vec3::zeros();
        for (axis, avg) in self.axes.iter_mut().enumerate() {
            let smoothed = avg.apply(raw_linear[axis]);
            linear[axis] = if smoothed.abs() < self.deadzone {
                0.0
            } else {
                smoothed
            };
        }
        linear
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity.gravity()
    }

    /// Samples currently held per axis
    pub fn window_len(&self) -> usize {
        self.axes[0].len()
    }

    /// Clear the averaging windows and zero the gravity estimate
    pub fn reset(&mut self) {
        self.gravity.reset();
        for avg in self.axes.iter_mut() {
            avg.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_moving_average_single_value() {
        let mut avg = MovingAverage::new(5);
        assert_eq!(avg.apply(5.0), 5.0);
    }

    #[test]
    fn test_moving_average_window_wrapping() {
        let mut avg = MovingAverage::new(2);
        avg.apply(1.0);
        avg.apply(2.0);
        let result = avg.apply(3.0); // drops 1.0
        assert_eq!(avg.len(), 2);
        assert_relative_eq!(result, 2.5);
    }

    #[test]
    fn test_moving_average_never_exceeds_window() {
        let mut avg = MovingAverage::new(5);
        for i in 0..100 {
            avg.apply(i as f64);
            assert!(avg.len() <= 5);
        }
    }

    #[test]
    fn test_gravity_is_convex_combination() {
        let mut filter = GravityFilter::new(0.9);
        let mut prev = filter.gravity();
        for i in 0..50 {
            let raw = Vec3::new((i % 7) as f64 - 3.0, 0.5, 9.81 + (i % 3) as f64);
            let g = filter.update(&raw);
            for axis in 0..3 {
                let lo = prev[axis].min(raw[axis]);
                let hi = prev[axis].max(raw[axis]);
                assert!(g[axis] >= lo - 1e-12 && g[axis] <= hi + 1e-12);
            }
            prev = g;
        }
    }

    #[test]
    fn test_gravity_converges_to_constant_input() {
        let mut filter = GravityFilter::new(0.9);
        let raw = Vec3::new(0.0, 0.0, 9.81);
        for _ in 0..300 {
            filter.update(&raw);
        }
        assert_relative_eq!(filter.gravity().z, 9.81, epsilon = 1e-6);
    }

    #[test]
    fn test_stationary_device_settles_to_zero() {
        let mut conditioner = SignalConditioner::new(&MotionConfig::default());
        let raw = Vec3::new(0.02, -0.01, 9.81);
        let mut linear = Vec3::zeros();
        for _ in 0..200 {
            linear = conditioner.condition(&raw);
        }
        assert_eq!(linear, Vec3::zeros());
    }

    #[test]
    fn test_deadzone_clamps_small_values() {
        let config = MotionConfig {
            gravity_alpha: 0.5,
            ma_window: 1,
            noise_deadzone: 0.5,
            ..MotionConfig::default()
        };
        let mut conditioner = SignalConditioner::new(&config);
        // half of each axis lands in the gravity estimate on the first sample
        let linear = conditioner.condition(&Vec3::new(0.6, 3.0, -0.8));
        assert_eq!(linear.x, 0.0);
        assert_relative_eq!(linear.y, 1.5);
        assert_eq!(linear.z, 0.0);
    }

    #[test]
    fn test_first_sample_cold_start() {
        let mut conditioner = SignalConditioner::new(&MotionConfig::default());
        let linear = conditioner.condition(&Vec3::new(0.0, 0.0, 10.0));
        // gravity = 0.1 * 10, linear = 10 - 1
        assert_relative_eq!(linear.z, 9.0, epsilon = 1e-9);
    }

    #[test]
    fn test_non_finite_sample_does_not_poison_gravity() {
        let config = MotionConfig::default();
        let mut conditioner = SignalConditioner::new(&config);
        let mut clean = SignalConditioner::new(&config);
        let raw = Vec3::new(0.3, -0.2, 9.81);
        for _ in 0..50 {
            conditioner.condition(&raw);
            clean.condition(&raw);
        }

        assert_eq!(
            conditioner.condition(&Vec3::new(f64::NAN, 0.0, 9.81)),
            Vec3::zeros()
        );
        assert_eq!(
            conditioner.condition(&Vec3::new(0.0, f64::INFINITY, 9.81)),
            Vec3::zeros()
        );
        assert_eq!(conditioner.gravity(), clean.gravity());
        assert_eq!(conditioner.condition(&raw), clean.condition(&raw));
    }

    #[test]
    fn test_reset_matches_fresh_instance() {
        let config = MotionConfig::default();
        let mut used = SignalConditioner::new(&config);
        for i in 0..20 {
            used.condition(&Vec3::new(i as f64, 1.0, 9.81));
        }
        used.reset();
        assert_eq!(used.gravity(), Vec3::zeros());
        assert_eq!(used.window_len(), 0);

        let mut fresh = SignalConditioner::new(&config);
        for i in 0..10 {
            let raw = Vec3::new(0.5 * i as f64, -2.0, 9.81);
            assert_eq!(used.condition(&raw), fresh.condition(&raw));
        }
    }
}
