//! Camera configuration

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Camera configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Closest the camera may get to the target
    pub min_distance: f32,
    /// Farthest the camera may get from the target
    pub max_distance: f32,
    /// Distance at startup
    pub initial_distance: f32,
    /// Pitch limit in radians, applied symmetrically
    pub pitch_max: f32,
    /// Rotation sensitivity (radians per pixel)
    pub sensitivity: f32,
    /// Distance change per wheel notch
    pub wheel_step: f32,
    /// Point the camera orbits around
    pub target: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_distance: 1.0,
            max_distance: 10.0,
            initial_distance: 5.0,
            pitch_max: 1.5,
            sensitivity: 0.01,
            wheel_step: 0.5,
            target: Vec3::ZERO,
        }
    }
}

impl CameraConfig {
    /// Replace ranges that cannot be clamped against with the defaults.
    ///
    /// Settings files are user-edited, so an inverted distance range or a
    /// non-positive pitch limit falls back rather than reaching `clamp`.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        if !(self.min_distance > 0.0
            && self.min_distance <= self.max_distance
            && self.max_distance.is_finite())
        {
            warn!(
                "Invalid camera distance range [{}, {}], using [{}, {}]",
                self.min_distance, self.max_distance, defaults.min_distance, defaults.max_distance
            );
            self.min_distance = defaults.min_distance;
            self.max_distance = defaults.max_distance;
        }

        if !(self.pitch_max.is_finite() && self.pitch_max > 0.0) {
            warn!(
                "Invalid camera pitch limit {}, using {}",
                self.pitch_max, defaults.pitch_max
            );
            self.pitch_max = defaults.pitch_max;
        }

        if !self.initial_distance.is_finite() {
            warn!(
                "Invalid initial camera distance {}, using {}",
                self.initial_distance, defaults.initial_distance
            );
            self.initial_distance = defaults.initial_distance;
        }
        self.initial_distance = self.clamp_distance(self.initial_distance);

        self
    }

    /// Clamp a distance into the configured range.
    pub fn clamp_distance(&self, distance: f32) -> f32 {
        distance.clamp(self.min_distance, self.max_distance)
    }

    /// Clamp a pitch angle into `[-pitch_max, pitch_max]`.
    pub fn clamp_pitch(&self, pitch: f32) -> f32 {
        pitch.clamp(-self.pitch_max, self.pitch_max)
    }
}
