use std::{fs, path::Path, time::Duration};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    path::curve::CurveKind,
    sim::easing::Easing,
};

/// Every tunable of a mounted scene.
///
/// All fields have defaults, so a JSON file only has to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfinderConfig {
    /// Ordered waypoints, `[x, y, z]`.
    pub waypoints: Vec<[f32; 3]>,
    pub closed: bool,
    pub curve_kind: CurveKind,
    /// Only used by [`CurveKind::Uniform`].
    pub tension: f32,

    /// Number of arc-length spaced samples the agent walks over.
    pub sample_count: usize,
    /// Chord segments used to measure arc length before sampling.
    pub arc_length_divisions: usize,
    /// How many samples ahead of the agent it looks.
    pub lookahead_samples: usize,

    /// Laps per second at speed multiplier 1.
    pub reference_laps_per_second: f64,
    pub speed_min: f64,
    pub speed_max: f64,
    pub initial_speed: f64,

    pub transition_duration_ms: u64,
    pub easing: Easing,
    /// Camera position relative to the agent, in the agent's local frame
    /// (forward is -Z).
    pub camera_offset: [f32; 3],
    pub camera_start: [f32; 3],
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    pub aspect: f32,

    pub pose_blend_secs: f32,
    /// Ring marker spin, radians per second.
    pub marker_spin_rate: f32,
    pub tick_hz: u32,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            waypoints: vec![
                [-60.0, 0.0, 60.0],
                [-60.0, 0.0, -60.0],
                [60.0, 0.0, -60.0],
                [60.0, 0.0, 60.0],
            ],
            closed: true,
            curve_kind: CurveKind::Uniform,
            tension: 0.5,
            sample_count: 30_000,
            arc_length_divisions: 2_000,
            lookahead_samples: 50,
            reference_laps_per_second: 0.05,
            speed_min: 0.1,
            speed_max: 5.0,
            initial_speed: 1.0,
            transition_duration_ms: 1_000,
            easing: Easing::EaseOutQuad,
            camera_offset: [0.0, 15.0, 35.0],
            camera_start: [0.0, 50.0, 100.0],
            fovy: 75.0,
            znear: 0.1,
            zfar: 1000.0,
            aspect: 16.0 / 9.0,
            pose_blend_secs: 0.5,
            marker_spin_rate: 1.0,
            tick_hz: 60,
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn finite(field: &'static str, values: &[f32]) -> Result<(), ConfigError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field })
    }
}

impl PathfinderConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: PathfinderConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Waypoints are checked by the curve builder, not here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("sample_count", self.sample_count as f64)?;
        positive("arc_length_divisions", self.arc_length_divisions as f64)?;
        positive("reference_laps_per_second", self.reference_laps_per_second)?;
        positive("speed_min", self.speed_min)?;
        positive("speed_max", self.speed_max)?;
        positive("tick_hz", self.tick_hz as f64)?;
        positive("fovy", self.fovy as f64)?;
        positive("znear", self.znear as f64)?;
        positive("aspect", self.aspect as f64)?;
        if !(self.zfar > self.znear) {
            return Err(ConfigError::NotPositive {
                field: "zfar - znear",
                value: (self.zfar - self.znear) as f64,
            });
        }
        if self.pose_blend_secs < 0.0 || !self.pose_blend_secs.is_finite() {
            return Err(ConfigError::NotPositive {
                field: "pose_blend_secs",
                value: self.pose_blend_secs as f64,
            });
        }
        finite("tension", &[self.tension])?;
        finite("camera_offset", &self.camera_offset)?;
        finite("camera_start", &self.camera_start)?;
        finite("marker_spin_rate", &[self.marker_spin_rate])?;
        if self.speed_min > self.speed_max {
            return Err(ConfigError::EmptySpeedRange {
                min: self.speed_min,
                max: self.speed_max,
            });
        }
        if !(self.speed_min..=self.speed_max).contains(&self.initial_speed) {
            return Err(ConfigError::InitialSpeedOutOfRange {
                speed: self.initial_speed,
                min: self.speed_min,
                max: self.speed_max,
            });
        }
        if self.lookahead_samples >= self.sample_count {
            return Err(ConfigError::LookaheadTooLarge {
                lookahead: self.lookahead_samples,
                sample_count: self.sample_count,
            });
        }
        Ok(())
    }

    pub fn waypoints(&self) -> Vec<Vec3> {
        self.waypoints.iter().copied().map(Vec3::from).collect()
    }

    pub fn transition_duration(&self) -> Duration {
        Duration::from_millis(self.transition_duration_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz.max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(PathfinderConfig::default().validate(), Ok(()));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PathfinderConfig =
            serde_json::from_str(r#"{ "sample_count": 1000, "easing": "linear" }"#).unwrap();
        assert_eq!(config.sample_count, 1000);
        assert_eq!(config.easing, Easing::Linear);
        assert_eq!(config.lookahead_samples, 50);
        assert!(config.closed);
    }

    #[test]
    fn rejects_inverted_speed_range() {
        let config = PathfinderConfig {
            speed_min: 3.0,
            speed_max: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptySpeedRange { .. })
        ));
    }

    #[test]
    fn rejects_lookahead_past_the_path() {
        let config = PathfinderConfig {
            sample_count: 40,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::LookaheadTooLarge { .. })
        ));
    }

    #[test]
    fn rejects_non_finite_camera_and_marker() {
        let offset = PathfinderConfig {
            camera_offset: [f32::NAN, 15.0, 35.0],
            ..Default::default()
        };
        assert_eq!(
            offset.validate(),
            Err(ConfigError::NonFinite { field: "camera_offset" })
        );

        let start = PathfinderConfig {
            camera_start: [0.0, f32::INFINITY, 100.0],
            ..Default::default()
        };
        assert_eq!(
            start.validate(),
            Err(ConfigError::NonFinite { field: "camera_start" })
        );

        let spin = PathfinderConfig {
            marker_spin_rate: f32::INFINITY,
            ..Default::default()
        };
        assert_eq!(
            spin.validate(),
            Err(ConfigError::NonFinite { field: "marker_spin_rate" })
        );

        let tension = PathfinderConfig {
            tension: f32::NAN,
            ..Default::default()
        };
        assert_eq!(tension.validate(), Err(ConfigError::NonFinite { field: "tension" }));
    }

    #[test]
    fn rejects_nan_far_plane() {
        let config = PathfinderConfig {
            zfar: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_samples() {
        let config = PathfinderConfig {
            sample_count: 0,
            lookahead_samples: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive { field: "sample_count", .. })
        ));
    }
}
