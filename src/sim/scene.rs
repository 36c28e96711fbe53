use std::{sync::Arc, time::Duration};

use glam::{Quat, Vec3};
use tracing::info;

use crate::{
    config::PathfinderConfig,
    error::Result,
    path::{Curve, CurveBuilder, SampledPath, SpacedSampler},
    render_snapshot::MarkerSnapshot,
};

use super::{
    camera::CameraRig,
    motion::{Control, ControlOutcome, MotionController},
};

/// Spinning ring at the start of the path. Purely cosmetic.
#[derive(Debug, Clone)]
pub struct RingMarker {
    pub position: Vec3,
    /// rad
    pub angle: f32,
    /// rad/s
    pub spin_rate: f32,
}

impl RingMarker {
    pub fn update(&mut self, dt: f32) {
        self.angle = (self.angle + self.spin_rate * dt).rem_euclid(std::f32::consts::TAU);
    }

    pub fn build_snapshot(&self) -> MarkerSnapshot {
        MarkerSnapshot {
            position: self.position,
            rotation: Quat::from_rotation_y(self.angle),
        }
    }
}

/// Everything a mounted scene owns. Mutated only by the loop that drives it.
pub struct Scene {
    pub curve: Curve,
    pub path: Arc<SampledPath>,
    pub motion: MotionController,
    pub rig: CameraRig,
    pub marker: RingMarker,
    pub global_time_sec: f32,
}

impl Scene {
    /// Validates `config`, builds the curve and samples it. Any failure here
    /// leaves nothing behind to tear down.
    pub fn build(config: &PathfinderConfig) -> Result<Self> {
        config.validate()?;
        let curve = CurveBuilder::new()
            .kind(config.curve_kind)
            .tension(config.tension)
            .build(&config.waypoints(), config.closed)?;
        let path = Arc::new(
            SpacedSampler::new(config.arc_length_divisions).sample(&curve, config.sample_count)?,
        );
        info!(
            waypoints = curve.points().len(),
            closed = curve.is_closed(),
            samples = path.len(),
            length = path.total_length(),
            "path built"
        );

        let motion = MotionController::new(path.clone(), config);
        let rig = CameraRig::from_config(config);
        let marker = RingMarker {
            position: path.point(0),
            angle: 0.0,
            spin_rate: config.marker_spin_rate,
        };

        Ok(Self {
            curve,
            path,
            motion,
            rig,
            marker,
            global_time_sec: 0.0,
        })
    }

    pub fn apply(&mut self, control: Control) -> ControlOutcome {
        self.motion.apply(control, &mut self.rig)
    }

    /// One frame of simulation:
    /// 1. advance the camera flight, letting a landing start the walk,
    /// 2. move the agent if walking (the camera follows),
    /// 3. cosmetic updates.
    pub fn frame(&mut self, dt: Duration) {
        self.global_time_sec += dt.as_secs_f32();

        if let Some(flight) = self.rig.advance(dt) {
            self.motion.on_camera_arrived(flight);
        }
        self.motion.tick(dt, &mut self.rig);
        self.motion.update_pose(dt);
        self.marker.update(dt.as_secs_f32());
    }

    /// Coarse track polyline for the backend to draw.
    pub fn track_preview(&self, divisions: usize) -> Vec<Vec3> {
        self.path.preview(divisions)
    }
}
