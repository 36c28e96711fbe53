use std::time::Duration;

use glam::{Mat3, Quat, Vec3};
use tracing::debug;

use crate::{config::PathfinderConfig, render_snapshot::CameraSnapshot};

use super::{easing::Easing, motion::AgentTransform};

/// Rotation whose local -Z points from `eye` to `target`.
///
/// Returns identity when the two coincide; falls back to +Z as the up hint
/// when looking straight along `world_up`.
pub fn look_at_rotation(eye: Vec3, target: Vec3, world_up: Vec3) -> Quat {
    let forward = (target - eye).normalize_or_zero();
    if forward == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let mut up = (world_up - forward * world_up.dot(forward)).normalize_or_zero();
    if up == Vec3::ZERO {
        up = (Vec3::Z - forward * Vec3::Z.dot(forward)).normalize();
    }
    let right = forward.cross(up);

    // Camera looks down -Z
    Quat::from_mat3(&Mat3::from_cols(right, up, -forward))
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// deg
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 50.0, 100.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fovy: 75.0,
            znear: 0.1,
            zfar: 1000.0,
            aspect: 16.0 / 9.0,
        }
    }
}

impl Camera {
    pub fn build_snapshot(&self) -> CameraSnapshot {
        CameraSnapshot {
            position: self.eye,
            rotation: look_at_rotation(self.eye, self.target, self.up),
            target: self.target,
            fovy: self.fovy,
            znear: self.znear,
            zfar: self.zfar,
            aspect: self.aspect,
        }
    }
}

/// Handle of a camera flight, reported back by [`CameraRig::advance`] once it lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlightId(u64);

#[derive(Debug, Clone)]
struct CameraTransition {
    id: FlightId,
    start_eye: Vec3,
    start_target: Vec3,
    end_eye: Vec3,
    end_target: Vec3,
    duration: Duration,
    elapsed: Duration,
    easing: Easing,
}

impl CameraTransition {
    fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            1.0
        } else {
            (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
        }
    }
}

/// Camera locked behind the agent, with at most one eased flight in progress.
///
/// Outside a flight the camera only moves when told to ([`Self::snap_behind`]).
#[derive(Debug, Clone)]
pub struct CameraRig {
    camera: Camera,
    /// Agent-local offset; the agent faces -Z.
    offset: Vec3,
    easing: Easing,
    transition: Option<CameraTransition>,
    next_flight: u64,
}

impl CameraRig {
    pub fn new(camera: Camera, offset: Vec3, easing: Easing) -> Self {
        Self {
            camera,
            offset,
            easing,
            transition: None,
            next_flight: 0,
        }
    }

    pub fn from_config(config: &PathfinderConfig) -> Self {
        let camera = Camera {
            eye: Vec3::from(config.camera_start),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fovy: config.fovy,
            znear: config.znear,
            zfar: config.zfar,
            aspect: config.aspect,
        };
        Self::new(camera, Vec3::from(config.camera_offset), config.easing)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn position(&self) -> Vec3 {
        self.camera.eye
    }

    pub fn target(&self) -> Vec3 {
        self.camera.target
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.camera.aspect = aspect;
        }
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// World-space eye and look-at target behind `agent`.
    pub fn behind(&self, agent: &AgentTransform) -> (Vec3, Vec3) {
        (agent.position + agent.rotation * self.offset, agent.position)
    }

    /// Places the camera behind `agent` immediately, dropping any flight.
    pub fn snap_behind(&mut self, agent: &AgentTransform) {
        self.cancel_transition();
        let (eye, target) = self.behind(agent);
        self.camera.eye = eye;
        self.camera.target = target;
    }

    /// Starts an eased flight to the spot behind `agent`, replacing any flight
    /// in progress. The returned id comes back from [`Self::advance`] exactly
    /// once, on the frame the flight lands.
    pub fn fly_behind(&mut self, agent: &AgentTransform, duration: Duration) -> FlightId {
        if let Some(old) = self.transition.take() {
            debug!(flight = old.id.0, "camera flight superseded");
        }
        let id = FlightId(self.next_flight);
        self.next_flight += 1;
        let (end_eye, end_target) = self.behind(agent);
        self.transition = Some(CameraTransition {
            id,
            start_eye: self.camera.eye,
            start_target: self.camera.target,
            end_eye,
            end_target,
            duration,
            elapsed: Duration::ZERO,
            easing: self.easing,
        });
        debug!(flight = id.0, ?duration, "camera flight started");
        id
    }

    pub fn cancel_transition(&mut self) -> bool {
        match self.transition.take() {
            Some(old) => {
                debug!(flight = old.id.0, "camera flight cancelled");
                true
            }
            None => false,
        }
    }

    /// Moves the active flight forward by `dt`. Returns its id when it lands.
    pub fn advance(&mut self, dt: Duration) -> Option<FlightId> {
        let transition = self.transition.as_mut()?;
        transition.elapsed += dt;
        let eased = transition.easing.apply(transition.progress());
        self.camera.eye = transition.start_eye.lerp(transition.end_eye, eased);
        self.camera.target = transition.start_target.lerp(transition.end_target, eased);

        if transition.elapsed >= transition.duration {
            let id = transition.id;
            // land exactly on the end pose regardless of easing rounding
            self.camera.eye = transition.end_eye;
            self.camera.target = transition.end_target;
            self.transition = None;
            debug!(flight = id.0, "camera flight landed");
            Some(id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rig() -> CameraRig {
        CameraRig::new(Camera::default(), Vec3::new(0.0, 10.0, 20.0), Easing::EaseOutQuad)
    }

    fn agent_at(position: Vec3, facing: Vec3) -> AgentTransform {
        AgentTransform {
            position,
            rotation: look_at_rotation(position, facing, Vec3::Y),
        }
    }

    #[test]
    fn look_at_points_negative_z_at_target() {
        let rotation = look_at_rotation(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), Vec3::Y);
        let forward = rotation * Vec3::NEG_Z;
        assert!(forward.abs_diff_eq(Vec3::X, 1e-5), "{forward}");
    }

    #[test]
    fn look_at_degenerate_inputs_stay_finite() {
        assert_eq!(look_at_rotation(Vec3::ONE, Vec3::ONE, Vec3::Y), Quat::IDENTITY);
        let straight_down = look_at_rotation(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, Vec3::Y);
        assert!(straight_down.is_finite());
    }

    #[test]
    fn snap_places_camera_behind_and_above() {
        let mut rig = rig();
        // agent at origin facing +X, so "behind" is -X
        let agent = agent_at(Vec3::ZERO, Vec3::X);
        rig.snap_behind(&agent);
        assert!(rig.position().abs_diff_eq(Vec3::new(-20.0, 10.0, 0.0), 1e-4));
        assert_eq!(rig.target(), Vec3::ZERO);
    }

    #[test]
    fn flight_lands_exactly_once() {
        let mut rig = rig();
        let agent = agent_at(Vec3::ZERO, Vec3::NEG_Z);
        let id = rig.fly_behind(&agent, Duration::from_millis(1000));

        assert_eq!(rig.advance(Duration::from_millis(400)), None);
        assert!(rig.is_transitioning());
        assert_eq!(rig.advance(Duration::from_millis(600)), Some(id));
        assert!(!rig.is_transitioning());
        assert_eq!(rig.advance(Duration::from_millis(16)), None);
        assert!(rig.position().abs_diff_eq(Vec3::new(0.0, 10.0, 20.0), 1e-5));
    }

    #[test]
    fn flight_is_eased() {
        let mut rig = CameraRig::new(
            Camera {
                eye: Vec3::ZERO,
                ..Default::default()
            },
            Vec3::new(0.0, 0.0, 100.0),
            Easing::EaseOutQuad,
        );
        let agent = AgentTransform {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        };
        rig.fly_behind(&agent, Duration::from_secs(1));
        rig.advance(Duration::from_millis(500));
        assert_relative_eq!(rig.position().z, 75.0, epsilon = 1e-3);
    }

    #[test]
    fn new_flight_supersedes_the_old_one() {
        let mut rig = rig();
        let agent = agent_at(Vec3::ZERO, Vec3::NEG_Z);
        let first = rig.fly_behind(&agent, Duration::from_millis(100));
        let second = rig.fly_behind(&agent, Duration::from_millis(100));
        assert_ne!(first, second);
        assert_eq!(rig.advance(Duration::from_millis(100)), Some(second));
    }

    #[test]
    fn zero_duration_lands_on_next_advance() {
        let mut rig = rig();
        let agent = agent_at(Vec3::ZERO, Vec3::NEG_Z);
        let id = rig.fly_behind(&agent, Duration::ZERO);
        assert_eq!(rig.advance(Duration::ZERO), Some(id));
    }

    #[test]
    fn snap_cancels_flight() {
        let mut rig = rig();
        let agent = agent_at(Vec3::ZERO, Vec3::NEG_Z);
        rig.fly_behind(&agent, Duration::from_secs(1));
        rig.snap_behind(&agent);
        assert!(!rig.is_transitioning());
        assert_eq!(rig.advance(Duration::from_secs(2)), None);
    }

    #[test]
    fn view_matrix_moves_eye_to_origin() {
        let camera = Camera::default();
        let view = camera.build_snapshot().view();
        let eye_in_view = view.transform_point3(camera.eye);
        assert!(eye_in_view.abs_diff_eq(Vec3::ZERO, 1e-3));
        let target_in_view = view.transform_point3(camera.target);
        assert!(target_in_view.z < 0.0);
    }
}
