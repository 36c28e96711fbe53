use std::{sync::Arc, time::Duration};

use glam::{Quat, Vec3};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{config::PathfinderConfig, path::SampledPath};

use super::{
    animator::{Animator, Pose, PoseSnapshot},
    camera::{look_at_rotation, CameraRig, FlightId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    Idle,
    Walking,
    Paused,
}

/// A control intent from the input surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    Start,
    Pause,
    Resume,
    Exit,
    SetSpeed(f64),
}

impl MotionState {
    /// Controls that do something in this state. Input surfaces use this to
    /// disable the rest.
    pub fn allowed_controls(self) -> &'static [&'static str] {
        match self {
            MotionState::Idle => &["start", "speed"],
            MotionState::Walking => &["pause", "exit", "speed"],
            MotionState::Paused => &["resume", "exit", "speed"],
        }
    }
}

/// Whether a control call changed anything. Out-of-order calls are absorbed,
/// never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Applied,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentTransform {
    pub position: Vec3,
    /// Local -Z is the direction of travel.
    pub rotation: Quat,
}

/// Moves the agent along a sampled path and owns the idle / walking / paused
/// state machine.
///
/// Starting and resuming first fly the camera behind the agent; the state
/// only becomes [`MotionState::Walking`] once [`Self::on_camera_arrived`] is
/// called with that flight.
pub struct MotionController {
    path: Arc<SampledPath>,
    state: MotionState,
    pending: Option<FlightId>,
    /// Fractional sample position, `[0, len)`.
    progress: f64,
    speed: f64,
    speed_min: f64,
    speed_max: f64,
    lookahead: usize,
    /// Samples per second at speed 1.
    scaling_constant: f64,
    transition_duration: Duration,
    rotation: Quat,
    animator: Animator,
}

impl MotionController {
    pub fn new(path: Arc<SampledPath>, config: &PathfinderConfig) -> Self {
        let scaling_constant = config.reference_laps_per_second * path.len() as f64;
        let mut controller = Self {
            path,
            state: MotionState::Idle,
            pending: None,
            progress: 0.0,
            speed: config.initial_speed,
            speed_min: config.speed_min,
            speed_max: config.speed_max,
            lookahead: config.lookahead_samples,
            scaling_constant,
            transition_duration: config.transition_duration(),
            rotation: Quat::IDENTITY,
            animator: Animator::new(Pose::Idle, config.pose_blend_secs),
        };
        controller.refresh_orientation();
        controller
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    /// True while waiting for the camera to land before walking.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn path(&self) -> &Arc<SampledPath> {
        &self.path
    }

    pub fn position_index(&self) -> usize {
        (self.progress.floor() as usize).min(self.path.len() - 1)
    }

    pub fn facing_index(&self) -> usize {
        self.path.wrap_index(self.position_index() + self.lookahead)
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn scaling_constant(&self) -> f64 {
        self.scaling_constant
    }

    pub fn agent_transform(&self) -> AgentTransform {
        AgentTransform {
            position: self.path.point(self.position_index()),
            rotation: self.rotation,
        }
    }

    pub fn pose(&self) -> PoseSnapshot {
        self.animator.build_snapshot()
    }

    pub fn apply(&mut self, control: Control, rig: &mut CameraRig) -> ControlOutcome {
        match control {
            Control::Start => self.start(rig),
            Control::Pause => self.pause(),
            Control::Resume => self.resume(rig),
            Control::Exit => self.exit(rig),
            Control::SetSpeed(speed) => self.set_speed(speed),
        }
    }

    pub fn start(&mut self, rig: &mut CameraRig) -> ControlOutcome {
        if self.state != MotionState::Idle {
            return self.ignore("start");
        }
        self.progress = 0.0;
        self.refresh_orientation();
        self.fly_camera(rig);
        info!("start requested, waiting for camera");
        ControlOutcome::Applied
    }

    pub fn pause(&mut self) -> ControlOutcome {
        if self.state != MotionState::Walking {
            return self.ignore("pause");
        }
        self.state = MotionState::Paused;
        self.request_pose(Pose::Idle);
        info!(position_index = self.position_index(), "paused");
        ControlOutcome::Applied
    }

    pub fn resume(&mut self, rig: &mut CameraRig) -> ControlOutcome {
        if self.state != MotionState::Paused {
            return self.ignore("resume");
        }
        self.fly_camera(rig);
        info!("resume requested, waiting for camera");
        ControlOutcome::Applied
    }

    pub fn exit(&mut self, rig: &mut CameraRig) -> ControlOutcome {
        if !matches!(self.state, MotionState::Walking | MotionState::Paused) {
            return self.ignore("exit");
        }
        if self.pending.take().is_some() {
            rig.cancel_transition();
        }
        self.state = MotionState::Idle;
        self.progress = 0.0;
        self.refresh_orientation();
        self.request_pose(Pose::Idle);
        rig.snap_behind(&self.agent_transform());
        info!("exited to idle");
        ControlOutcome::Applied
    }

    /// Non-finite or non-positive values are ignored; the rest are clamped
    /// into the configured range.
    pub fn set_speed(&mut self, speed: f64) -> ControlOutcome {
        if !speed.is_finite() || speed <= 0.0 {
            warn!(speed, "rejected speed multiplier");
            return ControlOutcome::Ignored;
        }
        self.speed = speed.clamp(self.speed_min, self.speed_max);
        debug!(speed = self.speed, "speed changed");
        ControlOutcome::Applied
    }

    /// Completion of a camera flight. Only the flight started by the latest
    /// start / resume turns the agent loose.
    pub fn on_camera_arrived(&mut self, flight: FlightId) -> ControlOutcome {
        if self.pending != Some(flight) {
            debug!(?flight, "camera flight not awaited");
            return ControlOutcome::Ignored;
        }
        self.pending = None;
        self.state = MotionState::Walking;
        info!(position_index = self.position_index(), "walking");
        ControlOutcome::Applied
    }

    /// Advances the agent by `speed * scaling_constant * dt` samples and keeps
    /// the camera behind it. Only does anything while walking.
    pub fn tick(&mut self, dt: Duration, rig: &mut CameraRig) -> ControlOutcome {
        if self.state != MotionState::Walking {
            return ControlOutcome::Ignored;
        }
        let len = self.path.len() as f64;
        let step = self.speed * self.scaling_constant * dt.as_secs_f64();
        self.progress = if self.path.is_closed() {
            (self.progress + step).rem_euclid(len)
        } else {
            (self.progress + step).min(len - 1.0)
        };
        self.refresh_orientation();
        rig.snap_behind(&self.agent_transform());
        ControlOutcome::Applied
    }

    /// Steers the pose toward the motion state and advances its blend.
    pub fn update_pose(&mut self, dt: Duration) {
        let wanted = match self.state {
            MotionState::Walking => Pose::Walk,
            MotionState::Idle | MotionState::Paused => Pose::Idle,
        };
        // a refused request is retried next frame once the current blend ends
        let _ = self.animator.transition(wanted);
        self.animator.update(dt.as_secs_f32());
    }

    fn fly_camera(&mut self, rig: &mut CameraRig) {
        let flight = rig.fly_behind(&self.agent_transform(), self.transition_duration);
        if let Some(previous) = self.pending.replace(flight) {
            debug!(?previous, "pending walk superseded");
        }
    }

    fn request_pose(&mut self, pose: Pose) {
        if self.animator.transition(pose).is_err() {
            debug!(?pose, "pose change deferred until current blend ends");
        }
    }

    fn refresh_orientation(&mut self) {
        let position = self.path.point(self.position_index());
        let facing = self.path.point(self.facing_index());
        // keep the last heading where the lookahead collapses onto the agent
        if position.distance_squared(facing) > f32::EPSILON {
            self.rotation = look_at_rotation(position, facing, Vec3::Y);
        }
    }

    fn ignore(&self, control: &'static str) -> ControlOutcome {
        debug!(control, state = ?self.state, pending = self.is_pending(), "control ignored");
        ControlOutcome::Ignored
    }
}
