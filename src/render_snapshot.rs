//! Per-frame output handed to the rendering backend.
//!
//! The backend only ever reads these; nothing flows back into the simulation.

use glam::{Mat3, Mat4, Quat, Vec3};
use serde::Serialize;

use crate::sim::{animator::PoseSnapshot, motion::MotionState, scene::Scene};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraSnapshot {
    pub position: Vec3,
    pub rotation: Quat,
    pub target: Vec3,
    /// deg
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    pub aspect: f32,
}

impl Default for CameraSnapshot {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            target: Vec3::NEG_Z,
            fovy: 75.0,
            znear: 0.1,
            zfar: 1000.0,
            aspect: 16.0 / 9.0,
        }
    }
}

/// Camera uniform block, ready to upload as-is.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraMatrices {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 3],
    pub _padding: f32,
}

impl CameraSnapshot {
    pub fn view(&self) -> Mat4 {
        let rot_inv = self.rotation.conjugate();
        Mat4::from_rotation_translation(rot_inv, -(rot_inv * self.position))
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy.to_radians(), self.aspect, self.znear, self.zfar)
    }

    pub fn matrices(&self) -> CameraMatrices {
        CameraMatrices {
            view_proj: (self.projection() * self.view()).to_cols_array_2d(),
            position: self.position.to_array(),
            _padding: 0.0,
        }
    }
}

/// Model matrix plus its inverse-transpose for normals.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceTransform {
    pub m4: [[f32; 4]; 4],
    pub itr: [[f32; 3]; 3],
}

impl InstanceTransform {
    pub fn from_transform(transform: Mat4) -> Self {
        let m4 = transform.to_cols_array_2d();
        let itr = Mat3::from_mat4(transform)
            .inverse()
            .transpose()
            .to_cols_array_2d();

        Self { m4, itr }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgentSnapshot {
    pub position: Vec3,
    pub rotation: Quat,
    pub pose: PoseSnapshot,
    pub position_index: usize,
    pub facing_index: usize,
}

impl AgentSnapshot {
    pub fn instance(&self) -> InstanceTransform {
        InstanceTransform::from_transform(Mat4::from_rotation_translation(
            self.rotation,
            self.position,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerSnapshot {
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub frame_index: u64,
    pub elapsed_secs: f32,
    pub motion_state: MotionState,
    /// Waiting for the camera before walking.
    pub pending_walk: bool,
    pub speed: f64,
    pub agent: AgentSnapshot,
    pub camera: CameraSnapshot,
    pub marker: MarkerSnapshot,
}

impl FrameSnapshot {
    pub fn build(scene: &Scene, frame_index: u64) -> Self {
        let motion = &scene.motion;
        let agent = motion.agent_transform();
        Self {
            frame_index,
            elapsed_secs: scene.global_time_sec,
            motion_state: motion.state(),
            pending_walk: motion.is_pending(),
            speed: motion.speed(),
            agent: AgentSnapshot {
                position: agent.position,
                rotation: agent.rotation,
                pose: motion.pose(),
                position_index: motion.position_index(),
                facing_index: motion.facing_index(),
            },
            camera: scene.rig.camera().build_snapshot(),
            marker: scene.marker.build_snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::animator::Pose;

    #[test]
    fn pod_layouts_have_no_padding_surprises() {
        assert_eq!(std::mem::size_of::<CameraMatrices>(), 80);
        assert_eq!(std::mem::size_of::<InstanceTransform>(), 100);
        let camera = CameraSnapshot::default().matrices();
        assert_eq!(bytemuck::bytes_of(&camera).len(), 80);
    }

    #[test]
    fn view_projection_puts_target_in_front() {
        let camera = CameraSnapshot::default();
        let clip = Mat4::from_cols_array_2d(&camera.matrices().view_proj)
            * camera.target.extend(1.0);
        assert!(clip.w > 0.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
    }

    #[test]
    fn identity_instance_has_identity_normal_matrix() {
        let instance = InstanceTransform::from_transform(Mat4::from_translation(Vec3::ONE));
        assert_eq!(instance.itr, Mat3::IDENTITY.to_cols_array_2d());
    }

    #[test]
    fn agent_instance_carries_position_and_heading() {
        let agent = AgentSnapshot {
            position: Vec3::new(3.0, 0.0, -4.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            pose: PoseSnapshot {
                from: Pose::Idle,
                to: Pose::Walk,
                weight: 0.5,
            },
            position_index: 7,
            facing_index: 57,
        };
        let instance = agent.instance();
        assert_eq!(instance.m4[3], [3.0, 0.0, -4.0, 1.0]);

        let model = Mat4::from_cols_array_2d(&instance.m4);
        let forward = model.transform_vector3(Vec3::NEG_Z);
        assert!(forward.abs_diff_eq(Vec3::NEG_X, 1e-5));

        // pure rotation: normal matrix equals the rotation part
        let normal = Mat3::from_cols_array_2d(&instance.itr);
        assert!(normal.abs_diff_eq(Mat3::from_quat(agent.rotation), 1e-5));
    }
}
