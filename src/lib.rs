//! An agent walking a closed (or open) Catmull-Rom path with a camera that
//! flies in behind it, driven by a fixed-rate frame loop.
//!
//! Setup is [`sim::scene::Scene::build`]; [`sim::RenderLoop`] drives it and
//! publishes a [`render_snapshot::FrameSnapshot`] per frame for whatever draws it.

pub mod config;
pub mod error;
pub mod path;
pub mod render_snapshot;
pub mod sim;
pub mod snapshot_handoff;

pub use config::PathfinderConfig;
pub use error::{ConfigError, Error, PathError};
pub use sim::{
    motion::{Control, ControlOutcome, MotionState},
    scene::Scene,
    InputEvent, RenderLoop, RenderLoopHandle,
};
