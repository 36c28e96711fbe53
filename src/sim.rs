use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    io,
    time::{Duration, Instant},
};

use crossbeam_queue::SegQueue;
use tracing::{debug, error, info, warn};

use crate::{render_snapshot::FrameSnapshot, snapshot_handoff::SnapshotHandoff};

use self::{motion::Control, scene::Scene};

pub mod animator;
pub mod camera;
pub mod easing;
pub mod motion;
pub mod scene;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Control(Control),
    AspectChange(f32),
    Shutdown,
}

const SPIN: Duration = Duration::from_micros(200);

/// The per-frame driver of one mounted scene.
///
/// Each frame drains pending inputs, runs [`Scene::frame`] and publishes a
/// [`FrameSnapshot`]. [`Self::start`] consumes the loop, so a scene is only
/// ever driven by one loop.
pub struct RenderLoop {
    scene: Scene,
    tick: Duration,
    inputs: Arc<SegQueue<InputEvent>>,
    handoff: Arc<SnapshotHandoff>,
    frame_index: u64,
}

impl RenderLoop {
    pub fn new(scene: Scene, tick: Duration) -> Self {
        let handoff = Arc::new(SnapshotHandoff::new(FrameSnapshot::build(&scene, 0)));
        Self {
            scene,
            tick,
            inputs: Arc::new(SegQueue::new()),
            handoff,
            frame_index: 0,
        }
    }

    pub fn inputs(&self) -> Arc<SegQueue<InputEvent>> {
        self.inputs.clone()
    }

    pub fn snapshots(&self) -> Arc<SnapshotHandoff> {
        self.handoff.clone()
    }

    /// Runs one frame with the given delta. Returns `false` once a shutdown
    /// has been requested; nothing is simulated or published in that case.
    pub fn step(&mut self, dt: Duration) -> bool {
        while let Some(event) = self.inputs.pop() {
            match event {
                InputEvent::Shutdown => return false,
                InputEvent::AspectChange(aspect) => self.scene.rig.set_aspect(aspect),
                InputEvent::Control(control) => {
                    let outcome = self.scene.apply(control);
                    debug!(?control, ?outcome, "control");
                }
            }
        }

        self.scene.frame(dt);

        self.frame_index += 1;
        self.handoff
            .publish(FrameSnapshot::build(&self.scene, self.frame_index));
        true
    }

    /// Moves the loop onto its own thread, paced at the configured tick.
    pub fn start(mut self) -> io::Result<RenderLoopHandle> {
        let inputs = self.inputs.clone();
        let handoff = self.handoff.clone();
        let cancel = Arc::new(AtomicBool::new(false));
        let thread_cancel = cancel.clone();

        let thread = thread::Builder::new()
            .name("pathfinder-loop".into())
            .spawn(move || {
                info!(tick = ?self.tick, "render loop started");
                let mut next = Instant::now() + self.tick;
                let mut prev_tick = Instant::now();
                while !thread_cancel.load(Ordering::Acquire) {
                    let now = Instant::now();
                    let dt = now - prev_tick;
                    prev_tick = now;

                    if !self.step(dt) {
                        break;
                    }

                    next += self.tick;

                    // sleep most of the remaining time, then spin the last bit
                    if let Some(remain) = next.checked_duration_since(Instant::now()) {
                        if remain > SPIN {
                            thread::sleep(remain - SPIN);
                        }
                        while Instant::now() < next {
                            std::hint::spin_loop();
                        }
                    } else {
                        // if we fell behind, resync the schedule
                        warn!(frame = self.frame_index, "render loop fell behind");
                        next = Instant::now() + self.tick;
                    }
                }
                info!(frames = self.frame_index, "render loop stopped");
            })
            .inspect_err(|e| error!("failed to spawn render loop: {e}"))?;

        Ok(RenderLoopHandle {
            inputs,
            handoff,
            cancel,
            thread: Some(thread),
        })
    }
}

/// Owner of a running loop. Dropping it stops the loop and releases the scene.
pub struct RenderLoopHandle {
    inputs: Arc<SegQueue<InputEvent>>,
    handoff: Arc<SnapshotHandoff>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl RenderLoopHandle {
    pub fn send(&self, event: InputEvent) {
        self.inputs.push(event);
    }

    pub fn control(&self, control: Control) {
        self.send(InputEvent::Control(control));
    }

    pub fn snapshots(&self) -> Arc<SnapshotHandoff> {
        self.handoff.clone()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops rescheduling and waits for the loop to finish its frame.
    /// Safe to call any number of times.
    pub fn shutdown(&mut self) {
        self.cancel.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("render loop panicked");
            }
        }
    }
}

impl Drop for RenderLoopHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::PathfinderConfig, sim::motion::MotionState};

    fn render_loop() -> RenderLoop {
        let scene = Scene::build(&PathfinderConfig {
            sample_count: 1000,
            ..Default::default()
        })
        .unwrap();
        RenderLoop::new(scene, Duration::from_millis(5))
    }

    #[test]
    fn step_applies_inputs_before_simulating() {
        let mut render_loop = render_loop();
        let inputs = render_loop.inputs();
        inputs.push(InputEvent::Control(Control::Start));
        inputs.push(InputEvent::AspectChange(2.0));

        assert!(render_loop.step(Duration::from_millis(1000)));
        let snap = render_loop.snapshots().latest();
        assert_eq!(snap.frame_index, 1);
        assert_eq!(snap.motion_state, MotionState::Walking);
        assert_eq!(snap.camera.aspect, 2.0);
    }

    #[test]
    fn shutdown_event_stops_stepping() {
        let mut render_loop = render_loop();
        render_loop.inputs().push(InputEvent::Shutdown);
        assert!(!render_loop.step(Duration::from_millis(16)));
        assert_eq!(render_loop.snapshots().latest().frame_index, 0);
    }

    #[test]
    fn handle_shutdown_is_idempotent() {
        let mut handle = render_loop().start().unwrap();
        assert!(handle.is_running());
        let snapshots = handle.snapshots();
        let deadline = Instant::now() + Duration::from_secs(5);
        while snapshots.load().gen < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(snapshots.load().gen >= 3);

        handle.shutdown();
        assert!(!handle.is_running());
        handle.shutdown();
        let frames = snapshots.load().gen;
        thread::sleep(Duration::from_millis(20));
        assert_eq!(snapshots.load().gen, frames);
    }

    #[test]
    fn dropping_the_handle_stops_the_loop() {
        let handle = render_loop().start().unwrap();
        let snapshots = handle.snapshots();
        drop(handle);
        let frames = snapshots.load().gen;
        thread::sleep(Duration::from_millis(20));
        assert_eq!(snapshots.load().gen, frames);
    }

    #[test]
    fn shutdown_while_start_flight_is_pending() {
        let scene = Scene::build(&PathfinderConfig {
            sample_count: 1000,
            transition_duration_ms: 60_000,
            ..Default::default()
        })
        .unwrap();
        let mut handle = RenderLoop::new(scene, Duration::from_millis(5))
            .start()
            .unwrap();
        let snapshots = handle.snapshots();
        handle.control(Control::Start);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !snapshots.latest().pending_walk && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        let snap = snapshots.latest();
        assert!(snap.pending_walk);
        assert_eq!(snap.motion_state, MotionState::Idle);

        handle.shutdown();
        handle.shutdown();
        assert!(!handle.is_running());
        let frames = snapshots.load().gen;
        thread::sleep(Duration::from_millis(20));
        assert_eq!(snapshots.load().gen, frames);
        assert!(snapshots.latest().pending_walk);
    }
}
