use std::{sync::Arc, time::Instant};

use arc_swap::{ArcSwap, Guard};

use crate::render_snapshot::FrameSnapshot;

pub type SnapshotGuard = Guard<Arc<SnapshotPair>>;

#[derive(Clone)]
pub struct SnapshotPair {
    pub prev: Arc<FrameSnapshot>,
    pub prev_timestamp: Instant,
    pub curr: Arc<FrameSnapshot>,
    pub curr_timestamp: Instant,
    /// monotonic, bumped on every publish
    pub gen: u64,
}

impl SnapshotPair {
    /// Interpolation factor from `prev` to `curr` for a frame drawn at `now`,
    /// assuming the next publish is one interval after `curr`.
    pub fn alpha(&self, now: Instant) -> f32 {
        let interval = self.curr_timestamp.saturating_duration_since(self.prev_timestamp);
        if interval.is_zero() {
            return 1.0;
        }
        let since = now.saturating_duration_since(self.curr_timestamp);
        (since.as_secs_f32() / interval.as_secs_f32()).clamp(0.0, 1.0)
    }
}

/// Lock-free exchange of the latest frame between the loop and a renderer.
pub struct SnapshotHandoff {
    pair: ArcSwap<SnapshotPair>,
}

impl SnapshotHandoff {
    pub fn new(init: FrameSnapshot) -> Self {
        let init = Arc::new(init);
        let now = Instant::now();
        let pair = SnapshotPair {
            prev: init.clone(),
            prev_timestamp: now,
            curr: init,
            curr_timestamp: now,
            gen: 0,
        };
        Self {
            pair: ArcSwap::from(Arc::new(pair)),
        }
    }

    /// Producer: publish a new current; previous becomes the old current.
    /// Single producer only.
    pub fn publish(&self, snap: FrameSnapshot) {
        let old = self.pair.load();
        let next = SnapshotPair {
            prev: old.curr.clone(),
            prev_timestamp: old.curr_timestamp,
            curr: Arc::new(snap),
            curr_timestamp: Instant::now(),
            gen: old.gen + 1,
        };
        self.pair.store(Arc::new(next));
    }

    /// Consumer: a single atomic load returns a coherent (prev, curr) pair.
    pub fn load(&self) -> SnapshotGuard {
        self.pair.load()
    }

    pub fn latest(&self) -> Arc<FrameSnapshot> {
        self.pair.load().curr.clone()
    }
}
