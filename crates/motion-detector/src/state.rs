use opencv::core::Ptr;
use opencv::video::BackgroundSubtractorMOG2;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Tunables named in spec.md §6, gathered into one struct instead of the
/// scattered module-level constants the Python original uses.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub min_contour_area: f64,
    pub max_tracker_distance: f64,
    pub tracker_staleness: Duration,
    pub screenshot_debounce: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_contour_area: 1500.0,
            max_tracker_distance: 70.0,
            tracker_staleness: Duration::from_secs(2),
            screenshot_debounce: Duration::from_secs(2),
        }
    }
}

/// A tracked object's last known centroid and last-seen time. Evicted once
/// `last_seen` is older than `DetectorConfig::tracker_staleness`.
#[derive(Debug, Clone, Copy)]
pub struct Tracker {
    pub object_id: u64,
    pub position: (i32, i32),
    pub last_seen: Instant,
}

/// All state private to one camera's detector. Never shared across
/// cameras — the teacher's source smell of a single cross-camera
/// `background_subtractors` map (DESIGN NOTES) is exactly what this avoids.
pub struct MotionState {
    pub(crate) subtractor: Ptr<BackgroundSubtractorMOG2>,
    pub trackers: HashMap<u64, Tracker>,
    pub next_object_id: u64,
    pub session_count: u32,
    pub session_start: Instant,
    pub last_screenshot: Option<Instant>,
}

// SAFETY: a `MotionState` is only ever reached through the owning
// `CameraEntry`'s `tokio::sync::Mutex`, which serializes access to it one
// task at a time — the same confinement argument `capture::Inner` relies
// on for its own OpenCV handle.
unsafe impl Send for MotionState {}
unsafe impl Sync for MotionState {}

impl MotionState {
    pub fn new() -> opencv::Result<Self> {
        Ok(Self {
            subtractor: opencv::video::create_background_subtractor_mog2(500, 16.0, true)?,
            trackers: HashMap::new(),
            next_object_id: 0,
            session_count: 0,
            session_start: Instant::now(),
            last_screenshot: None,
        })
    }

    /// Resets the session counter and start time. Object trackers survive a
    /// reset; only the reported count resets (spec.md invariant 5).
    pub fn reset_session(&mut self) {
        self.session_count = 0;
        self.session_start = Instant::now();
    }

    pub fn evict_stale_trackers(&mut self, staleness: Duration, now: Instant) {
        self.trackers
            .retain(|_, t| now.duration_since(t.last_seen) < staleness);
    }
}
