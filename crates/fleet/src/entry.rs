//! `CameraEntry`: the per-camera runtime aggregate (spec.md §3/§4.6).
//!
//! Exclusively owns a `Capture`, a `FrameQueue`, `MotionState` and whatever
//! `Recorder` is currently active for one camera id. Fields are guarded
//! individually rather than behind one lock, following the fleet's shared
//! state policy (spec.md §5): "each `CameraEntry` owns its Capture,
//! FrameQueue and MotionState; only the entry's Reader and the caller of
//! `GetFrame`/`Snapshot` for that camera may touch them."

use crate::config::FleetConfig;
use crate::reader;
use capture::{CaptureOpener, FrameSource};
use frame_queue::FrameQueue;
use motion_detector::MotionState;
use recorder::RecorderHandle;
use repository::CameraConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::info;

/// Whichever kind of recorder is presently active for a camera. Only one
/// may exist at a time (spec.md §4.5's concurrency rule) regardless of
/// which path started it.
pub enum RecordingKind {
    /// A `StartContinuousRecording` loop, stoppable on command.
    Continuous(RecorderHandle),
    /// A single event-triggered clip (§4.7 step 4); finishes on its own.
    Clip(JoinHandle<()>),
}

pub struct CameraEntry {
    pub id: String,
    pub config: RwLock<CameraConfig>,
    pub capture: RwLock<Arc<dyn FrameSource>>,
    pub queue: RwLock<Arc<FrameQueue>>,
    pub motion: Mutex<MotionState>,
    pub recorder: Mutex<Option<RecordingKind>>,
    stop: RwLock<Arc<AtomicBool>>,
    reader_handle: Mutex<Option<JoinHandle<()>>>,
}

impl CameraEntry {
    /// Opens a fresh `Capture`, builds a fresh `MotionState`/`FrameQueue`
    /// and starts the reader task. Returns `None` (logged) on open
    /// failure — the caller simply leaves the camera absent from the
    /// fleet map (spec.md §7 `OpenFailed`).
    pub async fn open(
        cfg: CameraConfig,
        opener: Arc<dyn CaptureOpener>,
        config: &FleetConfig,
    ) -> Option<Arc<CameraEntry>> {
        let id = cfg.id.clone();
        let source = match opener.open(&cfg.url, config.connect_timeout()).await {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(camera_id = %id, error = %e, "failed to open camera");
                return None;
            }
        };
        let motion = match MotionState::new() {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(camera_id = %id, error = %e, "failed to initialize motion detector");
                source.close().await;
                return None;
            }
        };

        let queue = Arc::new(FrameQueue::new(config.max_queue_size));
        let stop = Arc::new(AtomicBool::new(false));

        let entry = Arc::new(CameraEntry {
            id: id.clone(),
            config: RwLock::new(cfg),
            capture: RwLock::new(source),
            queue: RwLock::new(Arc::clone(&queue)),
            motion: Mutex::new(motion),
            recorder: Mutex::new(None),
            stop: RwLock::new(Arc::clone(&stop)),
            reader_handle: Mutex::new(None),
        });

        let handle = reader::spawn_reader(Arc::clone(&entry), opener, queue, stop, config.clone());
        *entry.reader_handle.lock().await = Some(handle);
        info!(camera_id = %id, "camera entry opened");
        Some(entry)
    }

    /// Stops the reader and releases the Capture in place, without
    /// removing the entry from any map. Used both by a full teardown
    /// (`Reload`/`Cleanup` remove the entry from the map first, then call
    /// this) and by `Reinitialize`, which keeps the same `Arc<CameraEntry>`
    /// alive in the map across the swap (spec.md invariant 6).
    pub async fn stop(&self) {
        if let Some(kind) = self.recorder.lock().await.take() {
            match kind {
                RecordingKind::Continuous(handle) => handle.stop().await,
                RecordingKind::Clip(handle) => {
                    let _ = handle.await;
                }
            }
        }

        let stop_flag = { Arc::clone(&*self.stop.read().await) };
        stop_flag.store(true, Ordering::SeqCst);

        let handle = self.reader_handle.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        let capture = Arc::clone(&*self.capture.read().await);
        capture.close().await;
        info!(camera_id = %self.id, "camera entry stopped");
    }

    /// Re-reads `cfg`, opens a fresh Capture/MotionState/FrameQueue and
    /// starts a new reader task, replacing this entry's internals in
    /// place. Callers holding the `Arc<CameraEntry>` from before the
    /// restart keep observing a live entry throughout — never an interval
    /// where the id is simply missing (spec.md invariant 6). Call `stop`
    /// first if the entry was previously running.
    pub async fn restart(
        self: &Arc<Self>,
        cfg: CameraConfig,
        opener: Arc<dyn CaptureOpener>,
        config: &FleetConfig,
    ) -> Result<(), String> {
        let source = opener
            .open(&cfg.url, config.connect_timeout())
            .await
            .map_err(|e| e.to_string())?;
        let motion = MotionState::new().map_err(|e| e.to_string())?;
        let queue = Arc::new(FrameQueue::new(config.max_queue_size));
        let stop = Arc::new(AtomicBool::new(false));

        *self.capture.write().await = source;
        *self.queue.write().await = Arc::clone(&queue);
        *self.motion.lock().await = motion;
        *self.config.write().await = cfg;
        *self.stop.write().await = Arc::clone(&stop);

        let handle = reader::spawn_reader(Arc::clone(self), opener, queue, stop, config.clone());
        *self.reader_handle.lock().await = Some(handle);
        info!(camera_id = %self.id, "camera entry restarted");
        Ok(())
    }

    pub async fn is_recording(&self) -> bool {
        self.recorder.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{camera_fixture, FakeOpener};

    #[tokio::test]
    async fn open_starts_a_reader_that_feeds_frames_into_the_queue() {
        let opener = Arc::new(FakeOpener::new(4, 4));
        let cfg = camera_fixture("cam1", "rtsp://cam1");
        let config = FleetConfig {
            frame_timeout_secs: 1,
            ..FleetConfig::default()
        };

        let entry = CameraEntry::open(cfg, opener, &config).await.unwrap();
        let queue = Arc::clone(&*entry.queue.read().await);
        let frame = queue.get(config.frame_timeout()).await;
        assert!(frame.is_some());

        entry.stop().await;
    }

    #[tokio::test]
    async fn open_returns_none_when_the_opener_fails() {
        let opener = Arc::new(FakeOpener::failing_opens(4, 4, 1));
        let cfg = camera_fixture("cam1", "rtsp://cam1");
        let config = FleetConfig::default();

        let entry = CameraEntry::open(cfg, opener, &config).await;
        assert!(entry.is_none());
    }

    #[tokio::test]
    async fn stop_closes_the_capture_and_joins_the_reader() {
        let opener = Arc::new(FakeOpener::new(4, 4));
        let cfg = camera_fixture("cam1", "rtsp://cam1");
        let config = FleetConfig::default();

        let entry = CameraEntry::open(cfg, opener, &config).await.unwrap();
        entry.stop().await;

        assert!(!entry.is_recording().await);
    }

    #[tokio::test]
    async fn restart_replaces_internals_without_removing_the_entry() {
        let opener = Arc::new(FakeOpener::new(4, 4));
        let cfg = camera_fixture("cam1", "rtsp://cam1");
        let config = FleetConfig {
            frame_timeout_secs: 1,
            ..FleetConfig::default()
        };

        let entry = CameraEntry::open(cfg.clone(), Arc::clone(&opener), &config)
            .await
            .unwrap();
        entry.stop().await;

        let new_cfg = camera_fixture("cam1", "rtsp://cam1-new");
        entry
            .restart(new_cfg, Arc::clone(&opener), &config)
            .await
            .unwrap();

        let queue = Arc::clone(&*entry.queue.read().await);
        let frame = queue.get(config.frame_timeout()).await;
        assert!(frame.is_some());
        assert_eq!(entry.config.read().await.url, "rtsp://cam1-new");

        entry.stop().await;
    }
}
