//! `CameraFleet`: the top-level supervisor (spec.md §4.7).
//!
//! Owns the `cameraID -> CameraEntry` map and exposes the public API:
//! `initialize`, `reload`, `reinitialize`, `get_frame`, `snapshot`,
//! `start_continuous_recording`, `stop_continuous_recording`, `save_zone`,
//! `cleanup`. Grounded on
//! `original_source/surveillance/camera_manager.py`'s `CameraManager` for
//! the operation shapes, rebuilt per DESIGN.md to serialize map mutations
//! behind one `tokio::sync::RwLock` (the teacher's source smell of a bare
//! module-level `camera_manager` global is replaced by a long-lived
//! `CameraFleet` instance constructed once at startup, per SPEC_FULL.md
//! DESIGN NOTES).

use crate::config::FleetConfig;
use crate::entry::{CameraEntry, RecordingKind};
use crate::error::{FleetError, Result};
use crate::paths;
use capture::{CaptureOpener, Frame};
use event_dispatcher::EventDispatcher;
use motion_detector::DetectorConfig;
use repository::{CameraConfig, Event, Repository, Zone, ZoneBounds};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Per-call options for `get_frame` (spec.md §4.7's table): the caller
/// snapshots whatever `CameraConfig` flags and zone it cares about once,
/// up front, rather than the fleet re-reading them mid-frame (DESIGN
/// NOTES: "feature flags loaded from the repository per request").
#[derive(Debug, Clone, Default)]
pub struct GetFrameOptions {
    pub motion_enabled: bool,
    pub save_screenshot: bool,
    pub send_chat_video: bool,
    pub zone: Option<Zone>,
    pub reset_counter: bool,
}

pub struct CameraFleet {
    repo: Arc<dyn Repository>,
    opener: Arc<dyn CaptureOpener>,
    dispatcher: Arc<EventDispatcher>,
    config: FleetConfig,
    entries: RwLock<HashMap<String, Arc<CameraEntry>>>,
}

impl CameraFleet {
    pub fn new(
        repo: Arc<dyn Repository>,
        opener: Arc<dyn CaptureOpener>,
        dispatcher: Arc<EventDispatcher>,
        config: FleetConfig,
    ) -> Self {
        Self {
            repo,
            opener,
            dispatcher,
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            min_contour_area: self.config.min_contour_area,
            max_tracker_distance: self.config.max_tracker_distance,
            tracker_staleness: self.config.tracker_staleness(),
            screenshot_debounce: self.config.screenshot_debounce(),
        }
    }

    async fn lookup(&self, id: &str) -> Result<Arc<CameraEntry>> {
        self.entries
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| FleetError::NotRunning(id.to_string()))
    }

    /// Opens every enabled camera concurrently. Partial failure is
    /// tolerated: an entry that fails to open is simply absent from the
    /// map, never a fatal `Initialize` error (spec.md §4.7).
    pub async fn initialize(&self) -> Result<()> {
        let cameras = self
            .repo
            .list_cameras()
            .await
            .map_err(|e| FleetError::RepoUnavailable(e.to_string()))?;

        let mut set = JoinSet::new();
        for cfg in cameras {
            let opener = Arc::clone(&self.opener);
            let config = self.config.clone();
            set.spawn(async move { CameraEntry::open(cfg, opener, &config).await });
        }

        let mut entries = self.entries.write().await;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Some(entry)) => {
                    entries.insert(entry.id.clone(), entry);
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "camera open task panicked"),
            }
        }
        info!(count = entries.len(), "fleet initialized");
        Ok(())
    }

    /// Diffs the repository against the live set: starts missing cameras,
    /// stops removed ones, leaves the intersection untouched (same
    /// `Capture` instance — spec.md S3).
    pub async fn reload(&self) -> Result<()> {
        let cameras = self
            .repo
            .list_cameras()
            .await
            .map_err(|e| FleetError::RepoUnavailable(e.to_string()))?;
        let new_ids: HashSet<String> = cameras.iter().map(|c| c.id.clone()).collect();

        let existing_ids: HashSet<String> = self.entries.read().await.keys().cloned().collect();

        let removed: Vec<String> = existing_ids.difference(&new_ids).cloned().collect();
        for id in removed {
            self.stop_and_remove(&id).await;
        }

        let missing: Vec<CameraConfig> = cameras
            .into_iter()
            .filter(|c| !existing_ids.contains(&c.id))
            .collect();

        let mut set = JoinSet::new();
        for cfg in missing {
            let opener = Arc::clone(&self.opener);
            let config = self.config.clone();
            set.spawn(async move { CameraEntry::open(cfg, opener, &config).await });
        }
        let mut entries = self.entries.write().await;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Some(entry)) => {
                    entries.insert(entry.id.clone(), entry);
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "camera open task panicked"),
            }
        }
        Ok(())
    }

    /// Removes `id` from the map (if present) and stops it outside the
    /// lock, so a slow `Capture::close` never blocks other cameras.
    async fn stop_and_remove(&self, id: &str) {
        let entry = self.entries.write().await.remove(id);
        if let Some(entry) = entry {
            entry.stop().await;
        }
    }

    /// Stops the existing entry (if any), re-reads its config, and either
    /// leaves it absent (row missing/disabled) or restarts it in place.
    /// The `Arc<CameraEntry>` is never removed from the map across a
    /// successful restart, so concurrent `get_frame` callers always see a
    /// live entry — either the pre- or the post-reinit Capture, never a
    /// gap (spec.md invariant 6).
    pub async fn reinitialize(&self, id: &str) -> Result<()> {
        let entry = self.entries.read().await.get(id).cloned();
        if let Some(entry) = &entry {
            entry.stop().await;
        }

        let cfg = self
            .repo
            .get_camera(id)
            .await
            .map_err(|e| FleetError::RepoUnavailable(e.to_string()))?;

        match cfg {
            None => {
                if entry.is_some() {
                    self.entries.write().await.remove(id);
                }
                Err(FleetError::NotFound(id.to_string()))
            }
            Some(cfg) if !cfg.enabled => {
                self.entries.write().await.remove(id);
                Ok(())
            }
            Some(cfg) => {
                if let Some(entry) = entry {
                    entry
                        .restart(cfg, Arc::clone(&self.opener), &self.config)
                        .await
                        .map_err(|reason| FleetError::OpenFailed {
                            id: id.to_string(),
                            reason,
                        })?;
                    Ok(())
                } else {
                    let new_entry = CameraEntry::open(cfg, Arc::clone(&self.opener), &self.config)
                        .await
                        .ok_or_else(|| FleetError::OpenFailed {
                            id: id.to_string(),
                            reason: "open failed".to_string(),
                        })?;
                    self.entries
                        .write()
                        .await
                        .insert(new_entry.id.clone(), new_entry);
                    Ok(())
                }
            }
        }
    }

    /// The hot path (spec.md §4.7): read a frame, optionally run motion
    /// detection, trigger a screenshot and/or event clip as side effects,
    /// return the annotated frame.
    pub async fn get_frame(&self, id: &str, opts: GetFrameOptions) -> Result<Frame> {
        let entry = self.lookup(id).await?;

        if opts.reset_counter {
            entry.motion.lock().await.reset_session();
        }

        let queue = Arc::clone(&*entry.queue.read().await);
        let frame = queue
            .get(self.config.frame_timeout())
            .await
            .ok_or_else(|| FleetError::Timeout(id.to_string()))?;

        if !opts.motion_enabled {
            return Ok(frame);
        }

        let zone_bounds = opts.zone.as_ref().map(ZoneBounds::from_zone);
        let detector_config = self.detector_config();
        let is_recording = entry.is_recording().await;

        let detect_frame = frame.clone();
        let zone_for_decide = opts.zone;
        let save_screenshot = opts.save_screenshot;
        let send_chat_video = opts.send_chat_video;
        let entry_for_blocking = Arc::clone(&entry);

        let outcome = tokio::task::spawn_blocking(move || {
            let mut motion_state = entry_for_blocking.motion.blocking_lock();
            let effects = motion_detector::decide(
                &detect_frame,
                &mut motion_state,
                zone_bounds.as_ref(),
                save_screenshot,
                send_chat_video,
                &detector_config,
            );
            drop(motion_state);
            match effects {
                Ok(effects) => {
                    let annotated = motion_detector::annotate(
                        &detect_frame,
                        &effects,
                        zone_for_decide.as_ref(),
                        is_recording,
                    )
                    .unwrap_or_else(|_| detect_frame.clone());
                    (Some(effects), annotated)
                }
                Err(_) => (None, detect_frame),
            }
        })
        .await;

        let (effects, annotated) = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(camera_id = %id, error = %e, "detection task panicked");
                return Ok(frame);
            }
        };

        let Some(effects) = effects else {
            warn!(camera_id = %id, "motion detection failed, returning raw frame");
            return Ok(annotated);
        };

        if effects.should_save_screenshot {
            self.save_screenshot(id, &frame).await;
        }

        if effects.new_object_entered_zone {
            self.maybe_start_event_clip(&entry, queue).await;
        }

        Ok(annotated)
    }

    /// A single frame grabbed directly from the Capture, bypassing the
    /// queue and the detector (spec.md §4.7, the Open Question's
    /// explicit fast no-detection path).
    pub async fn snapshot(&self, id: &str) -> Result<Frame> {
        let entry = self.lookup(id).await?;
        let capture = Arc::clone(&*entry.capture.read().await);
        capture
            .read()
            .await
            .map_err(|_| FleetError::NotRunning(id.to_string()))
    }

    /// Writes `frame` as a JPEG snapshot artifact and returns its path,
    /// without touching the motion detector or FrameQueue.
    pub async fn save_current_snapshot(&self, id: &str) -> Result<std::path::PathBuf> {
        let frame = self.snapshot(id).await?;
        let path = paths::snapshot_path(Path::new(&self.config.snapshots_dir), id);
        write_jpeg(&path, &frame).await.map_err(FleetError::Io)?;
        Ok(path)
    }

    async fn save_screenshot(&self, id: &str, frame: &Frame) {
        let path = paths::screenshot_path(Path::new(&self.config.screenshots_dir), id);
        if let Err(e) = write_jpeg(&path, frame).await {
            warn!(camera_id = %id, error = %e, "failed to write screenshot");
            return;
        }

        let subscribers = match self.repo.list_notification_subscribers().await {
            Ok(subs) => subs,
            Err(e) => {
                warn!(camera_id = %id, error = %e, "failed to list notification subscribers");
                return;
            }
        };
        let event = Event::Screenshot {
            camera_id: id.to_string(),
            path: path.to_string_lossy().to_string(),
            captured_at: chrono::Utc::now(),
        };
        self.dispatcher.submit(event, &subscribers);
    }

    /// Spawns a one-off event-triggered clip if one isn't already
    /// running, per the clip-once law (spec.md invariant 7): the
    /// check-and-set happens under the same `recorder` mutex
    /// `StartContinuousRecording` uses, so the two never race.
    async fn maybe_start_event_clip(&self, entry: &Arc<CameraEntry>, queue: Arc<frame_queue::FrameQueue>) {
        let mut recorder_slot = entry.recorder.lock().await;
        if recorder_slot.is_some() {
            return;
        }

        let id = entry.id.clone();
        let duration = self.config.event_clip_duration();
        let fps = self.config.fps;
        let root = std::path::PathBuf::from(&self.config.recordings_dir);
        let dispatcher = Arc::clone(&self.dispatcher);
        let repo = Arc::clone(&self.repo);
        let entry_for_task = Arc::clone(entry);

        let handle = tokio::spawn(async move {
            match recorder::record_short_clip(queue, root, id.clone(), duration, fps).await {
                Ok(path) => {
                    info!(camera_id = %id, path = %path.display(), "event clip written");
                    match repo.list_notification_subscribers().await {
                        Ok(subscribers) => {
                            let event = Event::Clip {
                                camera_id: id.clone(),
                                path: path.to_string_lossy().to_string(),
                                captured_at: chrono::Utc::now(),
                                duration_seconds: duration.as_secs() as u32,
                            };
                            dispatcher.submit(event, &subscribers);
                        }
                        Err(e) => warn!(camera_id = %id, error = %e, "failed to list subscribers"),
                    }
                }
                Err(e) => warn!(camera_id = %id, error = %e, "event clip recording failed"),
            }
            *entry_for_task.recorder.lock().await = None;
        });

        *recorder_slot = Some(RecordingKind::Clip(handle));
    }

    pub async fn start_continuous_recording(&self, id: &str) -> Result<()> {
        let entry = self.lookup(id).await?;
        let mut recorder_slot = entry.recorder.lock().await;
        if recorder_slot.is_some() {
            return Err(FleetError::AlreadyRecording(id.to_string()));
        }

        let queue = Arc::clone(&*entry.queue.read().await);
        let root = std::path::PathBuf::from(&self.config.recordings_dir);
        let handle = recorder::start_continuous_recording(queue, root, id.to_string(), self.config.fps);
        *recorder_slot = Some(RecordingKind::Continuous(handle));
        Ok(())
    }

    pub async fn stop_continuous_recording(&self, id: &str) -> Result<()> {
        let entry = self.lookup(id).await?;
        let mut recorder_slot = entry.recorder.lock().await;
        match recorder_slot.take() {
            Some(RecordingKind::Continuous(handle)) => {
                drop(recorder_slot);
                handle.stop().await;
                Ok(())
            }
            Some(other @ RecordingKind::Clip(_)) => {
                *recorder_slot = Some(other);
                Err(FleetError::NotRecording(id.to_string()))
            }
            None => Err(FleetError::NotRecording(id.to_string())),
        }
    }

    /// Persists the alarm rectangle. Thin pass-through to the repository;
    /// the fleet holds no zone state of its own (callers re-supply the
    /// zone on every `get_frame`).
    pub async fn save_zone(&self, id: &str, zone: Zone) -> Result<()> {
        self.repo.update_zone(id, zone).await.map_err(|e| match e {
            repository::RepositoryError::NotFound(id) => FleetError::NotFound(id),
            other => FleetError::RepoUnavailable(other.to_string()),
        })
    }

    /// Stops every reader, releases every Capture and empties the map.
    /// Idempotent: a second call finds an empty map and returns at once
    /// (spec.md S6).
    pub async fn cleanup(&self) {
        let drained: Vec<Arc<CameraEntry>> = self.entries.write().await.drain().map(|(_, v)| v).collect();
        for entry in drained {
            entry.stop().await;
        }
        info!("fleet cleanup complete");
    }
}

async fn write_jpeg(path: &Path, frame: &Frame) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = motion_detector::encode_jpeg(frame)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    tokio::fs::write(path, bytes).await
}
