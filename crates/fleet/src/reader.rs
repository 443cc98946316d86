//! The per-camera reader task and its reconnect state machine
//! (spec.md §4.3, §4.8).
//!
//! Grounded on `original_source/surveillance/camera_manager.py`'s
//! `_start_camera_reader`/`_try_reconnect` for the state transitions
//! (`Connected -> DegradedRead -> Reconnecting -> Connected|Failed`) and on
//! `other_examples/onurtuna-OasisNvr__src-ingestion.rs.rs`'s `CameraWorker`
//! task shape (`tokio::spawn`, `tracing` fields, a plain `loop` driven by a
//! stop flag rather than a `CancellationToken`).

use crate::config::FleetConfig;
use crate::entry::CameraEntry;
use capture::CaptureOpener;
use frame_queue::FrameQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Spawns the reader loop for one camera generation. `stop`/`queue` are
/// owned by this reader for its whole lifetime; only `entry.capture` is
/// shared and swapped in place by `reconnect` (and, on `Reinitialize`, by
/// `CameraEntry::restart`, which replaces the reader generation wholesale).
pub fn spawn_reader(
    entry: Arc<CameraEntry>,
    opener: Arc<dyn CaptureOpener>,
    queue: Arc<FrameQueue>,
    stop: Arc<AtomicBool>,
    config: FleetConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(camera_id = %entry.id, "reader started");
        let frame_period = config.frame_period();

        while !stop.load(Ordering::SeqCst) {
            let capture = { Arc::clone(&*entry.capture.read().await) };
            match capture.read().await {
                Ok(frame) => {
                    queue.put(frame).await;
                    tokio::time::sleep(frame_period).await;
                }
                Err(e) => {
                    warn!(camera_id = %entry.id, error = %e, "empty frame, entering reconnect");
                    if !reconnect(&entry, &opener, &config, &stop).await {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        info!(camera_id = %entry.id, "reader exiting");
    })
}

/// `DegradedRead -> Reconnecting`: up to `reconnect_attempts` fresh `Open`
/// calls spaced `reconnect_delay` apart. On success, swaps the Capture in
/// place (keeping the FrameQueue and MotionState) and returns to
/// `Connected`. On exhaustion, the caller backs off and the reader retries
/// from the top — the entry stays registered throughout, so callers get
/// `Timeout` rather than `NotRunning` (spec.md §4.8).
async fn reconnect(
    entry: &Arc<CameraEntry>,
    opener: &Arc<dyn CaptureOpener>,
    config: &FleetConfig,
    stop: &Arc<AtomicBool>,
) -> bool {
    let url = { entry.capture.read().await.url().to_string() };

    for attempt in 1..=config.reconnect_attempts {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        info!(camera_id = %entry.id, attempt, "reconnect attempt");
        match opener.open(&url, config.connect_timeout()).await {
            Ok(new_source) => {
                let old = {
                    let mut guard = entry.capture.write().await;
                    std::mem::replace(&mut *guard, new_source)
                };
                old.close().await;
                info!(camera_id = %entry.id, "reconnected");
                return true;
            }
            Err(e) => {
                warn!(camera_id = %entry.id, error = %e, attempt, "reconnect attempt failed");
                tokio::time::sleep(config.reconnect_delay()).await;
            }
        }
    }

    warn!(camera_id = %entry.id, "reconnect attempts exhausted, backing off");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::CameraEntry;
    use crate::test_support::{camera_fixture, FakeOpener};

    #[tokio::test]
    async fn reconnect_retries_until_the_opener_succeeds() {
        let open_opener: Arc<dyn CaptureOpener> = Arc::new(FakeOpener::new(4, 4));
        let cfg = camera_fixture("cam1", "rtsp://cam1");
        let config = FleetConfig {
            reconnect_attempts: 5,
            reconnect_delay_secs: 0,
            ..FleetConfig::default()
        };

        let entry = CameraEntry::open(cfg, Arc::clone(&open_opener), &config)
            .await
            .unwrap();

        let reconnect_opener: Arc<dyn CaptureOpener> = Arc::new(FakeOpener::failing_opens(4, 4, 2));
        let stop = Arc::new(AtomicBool::new(false));

        let reconnected = reconnect(&entry, &reconnect_opener, &config, &stop).await;
        assert!(reconnected);

        entry.stop().await;
    }

    #[tokio::test]
    async fn reconnect_gives_up_after_exhausting_attempts() {
        let open_opener: Arc<dyn CaptureOpener> = Arc::new(FakeOpener::new(4, 4));
        let cfg = camera_fixture("cam1", "rtsp://cam1");
        let config = FleetConfig {
            reconnect_attempts: 2,
            reconnect_delay_secs: 0,
            ..FleetConfig::default()
        };

        let entry = CameraEntry::open(cfg, Arc::clone(&open_opener), &config)
            .await
            .unwrap();

        let reconnect_opener: Arc<dyn CaptureOpener> = Arc::new(FakeOpener::failing_opens(4, 4, 100));
        let stop = Arc::new(AtomicBool::new(false));

        let reconnected = reconnect(&entry, &reconnect_opener, &config, &stop).await;
        assert!(!reconnected);

        entry.stop().await;
    }

    #[tokio::test]
    async fn reconnect_stops_early_once_the_stop_flag_is_set() {
        let open_opener: Arc<dyn CaptureOpener> = Arc::new(FakeOpener::new(4, 4));
        let cfg = camera_fixture("cam1", "rtsp://cam1");
        let config = FleetConfig {
            reconnect_attempts: 5,
            reconnect_delay_secs: 0,
            ..FleetConfig::default()
        };

        let entry = CameraEntry::open(cfg, Arc::clone(&open_opener), &config)
            .await
            .unwrap();

        let reconnect_opener: Arc<dyn CaptureOpener> = Arc::new(FakeOpener::failing_opens(4, 4, 100));
        let stop = Arc::new(AtomicBool::new(true));

        let reconnected = reconnect(&entry, &reconnect_opener, &config, &stop).await;
        assert!(!reconnected);

        entry.stop().await;
    }
}
