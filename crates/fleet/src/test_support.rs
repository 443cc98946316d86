//! Test doubles shared by this crate's unit tests: a synthetic
//! `FrameSource`/`CaptureOpener` pair standing in for a real RTSP stream
//! (per `capture::source`'s own doc comment, "tests substitute a synthetic
//! frame generator") and an in-memory `Repository`.

use async_trait::async_trait;
use capture::{CaptureError, CaptureOpener, CaptureResult, Frame, FrameSource};
use repository::{
    CameraConfig, Repository, RepositoryError, Result as RepoResult, SubscriberId, Zone,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Produces solid-black BGR24 frames on demand. Can be told to start
/// failing its `read()` calls after a fixed number of successes, to
/// exercise the reader's `DegradedRead` transition.
pub struct FakeSource {
    url: String,
    width: u32,
    height: u32,
    reads: AtomicU32,
    fail_after: Option<u32>,
    closed: AtomicBool,
}

impl FakeSource {
    pub fn new(url: &str, width: u32, height: u32) -> Self {
        Self {
            url: url.to_string(),
            width,
            height,
            reads: AtomicU32::new(0),
            fail_after: None,
            closed: AtomicBool::new(false),
        }
    }

    pub fn failing_after(url: &str, width: u32, height: u32, fail_after: u32) -> Self {
        Self {
            fail_after: Some(fail_after),
            ..Self::new(url, width, height)
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameSource for FakeSource {
    async fn read(&self) -> CaptureResult<Frame> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if n >= limit {
                return Err(CaptureError::StreamBroken("synthetic end of stream".into()));
            }
        }
        let data = vec![0u8; self.width as usize * self.height as usize * 3];
        Ok(Frame::new(self.width, self.height, data))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Opens `FakeSource`s. `fail_opens` counts down: that many `open` calls
/// fail with `ConnectFailed` before the opener starts succeeding, which is
/// enough to drive the reader through several reconnect attempts.
pub struct FakeOpener {
    width: u32,
    height: u32,
    fail_opens: AtomicU32,
    opens: AtomicU32,
}

impl FakeOpener {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fail_opens: AtomicU32::new(0),
            opens: AtomicU32::new(0),
        }
    }

    pub fn failing_opens(width: u32, height: u32, fail_opens: u32) -> Self {
        Self {
            fail_opens: AtomicU32::new(fail_opens),
            ..Self::new(width, height)
        }
    }

    pub fn open_count(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureOpener for FakeOpener {
    async fn open(&self, url: &str, _connect_timeout: Duration) -> CaptureResult<Arc<dyn FrameSource>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_opens.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_opens.fetch_sub(1, Ordering::SeqCst);
            return Err(CaptureError::ConnectFailed {
                url: url.to_string(),
                reason: "synthetic failure".to_string(),
            });
        }
        Ok(Arc::new(FakeSource::new(url, self.width, self.height)))
    }
}

/// Opens a `FakeSource` that goes silent after `fail_after` reads on its
/// first `open` call, then a healthy `FakeSource` on every later `open` —
/// standing in for a camera whose stream breaks once and recovers on
/// reconnect (spec.md S2).
pub struct FlakyOpener {
    width: u32,
    height: u32,
    fail_after: u32,
    opens: AtomicU32,
}

impl FlakyOpener {
    pub fn new(width: u32, height: u32, fail_after: u32) -> Self {
        Self {
            width,
            height,
            fail_after,
            opens: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl CaptureOpener for FlakyOpener {
    async fn open(&self, url: &str, _connect_timeout: Duration) -> CaptureResult<Arc<dyn FrameSource>> {
        let n = self.opens.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            Ok(Arc::new(FakeSource::failing_after(
                url,
                self.width,
                self.height,
                self.fail_after,
            )))
        } else {
            Ok(Arc::new(FakeSource::new(url, self.width, self.height)))
        }
    }
}

/// A fixed white square on a black background, drawn at `(ox, oy)` with
/// side `side` — the same synthetic-object shape `motion_detector::decide`'s
/// own unit tests draw, reused here so a real object can be driven through
/// `decide` at the fleet/integration level, not just at the crate-unit level.
fn object_frame(width: u32, height: u32, present: bool, ox: i32, oy: i32, side: i32) -> Frame {
    let mut data = vec![0u8; (width as usize) * (height as usize) * 3];
    if present {
        for row in oy..(oy + side) {
            for col in ox..(ox + side) {
                if row < 0 || col < 0 || row as u32 >= height || col as u32 >= width {
                    continue;
                }
                let idx = (row as usize * width as usize + col as usize) * 3;
                data[idx] = 255;
                data[idx + 1] = 255;
                data[idx + 2] = 255;
            }
        }
    }
    Frame::new(width, height, data)
}

/// A `FrameSource` whose frames follow a wall-clock schedule: a sequence of
/// `(phase_end, object_present)` pairs, each naming when that phase ends
/// relative to the source's creation. Once the schedule is exhausted the
/// last phase repeats forever. Standing in for a camera that shows a fixed
/// object appearing and disappearing in the frame at known times, so a test
/// can drive `CameraFleet::get_frame`'s motion-detection branch through a
/// real zone-entry/zone-exit cycle without a live RTSP source.
pub struct SequenceSource {
    url: String,
    width: u32,
    height: u32,
    start: Instant,
    schedule: Vec<(Duration, bool)>,
}

impl SequenceSource {
    fn object_present(&self) -> bool {
        let elapsed = self.start.elapsed();
        for (end, present) in &self.schedule {
            if elapsed < *end {
                return *present;
            }
        }
        self.schedule.last().map(|(_, present)| *present).unwrap_or(false)
    }
}

#[async_trait]
impl FrameSource for SequenceSource {
    async fn read(&self) -> CaptureResult<Frame> {
        Ok(object_frame(self.width, self.height, self.object_present(), 120, 120, 60))
    }

    async fn close(&self) {}

    fn url(&self) -> &str {
        &self.url
    }
}

/// Opens a fresh `SequenceSource`, timed from the moment `open` is called.
pub struct SequenceOpener {
    width: u32,
    height: u32,
    schedule: Vec<(Duration, bool)>,
}

impl SequenceOpener {
    pub fn new(width: u32, height: u32, schedule: Vec<(Duration, bool)>) -> Self {
        Self { width, height, schedule }
    }
}

#[async_trait]
impl CaptureOpener for SequenceOpener {
    async fn open(&self, url: &str, _connect_timeout: Duration) -> CaptureResult<Arc<dyn FrameSource>> {
        Ok(Arc::new(SequenceSource {
            url: url.to_string(),
            width: self.width,
            height: self.height,
            start: Instant::now(),
            schedule: self.schedule.clone(),
        }))
    }
}

/// An in-memory `Repository` backing store, so fleet tests never need a
/// real sqlite file.
pub struct FakeRepository {
    cameras: Mutex<Vec<CameraConfig>>,
    subscribers: Mutex<Vec<SubscriberId>>,
}

impl FakeRepository {
    pub fn new(cameras: Vec<CameraConfig>) -> Self {
        Self {
            cameras: Mutex::new(cameras),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn set_cameras(&self, cameras: Vec<CameraConfig>) {
        *self.cameras.lock().unwrap() = cameras;
    }

    pub fn set_subscribers(&self, subscribers: Vec<SubscriberId>) {
        *self.subscribers.lock().unwrap() = subscribers;
    }
}

#[async_trait]
impl Repository for FakeRepository {
    async fn list_cameras(&self) -> RepoResult<Vec<CameraConfig>> {
        Ok(self
            .cameras
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.enabled)
            .cloned()
            .collect())
    }

    async fn get_camera(&self, id: &str) -> RepoResult<Option<CameraConfig>> {
        Ok(self
            .cameras
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn get_zone(&self, id: &str) -> RepoResult<Option<Zone>> {
        Ok(self
            .cameras
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .and_then(|c| c.zone))
    }

    async fn update_zone(&self, id: &str, zone: Zone) -> RepoResult<()> {
        let mut cameras = self.cameras.lock().unwrap();
        match cameras.iter_mut().find(|c| c.id == id) {
            Some(c) => {
                c.zone = Some(zone);
                Ok(())
            }
            None => Err(RepositoryError::NotFound(id.to_string())),
        }
    }

    async fn list_notification_subscribers(&self) -> RepoResult<Vec<SubscriberId>> {
        Ok(self.subscribers.lock().unwrap().clone())
    }
}

pub fn camera_fixture(id: &str, url: &str) -> CameraConfig {
    CameraConfig {
        id: id.to_string(),
        url: url.to_string(),
        enabled: true,
        motion_enabled: false,
        save_screenshot: false,
        send_email: false,
        send_chat: false,
        send_chat_video: false,
        zone: None,
    }
}
