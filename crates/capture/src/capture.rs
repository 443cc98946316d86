//! One live RTSP decoding context per physical camera.
//!
//! Grounded on `original_source/surveillance/camera_manager.py`'s
//! `_create_capture`/`_safe_create_capture_with_timeout` (open on a worker,
//! bounded by a timeout, `cv2.VideoCapture(url, cv2.CAP_FFMPEG)`) and on
//! `crates/camera-correction`'s `opencv` call shapes for the crate's `Mat`
//! idiom. `Open`/`Read` here run on `tokio::task::spawn_blocking` so the
//! async scheduler never blocks on OpenCV's synchronous C++ calls.

use crate::error::{CaptureError, CaptureResult};
use crate::frame::Frame;
use log::{info, warn};
use opencv::core::{Mat, MatTraitConst};
use opencv::videoio::{self, VideoCaptureTrait, VideoCaptureTraitConst};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// RTSP transport tuning, the Rust-side equivalent of the original's
/// `OPENCV_FFMPEG_CAPTURE_OPTIONS` environment convention (spec.md §6).
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub buffer_size_bytes: u32,
    pub transport_tcp: bool,
    pub discard_corrupt_frames: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            buffer_size_bytes: 4 * 1024 * 1024,
            transport_tcp: true,
            discard_corrupt_frames: true,
        }
    }
}

/// A wrapper holding the raw `opencv::videoio::VideoCapture` so blocking
/// calls can be moved onto a worker thread without holding an async lock
/// across the C++ call.
struct Inner(videoio::VideoCapture);

// SAFETY: VideoCapture's underlying FFmpeg context is only ever touched
// from the single blocking task holding the `Mutex` guard at a time; the
// mutex serializes all access, matching the Python original's single
// `ThreadPoolExecutor` confinement of each camera's capture handle.
unsafe impl Send for Inner {}

/// One live decoder for one physical camera. At most one `Capture` exists
/// per camera id at any time (spec.md's single-capture invariant).
pub struct Capture {
    inner: Arc<Mutex<Inner>>,
    url: String,
}

impl Capture {
    /// Opens an RTSP source. Fails with `ConnectFailed` on decoder refusal,
    /// `ConnectTimeout` if `options.connect_timeout` elapses first.
    pub async fn open(url: &str, options: &CaptureOptions) -> CaptureResult<Self> {
        let url_owned = url.to_string();
        let opts = options.clone();
        if opts.discard_corrupt_frames {
            // The opencv crate exposes no per-capture knob for this; FFmpeg's
            // backend only honors it through this process-wide env var, read
            // once when `VideoCapture::from_file` opens the stream.
            std::env::set_var("OPENCV_FFMPEG_CAPTURE_OPTIONS", "discard_corrupt;1");
        }
        let open_fut = tokio::task::spawn_blocking(move || -> CaptureResult<videoio::VideoCapture> {
            let mut cap = videoio::VideoCapture::from_file(&url_owned, videoio::CAP_FFMPEG)
                .map_err(|e| CaptureError::ConnectFailed {
                    url: url_owned.clone(),
                    reason: e.to_string(),
                })?;

            if opts.transport_tcp {
                let _ = cap.set(videoio::CAP_PROP_OPEN_TIMEOUT_MSEC, opts.connect_timeout.as_millis() as f64);
                let _ = cap.set(videoio::CAP_PROP_READ_TIMEOUT_MSEC, opts.read_timeout.as_millis() as f64);
                let _ = cap.set(videoio::CAP_PROP_BUFFERSIZE, opts.buffer_size_bytes as f64);
            }

            let opened = cap.is_opened().map_err(CaptureError::OpenCv)?;
            if !opened {
                return Err(CaptureError::ConnectFailed {
                    url: url_owned,
                    reason: "capture did not open".to_string(),
                });
            }
            Ok(cap)
        });

        let cap = match tokio::time::timeout(options.connect_timeout, open_fut).await {
            Ok(joined) => match joined {
                Ok(Ok(cap)) => cap,
                Ok(Err(e)) => {
                    warn!("{url}: connect failed: {e}");
                    return Err(e);
                }
                Err(e) => return Err(e.into()),
            },
            Err(_) => {
                warn!("{url}: connect timed out after {:?}", options.connect_timeout);
                return Err(CaptureError::ConnectTimeout {
                    url: url.to_string(),
                    timeout: options.connect_timeout,
                });
            }
        };

        info!("{url}: capture opened");
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner(cap))),
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Reads the next frame, offloaded to a blocking worker. An empty read
    /// (zero rows, i.e. `cap.read()` returning `false` or a zero-length
    /// `Mat`) surfaces as `StreamBroken` rather than a fabricated frame.
    pub async fn read(&self) -> CaptureResult<Frame> {
        let inner = Arc::clone(&self.inner);
        let url = self.url.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut guard = inner.blocking_lock();
            let mut mat = Mat::default();
            let ok = guard.0.read(&mut mat).map_err(CaptureError::OpenCv)?;
            if !ok || mat.rows() == 0 || mat.cols() == 0 {
                return Err(CaptureError::StreamBroken("empty frame".to_string()));
            }

            let width = mat.cols() as u32;
            let height = mat.rows() as u32;
            let len = (width as usize) * (height as usize) * 3;
            let data_ptr = mat.data();
            let data = unsafe { std::slice::from_raw_parts(data_ptr, len) }.to_vec();

            Ok(Frame::new(width, height, data))
        })
        .await?;
        if let Err(ref e) = result {
            warn!("{url}: stream broken: {e}");
        }
        result
    }

    /// Releases the underlying `VideoCapture`. Safe to call more than once.
    pub async fn close(&self) {
        info!("{}: closing capture", self.url);
        let inner = Arc::clone(&self.inner);
        let _ = tokio::task::spawn_blocking(move || {
            let mut guard = inner.blocking_lock();
            let _ = guard.0.release();
        })
        .await;
    }
}

#[async_trait::async_trait]
impl crate::source::FrameSource for Capture {
    async fn read(&self) -> CaptureResult<Frame> {
        Capture::read(self).await
    }

    async fn close(&self) {
        Capture::close(self).await
    }

    fn url(&self) -> &str {
        Capture::url(self)
    }
}
