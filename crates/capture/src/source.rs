//! The trait boundary `fleet`'s reader task depends on, so its tests can
//! exercise the reconnect state machine and frame pipeline against a
//! synthetic capture double instead of a real RTSP server — the same
//! practice `smartscope-core` uses to test `ImagePipeline`/`AppState`
//! without real hardware.

use crate::capture::{Capture, CaptureOptions};
use crate::error::CaptureResult;
use crate::frame::Frame;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One live decoding context. `Capture` is the only production
/// implementation; tests substitute a synthetic frame generator.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn read(&self) -> CaptureResult<Frame>;
    async fn close(&self);
    fn url(&self) -> &str;
}

/// Opens a `FrameSource` for a camera URL. Exists so the reader task
/// doesn't depend on `opencv::videoio::VideoCapture` directly.
#[async_trait]
pub trait CaptureOpener: Send + Sync {
    async fn open(&self, url: &str, connect_timeout: Duration) -> CaptureResult<Arc<dyn FrameSource>>;
}

/// The production opener: opens a real RTSP stream via OpenCV.
pub struct OpenCvOpener;

#[async_trait]
impl CaptureOpener for OpenCvOpener {
    async fn open(&self, url: &str, connect_timeout: Duration) -> CaptureResult<Arc<dyn FrameSource>> {
        let options = CaptureOptions {
            connect_timeout,
            ..CaptureOptions::default()
        };
        let capture = Capture::open(url, &options).await?;
        Ok(Arc::new(capture))
    }
}
