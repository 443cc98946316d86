//! RTSP capture: one live decoder per camera, offloaded to a blocking
//! worker so the async scheduler never blocks on OpenCV's synchronous
//! FFmpeg calls.

pub mod capture;
pub mod error;
pub mod frame;
pub mod source;

pub use capture::{Capture, CaptureOptions};
pub use error::{CaptureError, CaptureResult};
pub use frame::Frame;
pub use source::{CaptureOpener, FrameSource, OpenCvOpener};
