//! Capture error taxonomy, mapped 1:1 onto spec.md §7.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("connect failed for {url}: {reason}")]
    ConnectFailed { url: String, reason: String },

    #[error("connect to {url} timed out after {timeout:?}")]
    ConnectTimeout { url: String, timeout: std::time::Duration },

    #[error("stream broken: {0}")]
    StreamBroken(String),

    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("blocking worker panicked: {0}")]
    WorkerPanicked(#[from] tokio::task::JoinError),
}

pub type CaptureResult<T> = Result<T, CaptureError>;

