use thiserror::Error;

/// Fleet-level error taxonomy, mapped 1:1 onto spec.md §7.
#[derive(Error, Debug)]
pub enum FleetError {
    #[error("camera {0} not running")]
    NotRunning(String),

    #[error("camera {0} not found")]
    NotFound(String),

    #[error("timed out waiting for a frame from camera {0}")]
    Timeout(String),

    #[error("failed to open camera {id}: {reason}")]
    OpenFailed { id: String, reason: String },

    #[error("camera {0} is already recording")]
    AlreadyRecording(String),

    #[error("camera {0} is not recording")]
    NotRecording(String),

    #[error("repository unavailable: {0}")]
    RepoUnavailable(String),

    #[error("config invalid: {0}")]
    ConfigInvalid(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FleetError>;
