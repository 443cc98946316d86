use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("no frame available to size the clip writer")]
    NoFrame,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),
}

pub type Result<T> = std::result::Result<T, RecorderError>;
