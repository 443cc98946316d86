use thiserror::Error;

#[derive(Error, Debug)]
pub enum MotionError {
    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),
}

pub type Result<T> = std::result::Result<T, MotionError>;
