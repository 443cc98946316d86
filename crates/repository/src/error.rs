use thiserror::Error;

/// Errors surfaced by the repository adapter.
///
/// `ConfigInvalid` maps to spec.md's category of the same name: a malformed
/// payload must fail the whole read without any partial mutation.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    #[error("camera config invalid: {0}")]
    ConfigInvalid(String),

    #[error("camera not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
