use thiserror::Error;

pub type Result<T, E = PixmatrixError> = std::result::Result<T, E>;

/// Unified error type covering common failure scenarios across subsystems.
#[derive(Debug, Error)]
pub enum PixmatrixError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("frame error: {0}")]
    Frame(String),
    #[error("surface error: {0}")]
    Surface(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("session error: {0}")]
    Session(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
