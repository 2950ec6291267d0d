use thiserror::Error;

/// Failure taxonomy for device control operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("connection timeout")]
    Timeout,
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{0}")]
    Validation(String),
    #[error("projector {0} not found")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
