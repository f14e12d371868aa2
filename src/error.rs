//! Error types for the serving core

use http::StatusCode;
use thiserror::Error;

/// Result type alias for serving operations
pub type Result<T> = std::result::Result<T, ServeError>;

/// Error types that can occur while serving a request
#[derive(Error, Debug, Clone)]
pub enum ServeError {
    /// The resolved path does not name a readable file under the root,
    /// or escaped the root entirely.
    #[error("not found")]
    NotFound,

    /// A `Range` request asked for bytes past the end of the file.
    #[error("range not satisfiable for resource of {size} bytes")]
    NotSatisfiable { size: u64 },

    /// The client disconnected; the response must not be touched again.
    #[error("request aborted by client")]
    Aborted,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for ServeError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound | ErrorKind::IsADirectory => ServeError::NotFound,
            kind => ServeError::Internal(format!("{kind}: {err}")),
        }
    }
}

impl ServeError {
    /// Map the error to the HTTP status code it is reported as.
    ///
    /// Returns `None` for [`ServeError::Aborted`]: an aborted request is
    /// cleaned up silently and nothing is written to the wire.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ServeError::NotFound => Some(StatusCode::NOT_FOUND),
            ServeError::NotSatisfiable { .. } => Some(StatusCode::RANGE_NOT_SATISFIABLE),
            ServeError::Aborted => None,
            ServeError::Config(_) => Some(StatusCode::INTERNAL_SERVER_ERROR),
            ServeError::Internal(_) => Some(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}
