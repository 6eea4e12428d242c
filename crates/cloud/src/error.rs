//! Error types for the remote earth-observation client.

use thiserror::Error;

/// Errors produced while talking to the earth-observation service or
/// interpreting its results.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("authentication error: {0}")]
    Auth(String),

    #[error("network error: {0}")]
    Network(String),

    /// The process-wide session never reached the ready state.
    #[error("session unavailable: {0}")]
    SessionUnavailable(String),

    /// The service accepted the request but reported an evaluation failure.
    #[error("remote evaluation failed: {0}")]
    Remote(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A scene had no valid pixels inside the region.
    #[error("undefined aggregate for scene {scene_id}")]
    UndefinedAggregate { scene_id: String },

    #[error("invalid scene fixture: {0}")]
    Fixture(String),

    #[error("core error: {0}")]
    Core(#[from] fieldcheck_core::Error),
}

impl CloudError {
    /// Whether the error stems from malformed client input.
    ///
    /// Everything else is a remote evaluation failure and maps to a server
    /// error at the boundary.
    pub fn is_client_error(&self) -> bool {
        match self {
            CloudError::Core(e) => e.is_client_error(),
            _ => false,
        }
    }
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;
