use thiserror::Error;

/// Failures raised by the camera pipeline and the host boundary.
#[derive(Debug, Error)]
pub enum CameraError {
    /// No document/model is active; nothing may be computed against stale geometry.
    #[error("no active design")]
    NoActiveModel,

    #[error("degenerate camera geometry: {0}")]
    DegenerateGeometry(&'static str),

    /// Transient failure reported by the host camera read/write path.
    #[error("host camera operation failed: {0}")]
    Host(String),

    /// Rejected user request; the message is shown to the user verbatim.
    #[error("{0}")]
    InvalidInput(String),

    #[error("a camera apply is already in progress")]
    ApplyInProgress,

    #[error("preferences error: {0}")]
    Prefs(#[from] confy::ConfyError),

    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

impl CameraError {
    pub fn host(msg: impl ToString) -> Self {
        CameraError::Host(msg.to_string())
    }

    pub fn invalid(msg: impl ToString) -> Self {
        CameraError::InvalidInput(msg.to_string())
    }

    /// Errors caused directly by an explicit user action carry a message for the UI.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, CameraError::InvalidInput(_))
    }
}

pub type CameraResult<T> = Result<T, CameraError>;
