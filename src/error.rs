//! Stagelink Error Types
//!
//! Centralized error handling for the bridge and the transcription adapter.

use thiserror::Error;

/// Central error type for stagelink
#[derive(Error, Debug)]
pub enum StageError {
    #[error("ASR engine error: {0}")]
    Asr(String),

    #[error("audio capture error: {0}")]
    Audio(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// No descriptor with this name exists in the model dictionary.
    /// Unrecoverable: a missing model makes the rest of the session
    /// meaningless, so the composition root terminates on it.
    #[error("no model named '{0}' in the model dictionary")]
    ModelNotFound(String),

    #[error("unknown expression key: '{0}'")]
    ExpressionNotFound(String),

    #[error("front-end connection error: {0}")]
    FrontEnd(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StageError {
    /// True for error kinds the composition root should treat as fatal
    /// rather than report and continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StageError::ModelNotFound(_))
    }
}

/// Result type alias for stagelink operations
pub type StageResult<T> = Result<T, StageError>;
