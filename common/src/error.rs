use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("source fetch failed: {0}")]
    SourceFetch(String),

    #[error("recording contains no frames")]
    EmptyRecording,

    #[error("corrupt recording: {0}")]
    CorruptRecording(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("failed to persist recording: {0}")]
    PersistFailure(String),

    #[error("recording not found: {0}")]
    RecordingNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReplayError {
    /// Stable machine-readable kind, carried in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ReplayError::SourceFetch(_) => "source_fetch",
            ReplayError::EmptyRecording => "empty_recording",
            ReplayError::CorruptRecording(_) => "corrupt_recording",
            ReplayError::InvalidParameter(_) => "invalid_parameter",
            ReplayError::PersistFailure(_) => "persist_failure",
            ReplayError::RecordingNotFound(_) => "recording_not_found",
            ReplayError::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, ReplayError>;
