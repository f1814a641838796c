//! Error handling module for VidShrink

use thiserror::Error;

/// Main error type for VidShrink operations
#[derive(Error, Debug)]
pub enum ShrinkError {
    /// Source is missing, corrupt, or carries no video track
    #[error("Source unreadable: {path}: {reason}")]
    SourceUnreadable { path: String, reason: String },

    /// Scale request cannot be turned into a valid output size
    #[error("Invalid geometry: {message}")]
    InvalidGeometry { message: String },

    /// Non-positive source or target frame rate
    #[error("Invalid frame rate: {message}")]
    InvalidFrameRate { message: String },

    /// Encoder or muxer rejected a sample or failed to finalize
    #[error("Encoder failure: {message}")]
    EncoderFailure { message: String },

    /// A job is already running on this compressor
    #[error("A compression job is already in progress")]
    JobInProgress,

    /// The job was cancelled before finalization
    #[error("Compression cancelled")]
    Cancelled,

    /// Output path exists and overwriting is disabled
    #[error("Output file already exists: {path}")]
    OutputExists { path: String },

    /// Configuration loading or validation error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// FFmpeg initialization error
    #[error("Failed to initialize FFmpeg: {message}")]
    FFmpegInit { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShrinkError {
    pub fn source_unreadable(path: impl Into<String>, reason: impl ToString) -> Self {
        ShrinkError::SourceUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn geometry(message: impl Into<String>) -> Self {
        ShrinkError::InvalidGeometry {
            message: message.into(),
        }
    }

    pub fn frame_rate(message: impl Into<String>) -> Self {
        ShrinkError::InvalidFrameRate {
            message: message.into(),
        }
    }

    pub fn encoder(message: impl Into<String>) -> Self {
        ShrinkError::EncoderFailure {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ShrinkError::Config {
            message: message.into(),
        }
    }

    /// Stable short name, used in structured output
    pub fn kind(&self) -> &'static str {
        match self {
            ShrinkError::SourceUnreadable { .. } => "source_unreadable",
            ShrinkError::InvalidGeometry { .. } => "invalid_geometry",
            ShrinkError::InvalidFrameRate { .. } => "invalid_frame_rate",
            ShrinkError::EncoderFailure { .. } => "encoder_failure",
            ShrinkError::JobInProgress => "job_in_progress",
            ShrinkError::Cancelled => "cancelled",
            ShrinkError::OutputExists { .. } => "output_exists",
            ShrinkError::Config { .. } => "config",
            ShrinkError::FFmpegInit { .. } => "ffmpeg_init",
            ShrinkError::Io(_) => "io",
        }
    }
}

/// Result type alias for VidShrink operations
pub type ShrinkResult<T> = std::result::Result<T, ShrinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_stable() {
        assert_eq!(ShrinkError::Cancelled.kind(), "cancelled");
        assert_eq!(ShrinkError::JobInProgress.kind(), "job_in_progress");
        assert_eq!(ShrinkError::encoder("boom").kind(), "encoder_failure");
    }

    #[test]
    fn test_error_display() {
        let err = ShrinkError::source_unreadable("a.mp4", "no video track");
        assert_eq!(err.to_string(), "Source unreadable: a.mp4: no video track");
    }
}
