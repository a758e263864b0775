//! Common types and utilities for live-image pairing
use thiserror::Error;

pub mod cancel;
pub mod model;
pub mod timebase;

pub use cancel::CancelToken;
pub use model::{
    Asset, AssetResource, CoverMark, FrameRequest, FrameResult, FrameSequence, FrameSource,
    LiveContainer, MediaKind, PairToken, PairedResource, ResourceKind, ResourceLocation,
    SubtypeFlags, Tolerance,
};

/// Pairing and synthesis errors
#[derive(Debug, Error)]
pub enum PairError {
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("No paired video for asset: {0}")]
    NoPairedVideo(String),

    #[error("No video stream found")]
    NoVideoStream,

    #[error("Empty frame sequence")]
    EmptyFrameSequence,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Frame extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Encode failed: {0}")]
    EncodeFailed(String),

    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("Save failed: {0}")]
    SaveFailed(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("FFmpeg error: {0}")]
    FFmpegError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageError(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<image::ImageError> for PairError {
    fn from(err: image::ImageError) -> Self {
        PairError::ImageError(err.to_string())
    }
}

impl PairError {
    /// Stable short code for this error. Callers branch on the code,
    /// never on the message text.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            PairError::AssetNotFound(_) => "NOT_FOUND",
            PairError::NoPairedVideo(_) | PairError::NoVideoStream => "NO_VIDEO",
            PairError::EmptyFrameSequence | PairError::InvalidArgument(_) => "INVALID_ARGS",
            PairError::ExtractionFailed(_) => "EXTRACTION_FAILED",
            PairError::EncodeFailed(_) => "ENCODE_FAILED",
            PairError::ExportFailed(_) => "EXPORT_FAILED",
            PairError::SaveFailed(_) => "SAVE_FAILED",
            PairError::Cancelled => "CANCELLED",
            PairError::Timeout(_) => "TIMEOUT",
            PairError::FFmpegError(_) => "FFMPEG_ERROR",
            PairError::IoError(_) => "IO_ERROR",
            PairError::ImageError(_) => "IMAGE_ERROR",
            PairError::Other(_) => "INTERNAL",
        }
    }
}

/// Result type for pairing operations
pub type Result<T> = std::result::Result<T, PairError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(PairError::AssetNotFound("a".into()).code(), "NOT_FOUND");
        assert_eq!(PairError::NoPairedVideo("a".into()).code(), "NO_VIDEO");
        assert_eq!(PairError::NoVideoStream.code(), "NO_VIDEO");
        assert_eq!(PairError::EmptyFrameSequence.code(), "INVALID_ARGS");
        assert_eq!(PairError::EncodeFailed("x".into()).code(), "ENCODE_FAILED");
        assert_eq!(PairError::ExportFailed("x".into()).code(), "EXPORT_FAILED");
        assert_eq!(PairError::SaveFailed("x".into()).code(), "SAVE_FAILED");
        assert_eq!(PairError::Cancelled.code(), "CANCELLED");
        assert_eq!(PairError::Timeout(5000).code(), "TIMEOUT");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PairError = io.into();
        assert_eq!(err.code(), "IO_ERROR");
    }
}
