//! Error types for media acquisition.

use std::path::PathBuf;
use thiserror::Error;

use super::types::MediaOrigin;

/// Errors that can occur while picking or normalizing media.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The user has not granted access to the gallery or camera.
    #[error("permission denied for {origin}")]
    PermissionDenied { origin: MediaOrigin },

    /// The user dismissed the picker.
    #[error("media selection cancelled")]
    Cancelled,

    /// Picked file does not exist.
    #[error("media file not found: {path}")]
    NotFound { path: PathBuf },

    /// Picked file lies outside the directory selections are confined to.
    #[error("media path is outside the upload directory: {path}")]
    OutsideRoot { path: PathBuf },

    /// Picked file exceeds the configured size limit.
    #[error("media file is {size_bytes} bytes, limit is {max_bytes}")]
    TooLarge { size_bytes: u64, max_bytes: u64 },

    /// Extension not in the accepted list.
    #[error("unsupported media format: {format}")]
    UnsupportedFormat { format: String },

    /// A video was picked without a still frame to compose from.
    #[error("video selection has no thumbnail")]
    MissingThumbnail,

    /// The file could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// I/O error while reading or writing media.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Errors the user can fix by granting access or picking again.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. }
                | Self::Cancelled
                | Self::OutsideRoot { .. }
                | Self::TooLarge { .. }
                | Self::UnsupportedFormat { .. }
                | Self::MissingThumbnail
        )
    }
}

impl From<image::ImageError> for MediaError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => Self::Io(io),
            other => Self::Decode(other.to_string()),
        }
    }
}
