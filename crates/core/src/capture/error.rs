//! Error types for the capture module.

use thiserror::Error;

/// Errors raised while presenting or rasterizing a ticket view.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The view is not (or no longer) mounted.
    #[error("view {0} is not mounted")]
    NotMounted(String),

    /// Drawing or encoding the view failed.
    #[error("render failed: {0}")]
    Render(String),

    /// Writing the image failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for CaptureError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => CaptureError::Io(e),
            other => CaptureError::Render(other.to_string()),
        }
    }
}
