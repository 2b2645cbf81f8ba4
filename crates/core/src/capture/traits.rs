//! Trait definitions for the capture module.

use async_trait::async_trait;

use super::error::CaptureError;
use super::types::{PresentedView, ViewHandle};
use crate::media::ImageRef;
use crate::ticket::TicketViewDescriptor;

/// Presentation layer that mounts ticket views.
#[async_trait]
pub trait TicketPresenter: Send + Sync {
    /// Mount a view for `descriptor`.
    async fn present(&self, descriptor: &TicketViewDescriptor)
        -> Result<PresentedView, CaptureError>;

    /// Unmount a view without capturing it. Unknown handles are ignored.
    async fn discard(&self, handle: &ViewHandle);
}

/// Rasterizes a mounted view into an image file.
#[async_trait]
pub trait ImageCapture: Send + Sync {
    /// Capture the view. Fails with [`CaptureError::NotMounted`] when the
    /// view is gone.
    async fn capture(&self, handle: &ViewHandle) -> Result<ImageRef, CaptureError>;
}
