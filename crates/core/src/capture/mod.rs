//! Presenting ticket views and rasterizing them to images.
//!
//! The pipeline hands a [`TicketViewDescriptor`](crate::ticket::TicketViewDescriptor)
//! to a [`TicketPresenter`], waits for the view to settle and then asks an
//! [`ImageCapture`] for the image. [`RasterTicketRenderer`] implements both
//! for hosts without a screen.

mod error;
mod raster;
mod traits;
mod types;

pub use error::CaptureError;
pub use raster::{RasterTicketRenderer, TICKET_HEIGHT, TICKET_WIDTH};
pub use traits::{ImageCapture, TicketPresenter};
pub use types::{PresentedView, ViewHandle};
