//! Media acquisition: obtaining a source photo and normalizing it before
//! the pipeline starts.

mod config;
mod error;
mod normalizer;
mod picker;
mod types;

pub use config::MediaConfig;
pub use error::MediaError;
pub use normalizer::MediaNormalizer;
pub use picker::{LocalFilePicker, LocalSelection, MediaPicker};
pub use types::{GenerationRequest, ImageRef, MediaKind, MediaOrigin, PickedMedia};
