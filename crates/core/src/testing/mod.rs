//! Testing utilities and mock implementations.
//!
//! This module provides doubles for every collaborator of the pipeline,
//! allowing end-to-end runs without a network, a screen or a database.
//!
//! # Example
//!
//! ```rust,ignore
//! use luckyticket_core::testing::Harness;
//!
//! let dir = tempfile::TempDir::new()?;
//! let harness = Harness::new(dir.path());
//! let pipeline = harness.open("user-1")?;
//!
//! harness.select_photo(&pipeline).await?;
//! let ticket = pipeline.generate_ticket().await?;
//! assert_eq!(harness.api.submissions().await.len(), 1);
//! ```

mod clock;
mod harness;
mod memory_store;
mod mock_capture;
mod mock_composition;

pub use clock::FixedClock;
pub use harness::Harness;
pub use memory_store::MemoryProfileStore;
pub use mock_capture::{MockCapture, MockPresenter};
pub use mock_composition::{MockCompositionApi, RecordedSubmission};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::io::Cursor;
    use std::path::{Path, PathBuf};

    use chrono::NaiveDate;
    use image::{ImageFormat, ImageResult, Rgb, RgbImage};

    use crate::media::{MediaKind, MediaOrigin, PickedMedia};
    use crate::pipeline::PipelineConfig;

    /// The day every fixture clock starts on.
    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap_or_default()
    }

    /// Pipeline timing short enough for tests.
    pub fn fast_pipeline_config() -> PipelineConfig {
        PipelineConfig {
            poll_interval_ms: 10,
            max_attempts: 5,
            settle_delay_ms: 10,
        }
    }

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
            ])
        })
    }

    /// Encode a gradient image as PNG bytes.
    pub fn png_bytes(width: u32, height: u32) -> ImageResult<Vec<u8>> {
        let mut bytes = Vec::new();
        gradient(width, height).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Write a gradient PNG to `path`, creating parent directories.
    pub fn write_png(path: &Path, width: u32, height: u32) -> ImageResult<PathBuf> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        gradient(width, height).save_with_format(path, ImageFormat::Png)?;
        Ok(path.to_path_buf())
    }

    /// A gallery photo at `path` with unknown dimensions.
    pub fn picked_photo(path: &Path) -> PickedMedia {
        PickedMedia {
            path: path.to_path_buf(),
            kind: MediaKind::Photo,
            origin: MediaOrigin::Gallery,
            width: None,
            height: None,
            duration_secs: None,
            thumbnail: None,
        }
    }

    /// A video at `path` with a still frame at `thumbnail`.
    pub fn picked_video(path: &Path, thumbnail: &Path) -> PickedMedia {
        PickedMedia {
            path: path.to_path_buf(),
            kind: MediaKind::Video,
            origin: MediaOrigin::Camera,
            width: None,
            height: None,
            duration_secs: Some(3.5),
            thumbnail: Some(thumbnail.to_path_buf()),
        }
    }
}
