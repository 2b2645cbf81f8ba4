//! Validation and normalization of picked media.

use std::path::{Path, PathBuf};

use image::{imageops::FilterType, ImageFormat};
use tracing::{debug, info};

use super::config::MediaConfig;
use super::error::MediaError;
use super::types::{GenerationRequest, ImageRef, MediaKind, PickedMedia};

/// Turns picked media into a [`GenerationRequest`].
///
/// The normalized photo is a PNG no larger than `max_dimension` on its
/// longest side, written under the sources directory.
#[derive(Debug, Clone)]
pub struct MediaNormalizer {
    config: MediaConfig,
    output_dir: PathBuf,
}

impl MediaNormalizer {
    pub fn new(config: MediaConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
        }
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// Validate and normalize a picked file.
    pub async fn normalize(&self, picked: &PickedMedia) -> Result<GenerationRequest, MediaError> {
        let still = match picked.kind {
            MediaKind::Photo => picked.path.clone(),
            MediaKind::Video => picked
                .thumbnail
                .clone()
                .ok_or(MediaError::MissingThumbnail)?,
        };

        self.validate(&still).await?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output = self
            .output_dir
            .join(format!("{}.png", uuid::Uuid::new_v4()));

        let max_dimension = self.config.max_dimension;
        let (width, height) = {
            let input = still.clone();
            let output = output.clone();
            tokio::task::spawn_blocking(move || rescale(&input, &output, max_dimension))
                .await
                .map_err(|e| MediaError::Decode(e.to_string()))??
        };

        info!(
            source = %still.display(),
            normalized = %output.display(),
            width,
            height,
            kind = picked.kind.as_str(),
            "Normalized source media"
        );

        Ok(GenerationRequest {
            source_photo: ImageRef::Local(output),
            media_kind: picked.kind,
            width,
            height,
        })
    }

    async fn validate(&self, path: &Path) -> Result<(), MediaError> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MediaError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if !self.config.accepts_extension(ext) {
            return Err(MediaError::UnsupportedFormat {
                format: if ext.is_empty() {
                    "<none>".to_string()
                } else {
                    ext.to_string()
                },
            });
        }

        if metadata.len() > self.config.max_file_bytes {
            return Err(MediaError::TooLarge {
                size_bytes: metadata.len(),
                max_bytes: self.config.max_file_bytes,
            });
        }

        debug!(path = %path.display(), size = metadata.len(), "Media passed validation");
        Ok(())
    }
}

fn rescale(input: &Path, output: &Path, max_dimension: u32) -> Result<(u32, u32), MediaError> {
    let mut img = image::open(input)?;
    if img.width().max(img.height()) > max_dimension {
        img = img.resize(max_dimension, max_dimension, FilterType::Triangle);
    }
    img.save_with_format(output, ImageFormat::Png)?;
    Ok((img.width(), img.height()))
}
