//! Media pickers.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::error::MediaError;
use super::types::{MediaKind, MediaOrigin, PickedMedia};

/// Source of user-selected media (gallery, camera).
#[async_trait]
pub trait MediaPicker: Send + Sync {
    /// Returns the selected media or why none was selected.
    async fn pick(&self, origin: MediaOrigin) -> Result<PickedMedia, MediaError>;
}

/// A selection made outside the process, e.g. a file uploaded by a client.
#[derive(Debug, Clone)]
pub struct LocalSelection {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub thumbnail: Option<PathBuf>,
    pub duration_secs: Option<f64>,
}

/// Picker for headless hosts: the "gallery" and "camera" are files already
/// on disk.
///
/// With [`within`](Self::within) the selection is resolved against a root
/// directory and anything that escapes it is rejected.
#[derive(Debug, Clone)]
pub struct LocalFilePicker {
    selection: Option<LocalSelection>,
    camera_permitted: bool,
    root: Option<PathBuf>,
}

impl LocalFilePicker {
    /// A picker that returns `selection` from either origin.
    pub fn new(selection: LocalSelection) -> Self {
        Self {
            selection: Some(selection),
            camera_permitted: true,
            root: None,
        }
    }

    /// Shorthand for a photo at `path`.
    pub fn photo(path: impl Into<PathBuf>) -> Self {
        Self::new(LocalSelection {
            path: path.into(),
            kind: MediaKind::Photo,
            thumbnail: None,
            duration_secs: None,
        })
    }

    /// A picker whose user dismissed the selection.
    pub fn dismissed() -> Self {
        Self {
            selection: None,
            camera_permitted: true,
            root: None,
        }
    }

    /// Deny access to the camera origin.
    pub fn without_camera(mut self) -> Self {
        self.camera_permitted = false;
        self
    }

    /// Only accept files under `root`. Relative selections are resolved
    /// against it.
    pub fn within(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }
}

#[async_trait]
impl MediaPicker for LocalFilePicker {
    async fn pick(&self, origin: MediaOrigin) -> Result<PickedMedia, MediaError> {
        if origin == MediaOrigin::Camera && !self.camera_permitted {
            return Err(MediaError::PermissionDenied { origin });
        }

        let selection = self.selection.as_ref().ok_or(MediaError::Cancelled)?;

        let (path, thumbnail) = match &self.root {
            Some(root) => {
                let thumbnail = match &selection.thumbnail {
                    Some(thumbnail) => Some(confine(root, thumbnail).await?),
                    None => None,
                };
                (confine(root, &selection.path).await?, thumbnail)
            }
            None => (selection.path.clone(), selection.thumbnail.clone()),
        };

        let probe_path = match selection.kind {
            MediaKind::Photo => Some(path.clone()),
            MediaKind::Video => thumbnail.clone(),
        };

        // Dimensions are best-effort metadata; validation happens in the normalizer.
        let dimensions = match probe_path {
            Some(path) => tokio::task::spawn_blocking(move || image::image_dimensions(path).ok())
                .await
                .ok()
                .flatten(),
            None => None,
        };

        debug!(
            path = %path.display(),
            kind = selection.kind.as_str(),
            %origin,
            ?dimensions,
            "Picked local media"
        );

        Ok(PickedMedia {
            path,
            kind: selection.kind,
            origin,
            width: dimensions.map(|(w, _)| w),
            height: dimensions.map(|(_, h)| h),
            duration_secs: selection.duration_secs,
            thumbnail,
        })
    }
}

/// Resolve `path` against `root`, following symlinks, and reject anything
/// that ends up outside it. A missing file inside the root is `NotFound`;
/// a missing file outside it is still `OutsideRoot`.
async fn confine(root: &Path, path: &Path) -> Result<PathBuf, MediaError> {
    let root = tokio::fs::canonicalize(root).await?;
    let joined = root.join(path);

    match tokio::fs::canonicalize(&joined).await {
        Ok(resolved) if resolved.starts_with(&root) => Ok(resolved),
        Ok(_) => Err(MediaError::OutsideRoot {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if lexically_normal(&joined).starts_with(&root) {
                Err(MediaError::NotFound {
                    path: path.to_path_buf(),
                })
            } else {
                Err(MediaError::OutsideRoot {
                    path: path.to_path_buf(),
                })
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Drop `.` and fold `..` without touching the filesystem.
fn lexically_normal(path: &Path) -> PathBuf {
    let mut normal = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normal.pop();
            }
            other => normal.push(other),
        }
    }
    normal
}
