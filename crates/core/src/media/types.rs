//! Media types shared across the pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Kind of media the user selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    #[default]
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }
}

/// Where the media came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaOrigin {
    #[default]
    Gallery,
    Camera,
}

impl fmt::Display for MediaOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaOrigin::Gallery => write!(f, "gallery"),
            MediaOrigin::Camera => write!(f, "camera"),
        }
    }
}

/// Handle to an image, either on local disk or at a remote location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "location", rename_all = "snake_case")]
pub enum ImageRef {
    Local(PathBuf),
    Remote(String),
}

impl ImageRef {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local(path.into())
    }

    pub fn as_local(&self) -> Option<&Path> {
        match self {
            ImageRef::Local(path) => Some(path),
            ImageRef::Remote(_) => None,
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRef::Local(path) => write!(f, "{}", path.display()),
            ImageRef::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Raw result of a picker, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickedMedia {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub origin: MediaOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Video duration; `None` for photos.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Still frame for videos.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<PathBuf>,
}

impl PickedMedia {
    /// Width divided by height, when both are known.
    pub fn aspect_ratio(&self) -> Option<f64> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if h > 0 => Some(w as f64 / h as f64),
            _ => None,
        }
    }
}

/// Validated input to one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Normalized still image the face is taken from.
    pub source_photo: ImageRef,
    pub media_kind: MediaKind,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_ref_serialization() {
        let local = ImageRef::local("/tmp/a.png");
        let json = serde_json::to_string(&local).unwrap();
        assert_eq!(json, r#"{"type":"local","location":"/tmp/a.png"}"#);

        let remote: ImageRef =
            serde_json::from_str(r#"{"type":"remote","location":"https://x/y.png"}"#).unwrap();
        assert_eq!(remote, ImageRef::Remote("https://x/y.png".to_string()));
        assert!(remote.as_local().is_none());
    }

    #[test]
    fn test_aspect_ratio() {
        let picked = PickedMedia {
            path: PathBuf::from("/a.jpg"),
            kind: MediaKind::Photo,
            origin: MediaOrigin::Gallery,
            width: Some(400),
            height: Some(200),
            duration_secs: None,
            thumbnail: None,
        };
        assert_eq!(picked.aspect_ratio(), Some(2.0));
    }

    #[test]
    fn test_origin_display() {
        assert_eq!(MediaOrigin::Camera.to_string(), "camera");
        assert_eq!(MediaKind::Video.as_str(), "video");
    }
}
