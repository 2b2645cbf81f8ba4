//! Configuration for media validation and normalization.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Limits applied to picked media before it enters the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Largest accepted source file.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Longest side of the normalized photo, in pixels.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    /// Accepted file extensions (lowercase, without dot).
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Whether the camera origin may be used. Hosts without a camera turn
    /// this off and camera picks fail with a permission error.
    #[serde(default = "default_camera_enabled")]
    pub camera_enabled: bool,

    /// Directory the server accepts selections from. Request paths are
    /// resolved against it and may not leave it.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
}

fn default_max_file_bytes() -> u64 {
    20 * 1024 * 1024
}

fn default_max_dimension() -> u32 {
    2048
}

fn default_allowed_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_camera_enabled() -> bool {
    true
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            max_dimension: default_max_dimension(),
            allowed_extensions: default_allowed_extensions(),
            camera_enabled: default_camera_enabled(),
            upload_dir: default_upload_dir(),
        }
    }
}

impl MediaConfig {
    /// Whether a file extension is accepted (case-insensitive).
    pub fn accepts_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.allowed_extensions.iter().any(|e| *e == ext)
    }
}
