use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::composition::CompositionConfig;
use crate::media::MediaConfig;
use crate::pipeline::PipelineConfig;
use crate::quota::QuotaPolicy;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub composition: CompositionConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub quota: QuotaPolicy,
    #[serde(default)]
    pub media: MediaConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration (profile store)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("luckyticket.db")
}

/// Where generated files live on disk.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root for normalized sources, composition results and rendered tickets.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory holding one image per ticket template.
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            templates_dir: default_templates_dir(),
        }
    }
}

impl StorageConfig {
    /// Directory for normalized source photos.
    pub fn sources_dir(&self) -> PathBuf {
        self.data_dir.join("sources")
    }

    /// Directory for downloaded composition results.
    pub fn composed_dir(&self) -> PathBuf {
        self.data_dir.join("composed")
    }

    /// Directory for rasterized tickets.
    pub fn tickets_dir(&self) -> PathBuf {
        self.data_dir.join("tickets")
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("assets/templates")
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub composition: SanitizedCompositionConfig,
    pub pipeline: PipelineConfig,
    pub quota: QuotaPolicy,
    pub media: MediaConfig,
}

/// Composition config with the API token hidden.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCompositionConfig {
    pub base_url: String,
    pub api_token_configured: bool,
    pub request_timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            storage: config.storage.clone(),
            composition: SanitizedCompositionConfig {
                base_url: config.composition.base_url.clone(),
                api_token_configured: config
                    .composition
                    .api_token
                    .as_deref()
                    .is_some_and(|t| !t.is_empty()),
                request_timeout_secs: config.composition.request_timeout_secs,
            },
            pipeline: config.pipeline.clone(),
            quota: config.quota.clone(),
            media: config.media.clone(),
        }
    }
}
