//! Configuration for the remote composition API.

use serde::{Deserialize, Serialize};

/// Connection settings for the composition service.
///
/// Without an API token the client runs in degraded mode and every run
/// uses the original photo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompositionConfig {
    /// Service base URL, e.g. `https://faces.example.com`.
    #[serde(default)]
    pub base_url: String,

    /// Bearer credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Timeout for a single HTTP request in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

impl CompositionConfig {
    /// Whether both a URL and a credential are present.
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && self.api_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}
