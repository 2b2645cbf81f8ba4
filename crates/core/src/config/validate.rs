use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Polling makes progress (non-zero interval and attempts)
/// - Quota limits are ordered (free <= premium)
/// - At least one media extension is accepted
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.pipeline.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.poll_interval_ms cannot be 0".to_string(),
        ));
    }

    if config.pipeline.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.max_attempts cannot be 0".to_string(),
        ));
    }

    if config.quota.free_limit > config.quota.premium_limit {
        return Err(ConfigError::ValidationError(format!(
            "quota.free_limit ({}) exceeds quota.premium_limit ({})",
            config.quota.free_limit, config.quota.premium_limit
        )));
    }

    if config.media.allowed_extensions.is_empty() {
        return Err(ConfigError::ValidationError(
            "media.allowed_extensions cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::net::IpAddr;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse::<IpAddr>().unwrap(),
                port: 0,
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_zero_attempts_fails() {
        let mut config = Config::default();
        config.pipeline.max_attempts = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_interval_fails() {
        let mut config = Config::default();
        config.pipeline.poll_interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_inverted_limits_fails() {
        let mut config = Config::default();
        config.quota.free_limit = 4;
        config.quota.premium_limit = 3;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("free_limit"));
    }

    #[test]
    fn test_validate_empty_extensions_fails() {
        let mut config = Config::default();
        config.media.allowed_extensions.clear();
        assert!(validate_config(&config).is_err());
    }
}
