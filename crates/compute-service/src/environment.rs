//! Process-environment configuration. Required values missing at startup
//! are a fatal error; the service never runs half-configured.

use thiserror::Error;
use tracing::Level;

use splitup_storage::StorageConfig;

pub const DEFAULT_REGION: &str = "eu-west-2";
pub const DEFAULT_SERVICE_NAME: &str = "compute-service";
pub const DEFAULT_LOG_LEVEL: &str = "INFO";
pub const DEFAULT_API_PORT: u16 = 6068;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Validated environment settings.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub storage_s3_bucket: String,
    pub storage_api_endpoint: String,
    pub storage_api_key: String,
    pub storage_region: String,
    pub service_name: String,
    pub log_level: Level,
    pub api_port: u16,
    pub heartbeat_url: String,
    pub listener_url: String,
    pub config_url: String,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; the seam the tests use.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |var: &'static str| get(var).ok_or(ConfigError::Missing(var));

        let log_level_raw =
            get("SPLITUP_COMPUTE_SERVICE_LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.into());
        let log_level = log_level_raw
            .parse::<Level>()
            .map_err(|_| ConfigError::Invalid {
                var: "SPLITUP_COMPUTE_SERVICE_LOG_LEVEL",
                value: log_level_raw.clone(),
            })?;

        let api_port = match get("SPLITUP_COMPUTE_SERVICE_API_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                var: "SPLITUP_COMPUTE_SERVICE_API_PORT",
                value: raw.clone(),
            })?,
            None => DEFAULT_API_PORT,
        };

        let config = Self {
            storage_s3_bucket: required("SPLITUP_STORAGE_S3_BUCKET")?,
            storage_api_endpoint: required("SPLITUP_STORAGE_API_ENDPOINT")?,
            storage_api_key: required("SPLITUP_STORAGE_API_KEY")?,
            storage_region: get("SPLITUP_STORAGE_REGION").unwrap_or_else(|| DEFAULT_REGION.into()),
            service_name: get("SPLITUP_COMPUTE_SERVICE_NAME")
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.into()),
            log_level,
            api_port,
            heartbeat_url: required("SPLITUP_COMPUTE_SERVICE_HEARTBEAT_URL")?,
            listener_url: required("SPLITUP_COMPUTE_SERVICE_LISTENER_URL")?,
            config_url: required("SPLITUP_COMPUTE_SERVICE_CONFIG_URL")?,
        };

        for (var, url) in [
            (
                "SPLITUP_COMPUTE_SERVICE_HEARTBEAT_URL",
                &config.heartbeat_url,
            ),
            ("SPLITUP_COMPUTE_SERVICE_LISTENER_URL", &config.listener_url),
            ("SPLITUP_COMPUTE_SERVICE_CONFIG_URL", &config.config_url),
        ] {
            reqwest::Url::parse(url).map_err(|_| ConfigError::Invalid {
                var,
                value: url.clone(),
            })?;
        }

        Ok(config)
    }

    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            api_endpoint: self.storage_api_endpoint.clone(),
            api_key: self.storage_api_key.clone(),
            region: self.storage_region.clone(),
            bucket: self.storage_s3_bucket.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SPLITUP_STORAGE_S3_BUCKET", "splitup-artifacts"),
            ("SPLITUP_STORAGE_API_ENDPOINT", "https://storage.example.com"),
            ("SPLITUP_STORAGE_API_KEY", "secret"),
            (
                "SPLITUP_COMPUTE_SERVICE_HEARTBEAT_URL",
                "https://state.example.com/heartbeat",
            ),
            (
                "SPLITUP_COMPUTE_SERVICE_LISTENER_URL",
                "https://listener.example.com",
            ),
            (
                "SPLITUP_COMPUTE_SERVICE_CONFIG_URL",
                "https://state.example.com/config",
            ),
        ])
    }

    fn lookup<'a>(env: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| env.get(name).map(|v| v.to_string())
    }

    #[test]
    fn test_defaults_applied() {
        let env = full_env();
        let config = EnvConfig::from_lookup(lookup(&env)).unwrap();
        assert_eq!(config.storage_region, "eu-west-2");
        assert_eq!(config.api_port, 6068);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.service_name, "compute-service");
    }

    #[test]
    fn test_missing_required_is_fatal() {
        let mut env = full_env();
        env.remove("SPLITUP_STORAGE_API_KEY");
        assert!(matches!(
            EnvConfig::from_lookup(lookup(&env)),
            Err(ConfigError::Missing("SPLITUP_STORAGE_API_KEY"))
        ));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut env = full_env();
        env.insert("SPLITUP_COMPUTE_SERVICE_LISTENER_URL", "not a url");
        assert!(matches!(
            EnvConfig::from_lookup(lookup(&env)),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut env = full_env();
        env.insert("SPLITUP_COMPUTE_SERVICE_API_PORT", "not-a-port");
        assert!(matches!(
            EnvConfig::from_lookup(lookup(&env)),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let mut env = full_env();
        env.insert("SPLITUP_COMPUTE_SERVICE_API_PORT", "7070");
        env.insert("SPLITUP_COMPUTE_SERVICE_LOG_LEVEL", "debug");
        env.insert("SPLITUP_STORAGE_REGION", "us-east-1");
        let config = EnvConfig::from_lookup(lookup(&env)).unwrap();
        assert_eq!(config.api_port, 7070);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.storage_config().region, "us-east-1");
    }
}
