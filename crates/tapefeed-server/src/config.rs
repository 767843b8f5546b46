//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `tapefeed.yaml` at the project
//! root. This module defines strongly-typed structs mirroring the YAML
//! structure and a loader that reads the file and applies environment
//! variable overrides for deployment.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tapefeed_store::ConnectOptions;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level application configuration.
///
/// All fields have defaults, so an absent or partial file still yields a
/// runnable configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Backing Redis settings.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Distribution loop settings.
    #[serde(default)]
    pub distributor: DistributorTimings,
}

impl AppConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override file values:
    /// - `TAPEFEED_HOST` overrides `server.host`
    /// - `TAPEFEED_PORT` overrides `server.port`
    /// - `TAPEFEED_REDIS_URL` overrides `redis.url`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply deployment overrides from `lookup`. Split from
    /// [`Self::apply_env_overrides`] so tests can drive it without mutating
    /// process-global environment state.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("TAPEFEED_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("TAPEFEED_PORT") {
            // An unparsable port keeps the file value.
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(url) = lookup("TAPEFEED_REDIS_URL") {
            self.redis.url = url;
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,
    /// The TCP port to listen on.
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

/// Backing Redis settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL (`redis://[:password@]host:port`).
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Namespace prefix for every stored key.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Maximum connection attempts before startup fails.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base retry delay in milliseconds (attempt `n` waits `n * base`).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl RedisConfig {
    /// Connection options for the resilient connector.
    pub const fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            prefix: default_prefix(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Distribution loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DistributorTimings {
    /// Poll interval of the listening loop, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Pause after a processing error, in milliseconds.
    #[serde(default = "default_error_pause_ms")]
    pub error_pause_ms: u64,
}

impl Default for DistributorTimings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            error_pause_ms: default_error_pause_ms(),
        }
    }
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

fn default_redis_url() -> String {
    String::from("redis://localhost:6379")
}

fn default_prefix() -> String {
    String::from("tapefeed")
}

const fn default_max_attempts() -> u32 {
    20
}

const fn default_base_delay_ms() -> u64 {
    500
}

const fn default_poll_interval_ms() -> u64 {
    100
}

const fn default_error_pause_ms() -> u64 {
    1000
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = AppConfig::parse("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.redis.prefix, "tapefeed");
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let config = AppConfig::parse(
            "server:\n  port: 9000\nredis:\n  url: redis://cache:6379\n",
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.redis.url, "redis://cache:6379");
        assert_eq!(config.redis.max_attempts, 20);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(AppConfig::parse("server: [").is_err());
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut config = AppConfig::parse("server:\n  port: 9000\n").unwrap();
        config.apply_overrides(|name| match name {
            "TAPEFEED_HOST" => Some("10.0.0.5".to_owned()),
            "TAPEFEED_PORT" => Some("7777".to_owned()),
            "TAPEFEED_REDIS_URL" => Some("redis://cache:6380".to_owned()),
            _ => None,
        });

        assert_eq!(config.server.host, "10.0.0.5");
        assert_eq!(config.server.port, 7777);
        assert_eq!(config.redis.url, "redis://cache:6380");
    }

    #[test]
    fn unparsable_port_override_keeps_file_value() {
        let mut config = AppConfig::parse("server:\n  port: 9000\n").unwrap();
        config.apply_overrides(|name| match name {
            "TAPEFEED_PORT" => Some("not-a-port".to_owned()),
            _ => None,
        });

        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn absent_overrides_leave_config_untouched() {
        let mut config = AppConfig::parse("redis:\n  url: redis://cache:6379\n").unwrap();
        config.apply_overrides(|_| None);

        assert_eq!(config.redis.url, "redis://cache:6379");
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn connect_options_reflect_redis_section() {
        let config = AppConfig::parse("redis:\n  max_attempts: 3\n  base_delay_ms: 50\n").unwrap();
        let opts = config.redis.connect_options();
        assert_eq!(opts.max_attempts, 3);
        assert_eq!(opts.base_delay, Duration::from_millis(50));
    }
}
