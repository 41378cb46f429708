//! Configuration management for stremio-remote
//!
//! Config is stored at ~/.config/stremio-remote/config.toml. Environment
//! variables override the file and command-line flags override both.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::deeplink::DEFAULT_SCHEME;
use crate::device::{
    DeviceEndpoint, RetryPolicy, DEFAULT_ADB_PORT, DEFAULT_PRESS_DELAY,
    DEFAULT_TRANSPORT_TIMEOUT, STREMIO_PACKAGE,
};

pub const ENV_HOST: &str = "ANDROID_TV_HOST";
pub const ENV_PORT: &str = "ANDROID_TV_PORT";
pub const ENV_TMDB_KEY: &str = "TMDB_API_KEY";
pub const ENV_ADB_PATH: &str = "ADB_PATH";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },

    #[error("No Android TV host configured (set {ENV_HOST} or pass --host)")]
    MissingHost,

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// `[device]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub host: Option<String>,
    pub port: u16,
    pub adb_path: String,
    pub transport_timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_ADB_PORT,
            adb_path: "adb".to_string(),
            transport_timeout_ms: DEFAULT_TRANSPORT_TIMEOUT.as_millis() as u64,
        }
    }
}

/// `[retry]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 2000,
        }
    }
}

/// `[playback]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub press_delay_ms: u64,
    pub target_package: String,
    pub uri_scheme: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            press_delay_ms: DEFAULT_PRESS_DELAY.as_millis() as u64,
            target_package: STREMIO_PACKAGE.to_string(),
            uri_scheme: DEFAULT_SCHEME.to_string(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tmdb_api_key: Option<String>,
    pub device: DeviceConfig,
    pub retry: RetryConfig,
    pub playback: PlaybackConfig,
}

impl Config {
    /// Get config file path (~/.config/stremio-remote/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("stremio-remote").join("config.toml"))
    }

    /// Load the default config file, or defaults if there is none
    pub fn load() -> Result<Self, ConfigError> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup` (empty values are ignored)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(host) = get(ENV_HOST) {
            self.device.host = Some(host);
        }
        if let Some(port) = get(ENV_PORT) {
            self.device.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_PORT,
                value: port,
            })?;
        }
        if let Some(key) = get(ENV_TMDB_KEY) {
            self.tmdb_api_key = Some(key);
        }
        if let Some(path) = get(ENV_ADB_PATH) {
            self.device.adb_path = path;
        }
        Ok(())
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.port == 0 {
            return Err(ConfigError::Invalid("device.port must be 1-65535".into()));
        }
        if self.device.host.as_deref().is_some_and(|h| h.trim().is_empty()) {
            return Err(ConfigError::Invalid("device.host must not be empty".into()));
        }
        if self.device.adb_path.trim().is_empty() {
            return Err(ConfigError::Invalid("device.adb_path must not be empty".into()));
        }
        if self.device.transport_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "device.transport_timeout_ms must be positive".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        if self.playback.target_package.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "playback.target_package must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Device to control
    pub fn endpoint(&self) -> Result<DeviceEndpoint, ConfigError> {
        let host = self.device.host.as_deref().ok_or(ConfigError::MissingHost)?;
        Ok(DeviceEndpoint::new(host, self.device.port))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.delay_ms),
        )
    }

    pub fn press_delay(&self) -> Duration {
        Duration::from_millis(self.playback.press_delay_ms)
    }

    pub fn transport_timeout(&self) -> Duration {
        Duration::from_millis(self.device.transport_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.tmdb_api_key.is_none());
        assert!(config.device.host.is_none());
        assert_eq!(config.device.port, 5555);
        assert_eq!(config.device.adb_path, "adb");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.press_delay(), Duration::from_millis(2500));
        assert_eq!(config.playback.target_package, "com.stremio.one");
        assert_eq!(config.playback.uri_scheme, "stremio");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[device]\nhost = \"192.168.1.50\"\n\n[retry]\ndelay_ms = 500\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.device.host.as_deref(), Some("192.168.1.50"));
        assert_eq!(config.device.port, 5555);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry_policy().delay_between_attempts(), Duration::from_millis(500));
        assert_eq!(config.endpoint().unwrap().to_string(), "192.168.1.50:5555");
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[device\nhost = ").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.device.host = Some("file-host".to_string());
        config
            .apply_overrides(env(&[
                (ENV_HOST, "10.0.0.50"),
                (ENV_PORT, "5556"),
                (ENV_TMDB_KEY, "abc123"),
                (ENV_ADB_PATH, "/opt/platform-tools/adb"),
            ]))
            .unwrap();

        assert_eq!(config.endpoint().unwrap().serial(), "10.0.0.50:5556");
        assert_eq!(config.tmdb_api_key.as_deref(), Some("abc123"));
        assert_eq!(config.device.adb_path, "/opt/platform-tools/adb");
    }

    #[test]
    fn test_empty_env_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(env(&[(ENV_HOST, ""), (ENV_PORT, " ")])).unwrap();
        assert!(config.device.host.is_none());
        assert_eq!(config.device.port, 5555);
    }

    #[test]
    fn test_invalid_port_env() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(env(&[(ENV_PORT, "not-a-port")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: ENV_PORT, .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.device.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.device.host = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_host() {
        assert!(matches!(
            Config::default().endpoint(),
            Err(ConfigError::MissingHost)
        ));
    }
}
