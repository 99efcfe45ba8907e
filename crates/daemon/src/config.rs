//! Configuration management for the shelf daemon.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/shelfd/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ipc::get_socket_path;
use crate::library::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("download_path must be an absolute path, got {0}")]
    RelativeDownloadPath(PathBuf),

    #[error("chunk_size must be between 1 and {max} bytes, got {got}")]
    InvalidChunkSize { got: u32, max: u32 },

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Environment variable overriding `library.download_path`.
pub const ENV_DOWNLOAD_PATH: &str = "SHELFD_DOWNLOAD_PATH";

/// Environment variable overriding `daemon.log_level`.
pub const ENV_LOG_LEVEL: &str = "SHELFD_LOG_LEVEL";

/// Main configuration structure for the shelf daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// General daemon configuration.
    pub daemon: DaemonConfig,

    /// Download directory configuration.
    pub library: LibraryConfig,

    /// Local socket configuration.
    pub ipc: IpcConfig,
}

/// General daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Directory for daily rolling log files. Logs go to stderr only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

/// Download directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root of the managed download directory. Must be absolute.
    pub download_path: PathBuf,

    /// Bytes per chunk when streaming a file (default: 64KB).
    pub chunk_size: u32,
}

/// Local socket configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct IpcConfig {
    /// Socket path. Defaults to the XDG runtime location when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            download_path: default_download_path(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelfd")
        .join("config.toml")
}

/// Returns the default download directory.
fn default_download_path() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| std::env::temp_dir().join("shelfd-downloads"))
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - SHELFD_DOWNLOAD_PATH: Override the download root
    /// - SHELFD_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    ///
    /// Returns the names of the variables that were applied. This runs before
    /// logging is set up, so reporting them is left to the caller.
    pub fn apply_env_overrides(&mut self) -> Vec<&'static str> {
        let mut applied = Vec::new();

        if let Ok(path) = std::env::var(ENV_DOWNLOAD_PATH) {
            if !path.is_empty() {
                self.library.download_path = PathBuf::from(path);
                applied.push(ENV_DOWNLOAD_PATH);
            }
        }

        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            if !level.is_empty() {
                self.daemon.log_level = level;
                applied.push(ENV_LOG_LEVEL);
            }
        }

        applied
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.library.download_path.is_absolute() {
            return Err(ConfigError::RelativeDownloadPath(
                self.library.download_path.clone(),
            ));
        }

        let chunk_size = self.library.chunk_size;
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::InvalidChunkSize {
                got: chunk_size,
                max: MAX_CHUNK_SIZE,
            });
        }

        let level = self.daemon.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.daemon.log_level.clone()));
        }

        Ok(())
    }

    /// Socket path to listen on or connect to.
    pub fn socket_path(&self) -> PathBuf {
        self.ipc.socket_path.clone().unwrap_or_else(get_socket_path)
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.daemon.log_level, "info");
        assert!(config.daemon.log_dir.is_none());
        assert!(config.library.download_path.is_absolute());
        assert_eq!(config.library.chunk_size, 64 * 1024);
        assert!(config.ipc.socket_path.is_none());
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[library]
download_path = "/srv/downloads"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.library.download_path, PathBuf::from("/srv/downloads"));
        assert_eq!(config.library.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.daemon.log_level, "info");
    }

    #[test]
    fn test_from_toml_full() {
        let toml = r#"
[daemon]
log_level = "debug"
log_dir = "/var/log/shelfd"

[library]
download_path = "/downloads"
chunk_size = 4096

[ipc]
socket_path = "/run/shelfd.sock"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.daemon.log_level, "debug");
        assert_eq!(config.daemon.log_dir, Some(PathBuf::from("/var/log/shelfd")));
        assert_eq!(config.library.download_path, PathBuf::from("/downloads"));
        assert_eq!(config.library.chunk_size, 4096);
        assert_eq!(config.socket_path(), PathBuf::from("/run/shelfd.sock"));
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let toml = r#"
[library
download_path = "/downloads"
"#;
        let err = Config::from_toml(toml).unwrap_err().to_string();
        assert!(err.contains("Invalid TOML"));
    }

    #[test]
    fn test_from_toml_wrong_type() {
        let toml = r#"
[library]
chunk_size = "big"
"#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let toml = r#"
[library]
download_path = "/downloads"
engine = "yt-dlp"
"#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.library.download_path, PathBuf::from("/downloads"));
    }

    #[test]
    fn test_roundtrip_custom() {
        let mut config = Config::default();
        config.library.download_path = PathBuf::from("/data/videos");
        config.library.chunk_size = 1024;
        config.ipc.socket_path = Some(PathBuf::from("/tmp/s.sock"));

        let restored = Config::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_creates_directories_and_loads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/dir/config.toml");

        let mut config = Config::default();
        config.library.download_path = PathBuf::from("/mnt/media");
        config.save(&path).unwrap();

        assert!(path.exists());
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "this is not [ valid").unwrap();

        let err = format!("{:#}", Config::load(&path).unwrap_err());
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("shelfd/config.toml"));
    }

    #[test]
    fn test_validate_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_relative_download_path() {
        let mut config = Config::default();
        config.library.download_path = PathBuf::from("downloads");
        assert_eq!(
            config.validate(),
            Err(ConfigError::RelativeDownloadPath(PathBuf::from("downloads")))
        );
    }

    #[test]
    fn test_validate_chunk_size_bounds() {
        let mut config = Config::default();

        config.library.chunk_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidChunkSize { got: 0, .. })
        ));

        config.library.chunk_size = MAX_CHUNK_SIZE + 1;
        assert!(config.validate().is_err());

        config.library.chunk_size = 1;
        assert!(config.validate().is_ok());

        config.library.chunk_size = MAX_CHUNK_SIZE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = Config::default();
        for level in ["trace", "debug", "info", "warn", "error", "DEBUG"] {
            config.daemon.log_level = level.to_string();
            assert!(config.validate().is_ok(), "{level} should be valid");
        }

        config.daemon.log_level = "verbose".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("verbose".to_string()))
        );
    }

    #[test]
    #[serial]
    fn test_env_override_download_path() {
        let original = std::env::var(ENV_DOWNLOAD_PATH).ok();

        // SAFETY: This is a test, serialized with other env tests
        unsafe {
            std::env::set_var(ENV_DOWNLOAD_PATH, "/override/downloads");
        }

        let mut config = Config::default();
        let applied = config.apply_env_overrides();
        assert_eq!(
            config.library.download_path,
            PathBuf::from("/override/downloads")
        );
        assert!(applied.contains(&ENV_DOWNLOAD_PATH));

        // SAFETY: This is a test, serialized with other env tests
        unsafe {
            match original {
                Some(val) => std::env::set_var(ENV_DOWNLOAD_PATH, val),
                None => std::env::remove_var(ENV_DOWNLOAD_PATH),
            }
        }
    }

    #[test]
    #[serial]
    fn test_env_override_empty_does_not_override() {
        let original = std::env::var(ENV_LOG_LEVEL).ok();

        // SAFETY: This is a test, serialized with other env tests
        unsafe {
            std::env::set_var(ENV_LOG_LEVEL, "");
        }

        let mut config = Config::default();
        let applied = config.apply_env_overrides();
        assert_eq!(config.daemon.log_level, "info");
        assert!(!applied.contains(&ENV_LOG_LEVEL));

        // SAFETY: This is a test, serialized with other env tests
        unsafe {
            match original {
                Some(val) => std::env::set_var(ENV_LOG_LEVEL, val),
                None => std::env::remove_var(ENV_LOG_LEVEL),
            }
        }
    }

    #[test]
    #[serial]
    fn test_env_override_log_level() {
        let original = std::env::var(ENV_LOG_LEVEL).ok();

        // SAFETY: This is a test, serialized with other env tests
        unsafe {
            std::env::set_var(ENV_LOG_LEVEL, "trace");
        }

        let mut config = Config::default();
        let applied = config.apply_env_overrides();
        assert_eq!(config.daemon.log_level, "trace");
        assert!(applied.contains(&ENV_LOG_LEVEL));

        // SAFETY: This is a test, serialized with other env tests
        unsafe {
            match original {
                Some(val) => std::env::set_var(ENV_LOG_LEVEL, val),
                None => std::env::remove_var(ENV_LOG_LEVEL),
            }
        }
    }
}
