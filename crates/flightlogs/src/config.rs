//! Configuration management for flightlogs.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.
//!
//! Configuration only describes *where* things live. User preferences such as
//! the download filter and the flight software home directory are kept in the
//! settings store (see [`crate::settings`]).

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flightlogs";

/// Default settings file name.
const SETTINGS_FILE_NAME: &str = "settings.json";

/// Default download history database file name.
const HISTORY_FILE_NAME: &str = "downloads.db";

/// Where removable storage is expected to appear.
pub const DEFAULT_MOUNT_POINT: &str = "/usb/usbstick";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLIGHTLOGS_`, `__` between sections)
/// 2. TOML config file at `~/.config/flightlogs/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Filesystem locations.
    pub paths: PathsConfig,
    /// Mount watcher configuration.
    pub watcher: WatcherConfig,
}

/// Filesystem locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Logical filesystem root. Absolute paths from the settings store and
    /// the mount point are resolved beneath it.
    pub root: PathBuf,
    /// Path whose existence signals that removable storage is attached.
    pub mount_point: PathBuf,
    /// Path to the JSON settings file.
    /// Defaults to `~/.config/flightlogs/settings.json`
    pub settings_file: Option<PathBuf>,
    /// Path to the download history database.
    /// Defaults to `~/.local/share/flightlogs/downloads.db`
    pub history_db: Option<PathBuf>,
}

/// Mount watcher configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Interval between mount point checks in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            mount_point: PathBuf::from(DEFAULT_MOUNT_POINT),
            settings_file: None, // Will be resolved to default at runtime
            history_db: None,
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FLIGHTLOGS_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(CONFIG_FILE_NAME)
    }

    /// Get the default configuration directory.
    #[must_use]
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.watcher.poll_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "poll_interval_ms must be greater than 0".to_string(),
            });
        }

        if self.paths.mount_point.as_os_str().is_empty() {
            return Err(Error::ConfigValidation {
                message: "mount_point must not be empty".to_string(),
            });
        }

        if self.paths.root.as_os_str().is_empty() {
            return Err(Error::ConfigValidation {
                message: "root must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Resolve a logical path beneath the configured root.
    ///
    /// `/usb/usbstick` with root `/tmp/sim` becomes `/tmp/sim/usb/usbstick`.
    /// Relative paths are joined onto the root as they are.
    #[must_use]
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let relative: PathBuf = path
            .as_ref()
            .components()
            .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
            .collect();
        self.paths.root.join(relative)
    }

    /// Get the resolved mount point.
    #[must_use]
    pub fn mount_point(&self) -> PathBuf {
        self.resolve(&self.paths.mount_point)
    }

    /// Get the settings file path, resolving defaults if not set.
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.paths
            .settings_file
            .clone()
            .unwrap_or_else(|| Self::default_config_dir().join(SETTINGS_FILE_NAME))
    }

    /// Get the history database path, resolving defaults if not set.
    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.paths
            .history_db
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(HISTORY_FILE_NAME))
    }

    /// Get the poll interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.watcher.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.paths.root, PathBuf::from("/"));
        assert_eq!(config.paths.mount_point, PathBuf::from("/usb/usbstick"));
        assert!(config.paths.settings_file.is_none());
        assert!(config.paths.history_db.is_none());
        assert_eq!(config.watcher.poll_interval_ms, 1000);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let mut config = Config::default();
        config.watcher.poll_interval_ms = 0;

        let result = config.validate();
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("poll_interval_ms"));
    }

    #[test]
    fn test_validate_empty_mount_point() {
        let mut config = Config::default();
        config.paths.mount_point = PathBuf::new();

        let err = config.validate().unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("mount_point"));
    }

    #[test]
    fn test_resolve_under_default_root() {
        let config = Config::default();
        assert_eq!(
            config.resolve("/home/root/.xcsoar"),
            PathBuf::from("/home/root/.xcsoar")
        );
    }

    #[test]
    fn test_resolve_under_custom_root() {
        let mut config = Config::default();
        config.paths.root = PathBuf::from("/tmp/sim");

        assert_eq!(
            config.resolve("/usb/usbstick"),
            PathBuf::from("/tmp/sim/usb/usbstick")
        );
        assert_eq!(config.resolve("relative/dir"), PathBuf::from("/tmp/sim/relative/dir"));
        assert_eq!(config.mount_point(), PathBuf::from("/tmp/sim/usb/usbstick"));
    }

    #[test]
    fn test_resolve_collapses_double_slash() {
        let mut config = Config::default();
        config.paths.root = PathBuf::from("/tmp/sim");
        assert_eq!(
            config.resolve("//usb/usbstick"),
            PathBuf::from("/tmp/sim/usb/usbstick")
        );
    }

    #[test]
    fn test_settings_path_default() {
        let config = Config::default();
        let path = config.settings_path();

        assert!(path.to_string_lossy().contains("flightlogs"));
        assert!(path.to_string_lossy().contains("settings.json"));
    }

    #[test]
    fn test_history_path_custom() {
        let mut config = Config::default();
        config.paths.history_db = Some(PathBuf::from("/custom/path/history.db"));

        assert_eq!(config.history_path(), PathBuf::from("/custom/path/history.db"));
    }

    #[test]
    fn test_history_path_default() {
        let config = Config::default();
        assert!(config
            .history_path()
            .to_string_lossy()
            .contains("downloads.db"));
    }

    #[test]
    fn test_poll_interval() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("flightlogs"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // Loading from a nonexistent path should work (uses defaults)
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[paths]\nroot = \"/tmp/sim\"\n\n[watcher]\npoll_interval_ms = 250\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.paths.root, PathBuf::from("/tmp/sim"));
        assert_eq!(config.paths.mount_point, PathBuf::from("/usb/usbstick"));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[watcher]\npoll_interval_ms = 0\n").unwrap();

        let err = Config::load_from(Some(path)).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_watcher_config_deserialize() {
        let json = r#"{"poll_interval_ms": 500}"#;
        let watcher: WatcherConfig = serde_json::from_str(json).unwrap();
        assert_eq!(watcher.poll_interval_ms, 500);
    }
}
