//! Key-value settings store.
//!
//! The shell keeps user preferences in a flat JSON object keyed by dotted
//! names such as `xcsoar.home` or `fileman.download-logs.filter`. Values are
//! arbitrary JSON; callers decide how to interpret them.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Settings key holding the flight software home directory.
pub const XCSOAR_HOME_KEY: &str = "xcsoar.home";

/// The get/set/save contract the download workflow relies on.
pub trait SettingsStore {
    /// Look up a value, `None` when the key is absent.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store a value. Nothing reaches disk until [`SettingsStore::save`].
    fn set(&mut self, key: &str, value: Value);

    /// Persist all values.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&mut self) -> Result<()>;

    /// Look up a value that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSetting`] when the key is absent or null.
    fn get_strict(&self, key: &str) -> Result<Value> {
        match self.get(key) {
            Some(Value::Null) | None => Err(Error::missing_setting(key)),
            Some(value) => Ok(value),
        }
    }

    /// Look up a string value; other types count as absent.
    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(ToString::to_string))
    }
}

/// Read a required path-valued setting.
///
/// # Errors
///
/// Returns [`Error::MissingSetting`] when the key is absent, null, empty or
/// not a string.
pub fn get_path(store: &dyn SettingsStore, key: &str) -> Result<PathBuf> {
    store
        .get_string(key)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| Error::missing_setting(key))
}

/// Settings persisted as a single JSON object on disk.
#[derive(Debug, Clone, Default)]
pub struct JsonSettings {
    /// Backing file; `None` for an in-memory store.
    path: Option<PathBuf>,
    values: Map<String, Value>,
}

impl JsonSettings {
    /// Load settings from a JSON file.
    ///
    /// A missing file yields an empty store that will be created on save.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, or does not
    /// contain a JSON object.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<Value>(&text)? {
                Value::Object(map) => map,
                _ => {
                    return Err(Error::internal(format!(
                        "settings file {} does not contain a JSON object",
                        path.display()
                    )))
                }
            }
        } else {
            debug!("No settings file at {}, starting empty", path.display());
            Map::new()
        };

        Ok(Self {
            path: Some(path),
            values,
        })
    }

    /// Create a store that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Get the backing file path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl SettingsStore for JsonSettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn save(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let text = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(path, text)?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }
}
