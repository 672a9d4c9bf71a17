//! Error types for flightlogs.
//!
//! This module defines all error types used throughout the flightlogs crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for flightlogs operations.
#[derive(Error, Debug)]
pub enum Error {
    // === History Database Errors ===
    /// Failed to open or create the download history database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// A required setting is absent from the settings store.
    #[error("required setting '{key}' is not set")]
    MissingSetting {
        /// The settings key that was looked up.
        key: String,
    },

    // === Download Errors ===
    /// The removable storage mount point does not exist.
    #[error("mount point {path} does not exist; is the USB storage inserted?")]
    MountPointMissing {
        /// The expected mount point.
        path: PathBuf,
    },

    /// A download was requested while no storage is mounted.
    #[error("no removable storage mounted")]
    NotMounted,

    /// The selected file is not part of the current listing.
    #[error("unknown log file: {0}")]
    UnknownFile(String),

    /// Copying a log file to the removable storage failed.
    #[error("failed to copy {name}: {source}")]
    Transfer {
        /// Name of the log file.
        name: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for flightlogs operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a missing setting error.
    #[must_use]
    pub fn missing_setting(key: impl Into<String>) -> Self {
        Self::MissingSetting { key: key.into() }
    }

    /// Create a transfer error for the named file.
    #[must_use]
    pub fn transfer(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Transfer {
            name: name.into(),
            source,
        }
    }

    /// Check if this error comes from configuration and should abort startup.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigLoad(_) | Self::ConfigValidation { .. } | Self::MissingSetting { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotMounted;
        assert_eq!(err.to_string(), "no removable storage mounted");

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_missing_setting_display() {
        let err = Error::missing_setting("xcsoar.home");
        assert_eq!(err.to_string(), "required setting 'xcsoar.home' is not set");
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_transfer_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = Error::transfer("flight.igc", io_err);
        let msg = err.to_string();
        assert!(msg.contains("flight.igc"));
        assert!(msg.contains("no such file"));
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn test_mount_point_missing_display() {
        let err = Error::MountPointMissing {
            path: PathBuf::from("/usb/usbstick"),
        };
        assert!(err.to_string().contains("/usb/usbstick"));
    }

    #[test]
    fn test_unknown_file_display() {
        let err = Error::UnknownFile("#7".to_string());
        assert_eq!(err.to_string(), "unknown log file: #7");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_config_validation_is_configuration_error() {
        let err = Error::ConfigValidation {
            message: "poll_interval_ms must be greater than 0".to_string(),
        };
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("poll_interval_ms"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/usb/usbstick/logs"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("/usb/usbstick/logs"));
    }
}
