//! Download history for flightlogs.
//!
//! This module provides `SQLite`-based persistent storage of which log files
//! were already copied to removable storage, so the "new logs" filter has
//! something to work with across sessions and reboots.
//!
//! A download is identified by file name *and* modification time: a log that
//! is rewritten after it was downloaded shows up as new again.

pub mod migrations;
pub mod schema;

use std::cell::Cell;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{DownloadLedger, FileInfo};
use crate::error::{Error, Result};

/// A previously downloaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRecord {
    /// File name.
    pub name: String,
    /// Modification time of the file when it was downloaded.
    pub modified: DateTime<Utc>,
    /// Size in bytes when it was downloaded.
    pub size: u64,
    /// When the download happened.
    pub downloaded_at: DateTime<Utc>,
}

/// Persistent record of downloaded log files.
#[derive(Debug)]
pub struct DownloadHistory {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
    /// Set once a lookup failed, so the warning is logged only once.
    lookup_failed: Cell<bool>,
}

fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

impl DownloadHistory {
    /// Open or create a history database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening download history at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        info!("Download history opened at {}", path.display());
        Ok(Self {
            path,
            conn,
            lookup_failed: Cell::new(false),
        })
    }

    /// Create an in-memory history for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
            lookup_failed: Cell::new(false),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a completed download.
    ///
    /// Returns `false` if this exact file was already recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn record(&self, file: &FileInfo) -> Result<bool> {
        let size = i64::try_from(file.size).unwrap_or(i64::MAX);
        let affected = self.conn.execute(
            r"
            INSERT OR IGNORE INTO downloads (name, modified, size, downloaded_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                file.name,
                timestamp(&file.modified),
                size,
                timestamp(&Utc::now())
            ],
        )?;

        if affected > 0 {
            debug!("Recorded download of {}", file.name);
        }
        Ok(affected > 0)
    }

    /// Check whether the file with this name and modification time was downloaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn contains(&self, name: &str, modified: &DateTime<Utc>) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM downloads WHERE name = ?1 AND modified = ?2",
            params![name, timestamp(modified)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Count recorded downloads.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM downloads", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get the most recent downloads.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent(&self, limit: usize) -> Result<Vec<DownloadRecord>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT name, modified, size, downloaded_at
            FROM downloads ORDER BY id DESC LIMIT ?1
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map([limit_i64], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Forget every recorded download of the named file.
    ///
    /// Returns the number of records removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn forget(&self, name: &str) -> Result<usize> {
        let affected = self
            .conn
            .execute("DELETE FROM downloads WHERE name = ?1", [name])?;
        Ok(affected)
    }

    /// Forget all downloads.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear(&self) -> Result<usize> {
        let affected = self.conn.execute("DELETE FROM downloads", [])?;
        if affected > 0 {
            info!("Cleared {} download records", affected);
        }
        Ok(affected)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<DownloadRecord> {
        let name: String = row.get(0)?;
        let modified: String = row.get(1)?;
        let size: i64 = row.get(2)?;
        let downloaded_at: String = row.get(3)?;

        let parse = |s: &str| {
            DateTime::parse_from_rfc3339(s).map_or_else(
                |_| {
                    warn!("Unparseable timestamp in history: {}", s);
                    DateTime::<Utc>::default()
                },
                |dt| dt.with_timezone(&Utc),
            )
        };

        Ok(DownloadRecord {
            modified: parse(&modified),
            downloaded_at: parse(&downloaded_at),
            size: u64::try_from(size).unwrap_or(0),
            name,
        })
    }
}

impl DownloadLedger for DownloadHistory {
    fn is_downloaded(&self, name: &str, modified: &DateTime<Utc>) -> bool {
        match self.contains(name, modified) {
            Ok(found) => found,
            Err(e) => {
                if !self.lookup_failed.replace(true) {
                    warn!(error = %e, "Download history lookup failed, treating files as new");
                }
                false
            }
        }
    }
}
