//! Flight log listing.
//!
//! Enumerates the recorder's log directory, describes each file and keeps the
//! ones the current [`DownloadFilter`] selects, newest first.

use std::collections::HashSet;
use std::fs::DirEntry;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::filter::DownloadFilter;

/// A log file found in the source directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    /// File name without directory.
    pub name: String,
    /// Lowercase extension including the leading dot, e.g. `.igc`.
    /// Empty when the name has no extension.
    pub file_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Whether this exact file was downloaded before.
    pub downloaded: bool,
}

impl FileInfo {
    /// Check whether this file passes the filter.
    ///
    /// The file type must be one of the selected extensions; with `new` set it
    /// must also not have been downloaded already.
    #[must_use]
    pub fn matches(&self, filter: &DownloadFilter) -> bool {
        let type_ok = (filter.igc && self.file_type == ".igc")
            || (filter.nmea && self.file_type == ".nmea");
        type_ok && !(filter.new && self.downloaded)
    }

    fn from_entry(entry: &DirEntry, ledger: &dyn DownloadLedger) -> std::io::Result<Option<Self>> {
        // Follows symlinks, so a link to a log is listed like the log itself.
        let metadata = std::fs::metadata(entry.path())?;
        if !metadata.is_file() {
            return Ok(None);
        }

        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(name = ?raw, "Skipping log file with a non UTF-8 name");
                return Ok(None);
            }
        };
        let modified: DateTime<Utc> = metadata.modified()?.into();
        let downloaded = ledger.is_downloaded(&name, &modified);
        Ok(Some(Self {
            file_type: file_type(&name),
            size: metadata.len(),
            modified,
            downloaded,
            name,
        }))
    }
}

/// Lowercase extension of `name` with its leading dot.
#[must_use]
pub fn file_type(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Answers whether a given file was downloaded before.
pub trait DownloadLedger {
    /// Check whether the file with this name and modification time was
    /// already copied to removable storage.
    fn is_downloaded(&self, name: &str, modified: &DateTime<Utc>) -> bool;
}

/// A ledger that has never seen a download.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl DownloadLedger for NoHistory {
    fn is_downloaded(&self, _name: &str, _modified: &DateTime<Utc>) -> bool {
        false
    }
}

impl DownloadLedger for HashSet<(String, DateTime<Utc>)> {
    fn is_downloaded(&self, name: &str, modified: &DateTime<Utc>) -> bool {
        self.contains(&(name.to_string(), *modified))
    }
}

/// List log files in `source_dir` that match `filter`, newest first.
///
/// Nothing is considered downloaded. A missing directory yields an empty list.
#[must_use]
pub fn list_logs(source_dir: &Path, filter: &DownloadFilter) -> Vec<FileInfo> {
    list_logs_with(source_dir, filter, &NoHistory)
}

/// List log files in `source_dir` that match `filter`, newest first,
/// consulting `ledger` for files that were downloaded before.
///
/// Read errors never propagate: a missing or unreadable directory yields an
/// empty list and unreadable entries are skipped.
#[must_use]
pub fn list_logs_with(
    source_dir: &Path,
    filter: &DownloadFilter,
    ledger: &dyn DownloadLedger,
) -> Vec<FileInfo> {
    if !source_dir.exists() {
        debug!("Log directory {} does not exist", source_dir.display());
        return Vec::new();
    }

    let entries = match std::fs::read_dir(source_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %source_dir.display(), error = %e, "Cannot read log directory");
            return Vec::new();
        }
    };

    let mut files: Vec<FileInfo> = entries
        .filter_map(|entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    return None;
                }
            };
            match FileInfo::from_entry(&entry, ledger) {
                Ok(info) => info,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Skipping log file");
                    None
                }
            }
        })
        .filter(|info| info.matches(filter))
        .collect();

    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    debug!(
        "Listed {} log files in {}",
        files.len(),
        source_dir.display()
    );
    files
}

/// Format a byte count with binary units, e.g. `512.0B` or `1.5KiB`.
#[must_use]
pub fn format_size(size: u64) -> String {
    // humansize prints whole bytes without decimals.
    if size < 1024 {
        return format!("{size}.0B");
    }
    let options = humansize::BINARY
        .decimal_places(1)
        .decimal_zeroes(1)
        .space_after_value(false);
    humansize::format_size(size, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, FileTimes};
    use std::time::{Duration, SystemTime};

    fn write_file(dir: &Path, name: &str, contents: &[u8], age_secs: u64) {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_times(FileTimes::new().set_modified(mtime))
            .unwrap();
    }

    fn sample_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.igc", b"AXXX", 300);
        write_file(dir.path(), "b.nmea", b"$GPRMC", 200);
        write_file(dir.path(), "c.txt", b"notes", 100);
        dir
    }

    fn names(files: &[FileInfo]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = list_logs(&dir.path().join("nope"), &DownloadFilter::default());
        assert!(files.is_empty());
    }

    #[test]
    fn test_igc_only() {
        let dir = sample_dir();
        let filter = DownloadFilter {
            new: false,
            igc: true,
            nmea: false,
        };
        assert_eq!(names(&list_logs(dir.path(), &filter)), vec!["a.igc"]);
    }

    #[test]
    fn test_igc_and_nmea_newest_first() {
        let dir = sample_dir();
        let filter = DownloadFilter {
            new: false,
            igc: true,
            nmea: true,
        };
        assert_eq!(
            names(&list_logs(dir.path(), &filter)),
            vec!["b.nmea", "a.igc"]
        );
    }

    #[test]
    fn test_no_types_selected_lists_nothing() {
        let dir = sample_dir();
        let filter = DownloadFilter {
            new: false,
            igc: false,
            nmea: false,
        };
        assert!(list_logs(dir.path(), &filter).is_empty());
    }

    #[test]
    fn test_extension_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "FLIGHT.IGC", b"A", 10);

        let files = list_logs(dir.path(), &DownloadFilter::default());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "FLIGHT.IGC");
        assert_eq!(files[0].file_type, ".igc");
    }

    #[test]
    fn test_file_info_fields() {
        let dir = sample_dir();
        let files = list_logs(dir.path(), &DownloadFilter::default());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, 4);
        assert!(!files[0].downloaded);
        assert!(files[0].modified < Utc::now());
    }

    #[test]
    fn test_subdirectories_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("old.igc")).unwrap();
        write_file(dir.path(), "new.igc", b"A", 10);

        assert_eq!(
            names(&list_logs(dir.path(), &DownloadFilter::default())),
            vec!["new.igc"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_log_listed() {
        let dir = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        write_file(target.path(), "x.igc", b"AXXX", 10);
        std::os::unix::fs::symlink(target.path().join("x.igc"), dir.path().join("link.igc"))
            .unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.igc"), dir.path().join("dangling.igc"))
            .unwrap();

        let files = list_logs(dir.path(), &DownloadFilter::default());
        assert_eq!(names(&files), vec!["link.igc"]);
        assert_eq!(files[0].size, 4);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_name_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(OsStr::from_bytes(b"fl\xffight.igc")), b"A").unwrap();
        write_file(dir.path(), "ok.igc", b"A", 10);

        assert_eq!(
            names(&list_logs(dir.path(), &DownloadFilter::default())),
            vec!["ok.igc"]
        );
    }

    #[test]
    fn test_ledger_marks_downloaded() {
        let dir = sample_dir();
        let listed = list_logs(dir.path(), &DownloadFilter::default());
        let mut ledger = HashSet::new();
        ledger.insert((listed[0].name.clone(), listed[0].modified));

        let only_new = list_logs_with(dir.path(), &DownloadFilter::default(), &ledger);
        assert!(only_new.is_empty());

        let everything = DownloadFilter {
            new: false,
            ..DownloadFilter::default()
        };
        let all = list_logs_with(dir.path(), &everything, &ledger);
        assert_eq!(all.len(), 1);
        assert!(all[0].downloaded);
    }

    #[test]
    fn test_ledger_ignores_rewritten_file() {
        let dir = sample_dir();
        let listed = list_logs(dir.path(), &DownloadFilter::default());
        let mut ledger = HashSet::new();
        ledger.insert((listed[0].name.clone(), listed[0].modified));

        write_file(dir.path(), "a.igc", b"AXXXB", 5);
        let files = list_logs_with(dir.path(), &DownloadFilter::default(), &ledger);
        assert_eq!(names(&files), vec!["a.igc"]);
        assert!(!files[0].downloaded);
    }

    #[test]
    fn test_file_type() {
        assert_eq!(file_type("a.IGC"), ".igc");
        assert_eq!(file_type("log.2024.nmea"), ".nmea");
        assert_eq!(file_type("README"), "");
    }

    #[test]
    fn test_matches() {
        let info = FileInfo {
            name: "x.nmea".to_string(),
            file_type: ".nmea".to_string(),
            size: 1,
            modified: Utc::now(),
            downloaded: true,
        };
        let mut filter = DownloadFilter {
            new: false,
            igc: false,
            nmea: true,
        };
        assert!(info.matches(&filter));
        filter.new = true;
        assert!(!info.matches(&filter));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0.0B");
        assert_eq!(format_size(512), "512.0B");
        assert_eq!(format_size(1536), "1.5KiB");
        assert!(format_size(5 * 1024 * 1024).ends_with("MiB"));
        assert!(format_size(3 * 1024 * 1024 * 1024 * 1024).ends_with("TiB"));
    }
}
