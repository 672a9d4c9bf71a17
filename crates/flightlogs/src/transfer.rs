//! Copying log files to removable storage.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::catalog::FileInfo;
use crate::error::{Error, Result};

/// Name of the directory under the mount point that receives the logs.
pub const DEST_DIR_NAME: &str = "logs";

/// Destination directory for logs on the storage mounted at `mount_dir`.
#[must_use]
pub fn dest_dir(mount_dir: &Path) -> PathBuf {
    mount_dir.join(DEST_DIR_NAME)
}

/// Copy `file` from `source_dir` to `<mount_dir>/logs/`, keeping its name.
///
/// An existing file with the same name is overwritten. Returns the path of
/// the copy. The copy may still be buffered afterwards; call [`flush`] before
/// telling the user it is safe to remove the storage.
///
/// # Errors
///
/// - [`Error::MountPointMissing`] if `mount_dir` does not exist. Storage is
///   never created at the top level.
/// - [`Error::DirectoryCreate`] if the `logs` directory cannot be created.
/// - [`Error::Transfer`] if the source is gone or the destination cannot be
///   written.
pub fn download(file: &FileInfo, source_dir: &Path, mount_dir: &Path) -> Result<PathBuf> {
    if !mount_dir.is_dir() {
        return Err(Error::MountPointMissing {
            path: mount_dir.to_path_buf(),
        });
    }

    let logs_dir = dest_dir(mount_dir);
    std::fs::create_dir_all(&logs_dir).map_err(|source| Error::DirectoryCreate {
        path: logs_dir.clone(),
        source,
    })?;

    let src = source_dir.join(&file.name);
    let dest = logs_dir.join(&file.name);
    debug!("Copying {} to {}", src.display(), dest.display());
    let bytes = std::fs::copy(&src, &dest).map_err(|e| Error::transfer(&file.name, e))?;

    info!(file = %file.name, bytes, "Downloaded log to {}", logs_dir.display());
    Ok(dest)
}

/// Force buffered writes out to stable storage.
pub fn flush() {
    #[cfg(target_os = "linux")]
    flightlogs_linux::sync_filesystems();

    #[cfg(not(target_os = "linux"))]
    debug!("No filesystem flush available on this platform");
}
