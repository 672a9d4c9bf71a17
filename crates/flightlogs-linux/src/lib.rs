//! Linux-specific implementation for flightlogs
//!
//! Removable media on the flight computer is mounted with the page cache in
//! front of it, so copied logs may still sit in memory when the pilot pulls
//! the stick. This crate exposes the primitive that forces them out.

#![cfg(target_os = "linux")]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use tracing::debug;

/// Flush all buffered filesystem writes to stable storage.
///
/// Blocks until the kernel has scheduled every dirty buffer for writeback,
/// matching `sync(2)` semantics.
pub fn sync_filesystems() {
    debug!("Flushing filesystem buffers");
    nix::unistd::sync();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_filesystems_does_not_panic() {
        sync_filesystems();
    }
}
