//! `flightlogs` - Copy flight logs from a flight computer to USB storage
//!
//! This library provides the download workflow of the file manager: it waits
//! for removable storage to appear, lists IGC and NMEA logs according to a
//! persisted filter, copies selected logs onto the storage and remembers what
//! was already downloaded.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod filter;
pub mod logging;
pub mod mount;
pub mod settings;
pub mod storage;
pub mod transfer;

pub use catalog::{list_logs, FileInfo};
pub use config::Config;
pub use coordinator::{DownloadCoordinator, DownloadView, TransferStatus, UserCommand};
pub use error::{Error, Result};
pub use filter::{DownloadFilter, FilterField};
pub use logging::init_logging;
pub use mount::{MountEvent, MountWatcher};
pub use settings::{JsonSettings, SettingsStore};
pub use storage::DownloadHistory;
