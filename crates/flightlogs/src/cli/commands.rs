//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::filter::FilterField;

/// Watch command arguments.
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Override the mount point to watch
    #[arg(short, long, value_name = "DIR")]
    pub mount_point: Option<PathBuf>,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Include files that were already downloaded
    #[arg(short, long)]
    pub all: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Download command arguments.
#[derive(Debug, Args)]
pub struct DownloadCommand {
    /// Names of the log files to copy
    #[arg(required = true, value_name = "NAME")]
    pub names: Vec<String>,
}

/// Filter commands.
#[derive(Debug, Subcommand)]
pub enum FilterCommand {
    /// Show the saved filter
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Change one filter option
    Set {
        /// Option to change (new, igc, nmea)
        field: FilterField,

        /// New value
        #[arg(value_enum)]
        value: Switch,
    },
}

/// Download history commands.
#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// Show recent downloads
    Show {
        /// Maximum number of entries
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Forget downloads of a file so it counts as new again
    Forget {
        /// Log file name
        name: String,
    },

    /// Forget all downloads
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Settings store commands.
#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Print a setting
    Get {
        /// Settings key, e.g. xcsoar.home
        key: String,
    },

    /// Change a setting
    Set {
        /// Settings key, e.g. xcsoar.home
        key: String,

        /// Value; parsed as JSON, otherwise stored as a string
        value: String,
    },
}

/// An on/off switch argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    /// Enable
    On,
    /// Disable
    Off,
}

impl From<Switch> for bool {
    fn from(switch: Switch) -> Self {
        matches!(switch, Switch::On)
    }
}
