//! Command-line interface for flightlogs.
//!
//! This module provides the CLI structure and the console front end for the
//! `flogs` binary.

mod commands;
mod view;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DownloadCommand, FilterCommand, HistoryCommand, ListCommand, SettingsCommand,
    Switch, WatchCommand,
};
pub use view::{parse_command, ConsoleView, HELP};

/// flogs - Copy flight logs to USB storage
///
/// Watches for removable storage and copies IGC and NMEA flight logs from
/// the flight computer onto it.
#[derive(Debug, Parser)]
#[command(name = "flogs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Wait for USB storage and download logs interactively
    Watch(WatchCommand),

    /// List log files matching the saved filter
    List(ListCommand),

    /// Copy log files to the mounted USB storage
    Download(DownloadCommand),

    /// View or change the saved filter
    #[command(subcommand)]
    Filter(FilterCommand),

    /// View or edit the download history
    #[command(subcommand)]
    History(HistoryCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Read or write the settings store
    #[command(subcommand)]
    Settings(SettingsCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}
