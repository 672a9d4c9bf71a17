//! The download workflow.
//!
//! [`DownloadCoordinator`] owns the filter, the settings store, the download
//! history and the view. It reacts to mount events from a [`MountWatcher`]
//! and to user commands, one at a time, on a single task:
//!
//! - storage appears: list logs and show them
//! - storage disappears: show the "insert storage" placeholder
//! - a filter option changes: persist it and list again
//! - a file is selected: copy it, mark the row, flush to stable storage

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::catalog::{self, FileInfo};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::{DownloadFilter, FilterField, FILTER_SETTINGS_KEY};
use crate::mount::{MountEvent, MountState, MountWatcher, WatchHandle};
use crate::settings::{self, SettingsStore, XCSOAR_HOME_KEY};
use crate::storage::DownloadHistory;
use crate::transfer;

/// Name of the log directory inside the flight software home.
const LOGS_DIR_NAME: &str = "logs";

/// Directory holding the flight logs: `<xcsoar.home>/logs`.
///
/// # Errors
///
/// Returns [`Error::MissingSetting`] if the home directory is not configured.
pub fn log_source_dir(config: &Config, settings: &dyn SettingsStore) -> Result<PathBuf> {
    let home = settings::get_path(settings, XCSOAR_HOME_KEY)?;
    Ok(config.resolve(home).join(LOGS_DIR_NAME))
}

/// The filter persisted in `settings`, or the default one.
#[must_use]
pub fn saved_filter(settings: &dyn SettingsStore) -> DownloadFilter {
    settings
        .get(FILTER_SETTINGS_KEY)
        .map(|v| DownloadFilter::from_mapping(&v))
        .unwrap_or_default()
}

/// Store `filter` in `settings` and save them.
///
/// # Errors
///
/// Returns an error if the settings cannot be saved.
pub fn save_filter(settings: &mut dyn SettingsStore, filter: &DownloadFilter) -> Result<()> {
    settings.set(
        FILTER_SETTINGS_KEY,
        serde_json::Value::Object(filter.to_mapping()),
    );
    settings.save()
}

/// Outcome of a download, shown next to the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    /// Copied and flushed.
    Done,
    /// Copy failed; the message says why.
    Failed(String),
}

/// What the user sees. Implemented by the UI layer.
pub trait DownloadView {
    /// Show the "please insert USB storage" placeholder.
    fn show_waiting(&mut self);

    /// Show the filter options and the list of files.
    ///
    /// `files` may be empty; the view should then say that no logs matched.
    fn show_files(&mut self, filter: &DownloadFilter, files: &[FileInfo]);

    /// Update the status indicator of the row at `index`.
    fn set_status(&mut self, index: usize, status: &TransferStatus);

    /// Tell the user something went wrong.
    fn show_error(&mut self, message: &str);
}

/// Input from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    /// Flip a filter option.
    Toggle(FilterField),
    /// Set a filter option.
    SetFilter(FilterField, bool),
    /// Download the file at this row of the current listing.
    Select(usize),
    /// List the files again.
    Refresh,
    /// Leave the download screen.
    Quit,
}

/// Drives the flight log download workflow.
#[derive(Debug)]
pub struct DownloadCoordinator<S, V> {
    source_dir: PathBuf,
    mount_dir: PathBuf,
    poll_interval: Duration,
    filter: DownloadFilter,
    settings: S,
    history: DownloadHistory,
    view: V,
    state: MountState,
    files: Vec<FileInfo>,
}

impl<S: SettingsStore, V: DownloadView> DownloadCoordinator<S, V> {
    /// Set up the workflow.
    ///
    /// Reads the flight software home from the settings store and restores
    /// the persisted filter, falling back to defaults for anything missing or
    /// malformed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSetting`] if the home directory is not configured.
    pub fn new(config: &Config, settings: S, history: DownloadHistory, view: V) -> Result<Self> {
        let source_dir = log_source_dir(config, &settings)?;
        let filter = saved_filter(&settings);

        debug!(
            source = %source_dir.display(),
            mount = %config.mount_point().display(),
            ?filter,
            "Download coordinator ready"
        );

        Ok(Self {
            source_dir,
            mount_dir: config.mount_point(),
            poll_interval: config.poll_interval(),
            filter,
            settings,
            history,
            view,
            state: MountState::Unmounted,
            files: Vec::new(),
        })
    }

    /// Start watching for storage.
    ///
    /// Shows the placeholder and spawns a [`MountWatcher`] whose events are
    /// delivered on the returned receiver. Pass it to [`Self::run`].
    #[must_use]
    pub fn activate(&mut self) -> (WatchHandle, mpsc::UnboundedReceiver<MountEvent>) {
        self.view.show_waiting();
        let mut watcher = MountWatcher::new(&self.mount_dir).with_interval(self.poll_interval);
        let events = watcher.subscribe();
        (watcher.spawn(), events)
    }

    /// Process events and commands until [`UserCommand::Quit`] or the
    /// command channel closes.
    ///
    /// Failures of single commands are reported to the view and the loop
    /// carries on.
    pub async fn run(
        &mut self,
        mut events: mpsc::UnboundedReceiver<MountEvent>,
        mut commands: mpsc::Receiver<UserCommand>,
    ) {
        loop {
            tokio::select! {
                Some(event) = events.recv() => self.handle_mount_event(event),
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if self.handle_command(command).is_break() {
                        break;
                    }
                }
            }
        }
        debug!("Download coordinator stopped");
    }

    /// React to storage appearing or disappearing.
    pub fn handle_mount_event(&mut self, event: MountEvent) {
        match event {
            MountEvent::Mounted => {
                self.state = MountState::Mounted;
                self.refresh();
            }
            MountEvent::Unmounted => {
                self.state = MountState::Unmounted;
                self.files.clear();
                self.view.show_waiting();
            }
        }
    }

    /// Apply one user command.
    pub fn handle_command(&mut self, command: UserCommand) -> ControlFlow<()> {
        let result = match command {
            UserCommand::Quit => return ControlFlow::Break(()),
            UserCommand::Refresh => {
                self.refresh();
                Ok(())
            }
            UserCommand::Toggle(field) => self.toggle_filter(field, !self.filter.get(field)),
            UserCommand::SetFilter(field, value) => self.toggle_filter(field, value),
            UserCommand::Select(index) => self.select_file(index).map(|_| ()),
        };

        if let Err(e) = result {
            warn!(error = %e, ?command, "Command failed");
            self.view.show_error(&e.to_string());
        }
        ControlFlow::Continue(())
    }

    /// Change a filter option, persist it and list again.
    ///
    /// The in-memory filter changes and the listing is refreshed even if
    /// saving fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be saved.
    pub fn toggle_filter(&mut self, field: FilterField, value: bool) -> Result<()> {
        self.filter.set(field, value);
        info!(field = %field, value, "Filter changed");

        let saved = save_filter(&mut self.settings, &self.filter);
        self.refresh();
        saved
    }

    /// Download the file shown at `index`.
    ///
    /// On success the row is marked done, the download is recorded in the
    /// history and buffered writes are flushed. On a copy failure the row is
    /// marked failed. The listing itself is left alone so row indices stay
    /// valid until the next refresh.
    ///
    /// # Errors
    ///
    /// - [`Error::NotMounted`] if no storage is present.
    /// - [`Error::UnknownFile`] if `index` is outside the listing.
    /// - Any error from [`transfer::download`].
    pub fn select_file(&mut self, index: usize) -> Result<PathBuf> {
        if self.state != MountState::Mounted {
            return Err(Error::NotMounted);
        }
        let file = self
            .files
            .get(index)
            .ok_or_else(|| Error::UnknownFile(format!("#{}", index + 1)))?;

        match transfer::download(file, &self.source_dir, &self.mount_dir) {
            Ok(dest) => {
                self.view.set_status(index, &TransferStatus::Done);
                transfer::flush();
                if let Err(e) = self.history.record(file) {
                    warn!(file = %file.name, error = %e, "Could not record download");
                }
                Ok(dest)
            }
            Err(e) => {
                warn!(file = %file.name, error = %e, "Download failed");
                self.view
                    .set_status(index, &TransferStatus::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// List the logs again and show them.
    pub fn refresh(&mut self) {
        if self.state != MountState::Mounted {
            return;
        }
        self.files = catalog::list_logs_with(&self.source_dir, &self.filter, &self.history);
        self.view.show_files(&self.filter, &self.files);
    }

    /// The current filter.
    #[must_use]
    pub fn filter(&self) -> &DownloadFilter {
        &self.filter
    }

    /// The files currently shown.
    #[must_use]
    pub fn files(&self) -> &[FileInfo] {
        &self.files
    }

    /// The last known storage state.
    #[must_use]
    pub fn state(&self) -> MountState {
        self.state
    }

    /// Directory the logs are read from.
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Where removable storage appears.
    #[must_use]
    pub fn mount_dir(&self) -> &Path {
        &self.mount_dir
    }

    /// The view.
    #[must_use]
    pub fn view(&self) -> &V {
        &self.view
    }

    /// The settings store.
    #[must_use]
    pub fn settings(&self) -> &S {
        &self.settings
    }

    /// The download history.
    #[must_use]
    pub fn history(&self) -> &DownloadHistory {
        &self.history
    }
}
