//! Removable storage detection.
//!
//! The flight computer has no mount notifications we can rely on, so the
//! watcher simply polls for the mount point to exist. Transitions between the
//! two observed states are reported to subscribers; repeated observations of
//! the same state are not.
//!
//! Handlers run synchronously inside the polling step, in registration order.
//! The only suspension point of the loop is the wait between polls, which is
//! also where cancellation takes effect.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Default interval between mount point checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Last observed state of the mount point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MountState {
    /// Mount point absent.
    #[default]
    Unmounted,
    /// Mount point present.
    Mounted,
}

/// A transition of the mount point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountEvent {
    /// Storage appeared.
    Mounted,
    /// Storage disappeared.
    Unmounted,
}

impl fmt::Display for MountEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mounted => write!(f, "mounted"),
            Self::Unmounted => write!(f, "unmounted"),
        }
    }
}

type Handler = Box<dyn FnMut() + Send>;

/// Polls a path and notifies subscribers when it appears or disappears.
pub struct MountWatcher {
    mount_path: PathBuf,
    interval: Duration,
    state: MountState,
    mount_handlers: Vec<Handler>,
    unmount_handlers: Vec<Handler>,
}

impl fmt::Debug for MountWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountWatcher")
            .field("mount_path", &self.mount_path)
            .field("interval", &self.interval)
            .field("state", &self.state)
            .field("mount_handlers", &self.mount_handlers.len())
            .field("unmount_handlers", &self.unmount_handlers.len())
            .finish()
    }
}

impl MountWatcher {
    /// Create a watcher for `mount_path`, initially [`MountState::Unmounted`].
    #[must_use]
    pub fn new(mount_path: impl Into<PathBuf>) -> Self {
        Self {
            mount_path: mount_path.into(),
            interval: DEFAULT_POLL_INTERVAL,
            state: MountState::Unmounted,
            mount_handlers: Vec::new(),
            unmount_handlers: Vec::new(),
        }
    }

    /// Use a different polling interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// The watched path.
    #[must_use]
    pub fn mount_path(&self) -> &Path {
        &self.mount_path
    }

    /// The last observed state.
    #[must_use]
    pub fn state(&self) -> MountState {
        self.state
    }

    /// Register a handler for storage appearing.
    pub fn on_mount(&mut self, handler: impl FnMut() + Send + 'static) {
        self.mount_handlers.push(Box::new(handler));
    }

    /// Register a handler for storage disappearing.
    pub fn on_unmount(&mut self, handler: impl FnMut() + Send + 'static) {
        self.unmount_handlers.push(Box::new(handler));
    }

    /// Forward every transition as a [`MountEvent`] over a channel.
    ///
    /// The receiver sees events in the order they were detected. The channel
    /// closes once the watcher is dropped.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<MountEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let unmount_tx = tx.clone();
        self.on_mount(move || {
            let _ = tx.send(MountEvent::Mounted);
        });
        self.on_unmount(move || {
            let _ = unmount_tx.send(MountEvent::Unmounted);
        });
        rx
    }

    /// Check the mount point once and fire handlers on a transition.
    ///
    /// Returns the transition, if any.
    pub fn poll_once(&mut self) -> Option<MountEvent> {
        let present = self.mount_path.exists();
        trace!(path = %self.mount_path.display(), present, "Polled mount point");

        let event = match (self.state, present) {
            (MountState::Unmounted, true) => MountEvent::Mounted,
            (MountState::Mounted, false) => MountEvent::Unmounted,
            _ => return None,
        };

        info!(path = %self.mount_path.display(), "Storage {}", event);
        let handlers = match event {
            MountEvent::Mounted => {
                self.state = MountState::Mounted;
                &mut self.mount_handlers
            }
            MountEvent::Unmounted => {
                self.state = MountState::Unmounted;
                &mut self.unmount_handlers
            }
        };
        for handler in handlers.iter_mut() {
            handler();
        }
        Some(event)
    }

    /// Poll until `stop` turns `true` or its sender is dropped.
    ///
    /// The stop signal is checked before every poll, so no handler fires once
    /// the loop has observed it.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        debug!(
            path = %self.mount_path.display(),
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "Mount watcher started"
        );
        loop {
            if *stop.borrow_and_update() {
                break;
            }
            self.poll_once();

            tokio::select! {
                biased;
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                () = tokio::time::sleep(self.interval) => {}
            }
        }
        debug!(path = %self.mount_path.display(), "Mount watcher stopped");
    }

    /// Run the polling loop as a background task.
    #[must_use]
    pub fn spawn(self) -> WatchHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(stop_rx));
        WatchHandle { stop_tx, task }
    }
}

/// Controls a spawned [`MountWatcher`].
///
/// Dropping the handle also stops the watcher.
#[derive(Debug)]
pub struct WatchHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Ask the watcher to stop at its next suspension point.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Stop the watcher and wait for it to exit.
    ///
    /// Once this returns, no handler will fire again.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.task.await {
            debug!(error = %e, "Mount watcher task ended abnormally");
        }
    }
}
