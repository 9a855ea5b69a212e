//! Filesystem change subscription for the configuration file.
//!
//! Watches the file's parent directory rather than the file itself, because
//! editors and deployment tools commonly rewrite via rename and the watch
//! must survive the inode swap. Events are filtered back down to the one
//! file of interest and forwarded without debouncing: every change delivers
//! its own notification, and the reload loop applies them in arrival order.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::{ConfigError, Result};

/// A single change notification for the watched file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Path of the configuration file that changed.
    pub path: PathBuf,
}

/// Cancellable handle to a live file-watch subscription.
///
/// The subscription stays registered for the lifetime of the handle and
/// survives any number of notifications. Dropping the handle releases the
/// underlying filesystem watch.
#[derive(Debug)]
pub struct WatchHandle {
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    _watcher: RecommendedWatcher,
}

impl WatchHandle {
    /// Wait for the next change to the configuration file.
    ///
    /// Returns `None` once the subscription has shut down.
    pub async fn wait_for_change(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }
}

/// Subscribe to content changes of `path`.
///
/// Failing to establish the subscription is an error the caller must treat
/// as fatal; a silently missing watch would break the hot-reload contract.
pub fn watch_file(path: &Path) -> Result<WatchHandle> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .ok_or_else(|| ConfigError::Watch {
            source: notify::Error::generic("config file path has no parent directory"),
        })?;
    let file_name: OsString = path
        .file_name()
        .ok_or_else(|| ConfigError::Watch {
            source: notify::Error::generic("config file path has no file name"),
        })?
        .to_os_string();

    let (tx, rx) = mpsc::unbounded_channel();
    let watched = path.to_path_buf();

    // The callback runs on notify's own thread; an unbounded send never
    // blocks it.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !is_relevant(&event, file_name.as_os_str()) {
                    return;
                }
                debug!(kind = ?event.kind, "config file event");
                // Receiver dropped means the subscription was cancelled.
                let _ = tx.send(ChangeEvent {
                    path: watched.clone(),
                });
            }
            Err(e) => error!("config file watcher error: {e}"),
        },
        notify::Config::default(),
    )?;

    watcher.watch(&parent, RecursiveMode::NonRecursive)?;
    info!("watching config file: {}", path.display());

    Ok(WatchHandle {
        events: rx,
        _watcher: watcher,
    })
}

/// Whether an event should be forwarded as a change to the watched file.
///
/// A path-less notification (backend rescan, queue overflow) may stand in
/// for events that were dropped, so it is forwarded too; re-reading the file
/// resynchronizes the aggregate after a missed-event window.
fn is_relevant(event: &Event, file_name: &std::ffi::OsStr) -> bool {
    if event.paths.is_empty() {
        return true;
    }
    is_content_change(&event.kind)
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name))
}

/// Creates and modifies both count as content changes; a rename-into-place
/// surfaces as either depending on the platform backend.
fn is_content_change(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}
