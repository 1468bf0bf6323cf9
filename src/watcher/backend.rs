//! Directory-scoped change notification backends.
//!
//! A backend turns "subscribe to directory D" into a stream of [`FileEvent`]s
//! delivered through an [`EventSink`]. Dropping the returned [`Subscription`]
//! releases the underlying OS resource.
//!
//! - [`NotifyBackend`]: native notifications (`inotify`, FSEvents,
//!   `ReadDirectoryChangesW`) or a polling fallback, both via `notify`.
//! - [`ManualBackend`]: events pushed by the embedding application, for hosts
//!   that already own a notification source and for tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::Sender;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use super::error::WatchError;

/// A change observed inside a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// Content, size, or existence of a file changed (created, written, deleted).
    Changed(PathBuf),
    /// A file was renamed from `from` to `to`.
    Renamed { from: PathBuf, to: PathBuf },
}

/// Messages consumed by the watch worker.
#[derive(Debug)]
pub(crate) enum WorkerMsg {
    Event(FileEvent),
    Error(WatchError),
    Shutdown,
}

/// Where backends deliver events. Cheap to clone.
///
/// Once the owning subsystem is shut down, events are dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<WorkerMsg>,
    alive: Arc<AtomicBool>,
}

impl EventSink {
    pub(crate) fn new(tx: Sender<WorkerMsg>, alive: Arc<AtomicBool>) -> Self {
        Self { tx, alive }
    }

    /// Deliver an event. Returns `false` if the subsystem is gone.
    pub fn emit(&self, event: FileEvent) -> bool {
        self.alive.load(Ordering::Acquire) && self.tx.send(WorkerMsg::Event(event)).is_ok()
    }

    /// Report a backend error (logged by the worker).
    pub fn error(&self, details: impl Into<String>) -> bool {
        let error = WatchError::EventError {
            details: details.into(),
        };
        self.alive.load(Ordering::Acquire) && self.tx.send(WorkerMsg::Error(error)).is_ok()
    }
}

/// An active directory subscription. Dropping it stops notifications.
pub trait Subscription: Send {
    fn directory(&self) -> &Path;
}

/// Source of directory change notifications.
pub trait WatchBackend: Send {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Start observing `dir` (non-recursively) and deliver events to `sink`.
    fn subscribe(
        &mut self,
        dir: &Path,
        sink: EventSink,
    ) -> Result<Box<dyn Subscription>, WatchError>;
}

/// How [`NotifyBackend`] observes directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMode {
    /// The platform's native notification facility.
    Native,
    /// Periodic directory scans.
    Poll(Duration),
}

/// Backend built on the `notify` crate; one watcher per directory.
#[derive(Debug, Clone, Copy)]
pub struct NotifyBackend {
    mode: NotifyMode,
}

impl NotifyBackend {
    pub fn new(mode: NotifyMode) -> Self {
        Self { mode }
    }

    pub fn native() -> Self {
        Self::new(NotifyMode::Native)
    }

    pub fn poll(interval: Duration) -> Self {
        Self::new(NotifyMode::Poll(interval))
    }
}

impl Default for NotifyBackend {
    fn default() -> Self {
        Self::native()
    }
}

struct NotifySubscription {
    dir: PathBuf,
    /// Kept alive for the lifetime of the subscription.
    _watcher: Box<dyn Watcher + Send>,
}

impl Subscription for NotifySubscription {
    fn directory(&self) -> &Path {
        &self.dir
    }
}

impl WatchBackend for NotifyBackend {
    fn name(&self) -> &str {
        match self.mode {
            NotifyMode::Native => "native",
            NotifyMode::Poll(_) => "poll",
        }
    }

    fn subscribe(
        &mut self,
        dir: &Path,
        sink: EventSink,
    ) -> Result<Box<dyn Subscription>, WatchError> {
        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for file_event in translate(event) {
                    sink.emit(file_event);
                }
            }
            Err(e) => {
                sink.error(e.to_string());
            }
        };

        let path_failed = |e: notify::Error| WatchError::PathWatchFailed {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        };

        let mut watcher: Box<dyn Watcher + Send> = match self.mode {
            NotifyMode::Native => Box::new(notify::recommended_watcher(handler)?),
            NotifyMode::Poll(interval) => {
                let config = notify::Config::default().with_poll_interval(interval);
                Box::new(PollWatcher::new(handler, config)?)
            }
        };
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(path_failed)?;

        Ok(Box::new(NotifySubscription {
            dir: dir.to_path_buf(),
            _watcher: watcher,
        }))
    }
}

/// Map a raw `notify` event to the events the store cares about.
///
/// Access events are dropped. A rename reported with both paths becomes
/// [`FileEvent::Renamed`]; a half rename (only the old or only the new name)
/// is a plain change of that path.
pub fn translate(event: Event) -> Vec<FileEvent> {
    match event.kind {
        EventKind::Access(_) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            let mut paths = event.paths.into_iter();
            match (paths.next(), paths.next()) {
                (Some(from), Some(to)) => vec![FileEvent::Renamed { from, to }],
                _ => Vec::new(),
            }
        }
        _ => event.paths.into_iter().map(FileEvent::Changed).collect(),
    }
}

/// Backend whose events are pushed by hand through a [`ManualEmitter`].
#[derive(Debug, Clone, Default)]
pub struct ManualBackend {
    shared: Arc<ManualShared>,
}

#[derive(Debug, Default)]
struct ManualShared {
    sinks: Mutex<HashMap<PathBuf, EventSink>>,
    subscribe_calls: Mutex<Vec<PathBuf>>,
}

/// Handle for injecting events into a [`ManualBackend`].
#[derive(Debug, Clone)]
pub struct ManualEmitter {
    shared: Arc<ManualShared>,
}

struct ManualSubscription {
    dir: PathBuf,
    shared: Arc<ManualShared>,
}

impl Subscription for ManualSubscription {
    fn directory(&self) -> &Path {
        &self.dir
    }
}

impl Drop for ManualSubscription {
    fn drop(&mut self) {
        self.shared.sinks.lock().remove(&self.dir);
    }
}

impl ManualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitter(&self) -> ManualEmitter {
        ManualEmitter {
            shared: self.shared.clone(),
        }
    }
}

impl WatchBackend for ManualBackend {
    fn name(&self) -> &str {
        "manual"
    }

    fn subscribe(
        &mut self,
        dir: &Path,
        sink: EventSink,
    ) -> Result<Box<dyn Subscription>, WatchError> {
        self.shared.subscribe_calls.lock().push(dir.to_path_buf());
        self.shared.sinks.lock().insert(dir.to_path_buf(), sink);
        Ok(Box::new(ManualSubscription {
            dir: dir.to_path_buf(),
            shared: self.shared.clone(),
        }))
    }
}

impl ManualEmitter {
    /// Deliver `event` to the subscription covering its directory.
    ///
    /// Returns `false` when no live subscription covers the path.
    pub fn emit(&self, event: FileEvent) -> bool {
        let path = match &event {
            FileEvent::Changed(path) => path,
            FileEvent::Renamed { to, .. } => to,
        };
        let Some(dir) = path.parent() else {
            return false;
        };
        let sink = self.shared.sinks.lock().get(dir).cloned();
        sink.is_some_and(|sink| sink.emit(event))
    }

    /// Shorthand for a change event on `path`.
    pub fn changed(&self, path: impl Into<PathBuf>) -> bool {
        self.emit(FileEvent::Changed(path.into()))
    }

    /// Directories with a live subscription.
    pub fn active_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.shared.sinks.lock().keys().cloned().collect();
        dirs.sort();
        dirs
    }

    /// Every directory ever passed to `subscribe`, in call order.
    pub fn subscribe_calls(&self) -> Vec<PathBuf> {
        self.shared.subscribe_calls.lock().clone()
    }
}
