//! Watch subsystem: directory subscriptions plus the debounced reload worker.
//!
//! ```text
//! backend callbacks ──▶ EventSink ──▶ channel ──▶ worker thread
//!                                                  │  Debouncer (path -> last event)
//!                                                  ▼
//!                                   ReloadHandler::on_modify / on_rename_away
//! ```
//!
//! The worker sleeps until the earliest pending file has been quiet for the
//! debounce interval, then hands it to the handler. Every reload therefore
//! goes through the same store path as an explicit load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use super::backend::{EventSink, FileEvent, Subscription, WatchBackend, WorkerMsg};
use super::debouncer::Debouncer;
use super::error::WatchError;
use super::handler::{ReloadEvent, ReloadHandler, ReloadHook, ReloadOutcome};
use super::path_registry::PathRegistry;

/// Live watch state owned by a store.
pub struct WatchSubsystem {
    backend: Mutex<Box<dyn WatchBackend>>,
    registry: Arc<Mutex<PathRegistry>>,
    subscriptions: Mutex<HashMap<PathBuf, Box<dyn Subscription>>>,
    tx: Sender<WorkerMsg>,
    alive: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    debounce: Duration,
}

impl WatchSubsystem {
    /// Start the worker thread.
    ///
    /// The subsystem only holds a weak reference to `handler`; once the
    /// handler is dropped the worker exits.
    pub fn start(
        backend: Box<dyn WatchBackend>,
        debounce: Duration,
        handler: Weak<dyn ReloadHandler>,
        hook: Option<ReloadHook>,
    ) -> Result<Self, WatchError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let alive = Arc::new(AtomicBool::new(true));
        let registry = Arc::new(Mutex::new(PathRegistry::new()));

        let worker = Worker {
            rx,
            registry: registry.clone(),
            debouncer: Debouncer::new(debounce),
            handler,
            hook,
            alive: alive.clone(),
        };

        let handle = thread::Builder::new()
            .name("rackledger-watch".to_string())
            .spawn(move || worker.run())
            .map_err(|e| WatchError::InitFailed {
                reason: e.to_string(),
            })?;

        crate::debug_event!(
            "watcher",
            "started",
            "backend {}, debounce {}ms",
            backend.name(),
            debounce.as_millis()
        );

        Ok(Self {
            backend: Mutex::new(backend),
            registry,
            subscriptions: Mutex::new(HashMap::new()),
            tx,
            alive,
            worker: Mutex::new(Some(handle)),
            debounce,
        })
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Start tracking `path`, subscribing to its directory on first use.
    ///
    /// A failed subscription is reported but the path stays tracked; the
    /// directory is retried the next time a file in it is tracked.
    pub fn track(&self, path: &Path) -> Result<(), WatchError> {
        if !self.is_alive() {
            return Ok(());
        }

        // Held across check-and-subscribe so two files in one new directory
        // cannot both subscribe it.
        let mut backend = self.backend.lock();
        let Some(dir) = self.registry.lock().add_path(path) else {
            return Ok(());
        };

        let sink = EventSink::new(self.tx.clone(), self.alive.clone());
        let subscription = backend.subscribe(&dir, sink)?;
        drop(backend);

        let mut subscriptions = self.subscriptions.lock();
        // Shutdown may have started while subscribing.
        if !self.is_alive() {
            return Ok(());
        }
        subscriptions.insert(dir.clone(), subscription);
        self.registry.lock().mark_watched(dir.clone());
        crate::debug_event!("watcher", "watching", "{}", dir.display());
        Ok(())
    }

    /// Number of live directory subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Directories with a live subscription, sorted.
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.subscriptions.lock().keys().cloned().collect();
        dirs.sort();
        dirs
    }

    /// Release every subscription and stop the worker. Idempotent.
    ///
    /// No reload starts after this returns; a reload already running on the
    /// worker is allowed to finish.
    pub fn shutdown(&self) {
        if !self.alive.swap(false, Ordering::AcqRel) {
            return;
        }

        let released = {
            let mut subscriptions = self.subscriptions.lock();
            let count = subscriptions.len();
            subscriptions.clear();
            count
        };
        self.registry.lock().clear();
        let _ = self.tx.send(WorkerMsg::Shutdown);

        if let Some(handle) = self.worker.lock().take() {
            // Shutting down from inside a reload hook must not join itself.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }

        crate::debug_event!("watcher", "stopped", "released {released} subscriptions");
    }
}

impl Drop for WatchSubsystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WatchSubsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSubsystem")
            .field("alive", &self.is_alive())
            .field("debounce", &self.debounce)
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

struct Worker {
    rx: Receiver<WorkerMsg>,
    registry: Arc<Mutex<PathRegistry>>,
    debouncer: Debouncer,
    handler: Weak<dyn ReloadHandler>,
    hook: Option<ReloadHook>,
    alive: Arc<AtomicBool>,
}

impl Worker {
    fn run(mut self) {
        loop {
            let message = match self.debouncer.next_due_in() {
                Some(wait) => self.rx.recv_timeout(wait),
                None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match message {
                Ok(WorkerMsg::Event(event)) => self.handle_event(event),
                Ok(WorkerMsg::Error(error)) => {
                    tracing::error!("[watcher] {error}");
                }
                Ok(WorkerMsg::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }

            if !self.alive.load(Ordering::Acquire) {
                break;
            }

            for path in self.debouncer.take_ready() {
                if !self.process_modification(&path) {
                    return;
                }
            }
        }
        crate::debug_event!("watcher", "worker exiting");
    }

    fn handle_event(&mut self, event: FileEvent) {
        match event {
            FileEvent::Changed(event_path) => {
                let tracked = self.registry.lock().resolve(&event_path);
                match tracked {
                    Some(path) => self.debouncer.record(path),
                    None => {
                        tracing::trace!("[watcher] ignoring untracked {}", event_path.display());
                    }
                }
            }
            FileEvent::Renamed { from, to } => {
                let old = self.registry.lock().resolve(&from);
                if let Some(old) = old {
                    self.debouncer.remove(&old);
                    self.registry.lock().remove_path(&old);
                    self.process_rename_away(&old);
                }

                let new = self.registry.lock().resolve(&to);
                if let Some(new) = new {
                    self.debouncer.record(new);
                }
            }
        }
    }

    /// Returns `false` when the handler is gone and the worker should exit.
    fn process_modification(&self, path: &Path) -> bool {
        if !self.alive.load(Ordering::Acquire) {
            return false;
        }
        // Renamed away while the check was pending.
        if !self.registry.lock().contains(path) {
            return true;
        }
        let Some(handler) = self.handler.upgrade() else {
            return false;
        };

        crate::log_event!("watcher", "reloading", "{}", path.display());
        let outcome = handler.on_modify(path);
        self.report(path, outcome);
        true
    }

    fn process_rename_away(&self, path: &Path) {
        if !self.alive.load(Ordering::Acquire) {
            return;
        }
        let Some(handler) = self.handler.upgrade() else {
            return;
        };

        crate::log_event!("watcher", "renamed away", "{}", path.display());
        let outcome = handler.on_rename_away(path);
        self.report(path, outcome);
    }

    fn report(&self, path: &Path, outcome: ReloadOutcome) {
        let event = ReloadEvent {
            path: path.to_path_buf(),
            outcome,
        };

        match &event.outcome {
            ReloadOutcome::Failed { .. } => tracing::error!("[watcher] {event}"),
            ReloadOutcome::Unchanged => crate::debug_event!("watcher", "skipped", "{event}"),
            _ => crate::log_event!("watcher", "reconciled", "{event}"),
        }

        if let Some(hook) = &self.hook {
            hook(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::backend::ManualBackend;
    use std::time::Instant;

    const DEBOUNCE: Duration = Duration::from_millis(150);

    /// Handler that records every call with its timestamp.
    #[derive(Default)]
    struct RecordingHandler {
        modified: Mutex<Vec<(PathBuf, Instant)>>,
        renamed: Mutex<Vec<PathBuf>>,
    }

    impl ReloadHandler for RecordingHandler {
        fn on_modify(&self, path: &Path) -> ReloadOutcome {
            self.modified.lock().push((path.to_path_buf(), Instant::now()));
            ReloadOutcome::Reloaded { entries: 0 }
        }

        fn on_rename_away(&self, path: &Path) -> ReloadOutcome {
            self.renamed.lock().push(path.to_path_buf());
            ReloadOutcome::Removed { entries: 0 }
        }
    }

    fn start(
        handler: &Arc<RecordingHandler>,
        hook: Option<ReloadHook>,
    ) -> (WatchSubsystem, crate::watcher::ManualEmitter) {
        let backend = ManualBackend::new();
        let emitter = backend.emitter();
        let weak: Weak<dyn ReloadHandler> = Arc::downgrade(handler) as Weak<dyn ReloadHandler>;
        let subsystem = WatchSubsystem::start(Box::new(backend), DEBOUNCE, weak, hook).unwrap();
        (subsystem, emitter)
    }

    #[test]
    fn test_burst_of_events_yields_one_reload_after_quiet_period() {
        let handler = Arc::new(RecordingHandler::default());
        let (subsystem, emitter) = start(&handler, None);

        let path = PathBuf::from("/inventory/config.yaml");
        subsystem.track(&path).unwrap();

        let mut last_event = Instant::now();
        for _ in 0..5 {
            last_event = Instant::now();
            assert!(emitter.changed(&path));
            thread::sleep(Duration::from_millis(20));
        }

        thread::sleep(DEBOUNCE * 4);

        let modified = handler.modified.lock().clone();
        assert_eq!(modified.len(), 1);
        assert_eq!(modified[0].0, path);
        assert!(modified[0].1.duration_since(last_event) >= DEBOUNCE);
    }

    #[test]
    fn test_separate_bursts_reload_separately() {
        let handler = Arc::new(RecordingHandler::default());
        let (subsystem, emitter) = start(&handler, None);

        let path = PathBuf::from("/inventory/config.yaml");
        subsystem.track(&path).unwrap();

        emitter.changed(&path);
        thread::sleep(DEBOUNCE * 3);
        emitter.changed(&path);
        thread::sleep(DEBOUNCE * 3);

        assert_eq!(handler.modified.lock().len(), 2);
    }

    #[test]
    fn test_untracked_files_are_ignored() {
        let handler = Arc::new(RecordingHandler::default());
        let (subsystem, emitter) = start(&handler, None);

        subsystem.track(Path::new("/inventory/config.yaml")).unwrap();
        assert!(emitter.changed("/inventory/notes.txt"));

        thread::sleep(DEBOUNCE * 3);
        assert!(handler.modified.lock().is_empty());
    }

    #[test]
    fn test_one_subscription_per_directory() {
        let handler = Arc::new(RecordingHandler::default());
        let (subsystem, emitter) = start(&handler, None);

        subsystem.track(Path::new("/inventory/hardware.yaml")).unwrap();
        subsystem.track(Path::new("/inventory/services.yaml")).unwrap();
        subsystem.track(Path::new("/inventory/hardware.yaml")).unwrap();
        subsystem.track(Path::new("/site-b/hardware.yaml")).unwrap();

        assert_eq!(subsystem.subscription_count(), 2);
        assert_eq!(
            emitter.subscribe_calls(),
            vec![PathBuf::from("/inventory"), PathBuf::from("/site-b")]
        );
    }

    #[test]
    fn test_rename_away_and_onto_tracked_file() {
        let handler = Arc::new(RecordingHandler::default());
        let (subsystem, emitter) = start(&handler, None);

        let old = PathBuf::from("/inventory/old.yaml");
        let new = PathBuf::from("/inventory/new.yaml");
        subsystem.track(&old).unwrap();
        subsystem.track(&new).unwrap();

        // A pending change to the old name is superseded by the rename.
        emitter.changed(&old);
        emitter.emit(FileEvent::Renamed {
            from: old.clone(),
            to: new.clone(),
        });

        thread::sleep(DEBOUNCE * 3);

        assert_eq!(handler.renamed.lock().clone(), vec![old.clone()]);
        let modified: Vec<PathBuf> = handler.modified.lock().iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(modified, vec![new]);
        assert!(!subsystem.registry.lock().contains(&old));
    }

    #[test]
    fn test_hook_observes_outcomes() {
        let handler = Arc::new(RecordingHandler::default());
        let seen: Arc<Mutex<Vec<ReloadEvent>>> = Arc::default();
        let sink = seen.clone();
        let hook: ReloadHook = Arc::new(move |event: &ReloadEvent| sink.lock().push(event.clone()));
        let (subsystem, emitter) = start(&handler, Some(hook));

        let path = PathBuf::from("/inventory/config.yaml");
        subsystem.track(&path).unwrap();
        emitter.changed(&path);
        thread::sleep(DEBOUNCE * 3);

        assert_eq!(
            seen.lock().clone(),
            vec![ReloadEvent {
                path,
                outcome: ReloadOutcome::Reloaded { entries: 0 },
            }]
        );
    }

    #[test]
    fn test_shutdown_releases_subscriptions_and_cancels_pending() {
        let handler = Arc::new(RecordingHandler::default());
        let (subsystem, emitter) = start(&handler, None);

        let path = PathBuf::from("/inventory/config.yaml");
        subsystem.track(&path).unwrap();
        emitter.changed(&path);

        subsystem.shutdown();
        subsystem.shutdown();

        assert!(!subsystem.is_alive());
        assert_eq!(subsystem.subscription_count(), 0);
        assert!(emitter.active_dirs().is_empty());
        assert!(!emitter.changed(&path));

        thread::sleep(DEBOUNCE * 3);
        assert!(handler.modified.lock().is_empty());

        // Tracking after shutdown is a no-op.
        subsystem.track(Path::new("/elsewhere/a.yaml")).unwrap();
        assert_eq!(subsystem.subscription_count(), 0);
    }

    #[test]
    fn test_worker_exits_when_handler_dropped() {
        let handler = Arc::new(RecordingHandler::default());
        let (subsystem, emitter) = start(&handler, None);

        let path = PathBuf::from("/inventory/config.yaml");
        subsystem.track(&path).unwrap();
        drop(handler);

        emitter.changed(&path);
        thread::sleep(DEBOUNCE * 3);
        subsystem.shutdown();
    }
}
