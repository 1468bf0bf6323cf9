//! Debouncing of file change events.
//!
//! Editors often save in several syscalls or write-then-rename, producing a
//! burst of notifications for one logical save. Each event stamps the file
//! with the time it arrived; a file becomes ready only once it has been quiet
//! for the whole debounce interval. A newer event never cancels anything, it
//! just moves the stamp forward so the earlier check finds nothing to do.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Default quiet period before a changed file is reloaded.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Debounces file change events by path.
#[derive(Debug)]
pub struct Debouncer {
    /// Pending changes: path -> last change timestamp.
    pending: HashMap<PathBuf, Instant>,
    /// How long a file must be stable before processing.
    duration: Duration,
}

impl Debouncer {
    pub fn new(duration: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            duration,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Record a file change event, resetting the quiet period for this path.
    pub fn record(&mut self, path: PathBuf) {
        self.record_at(path, Instant::now());
    }

    pub fn record_at(&mut self, path: PathBuf, at: Instant) {
        self.pending.insert(path, at);
    }

    /// Remove a path from pending (e.g., when the file was renamed away).
    pub fn remove(&mut self, path: &Path) {
        self.pending.remove(path);
    }

    /// Take all paths that have been stable for the debounce duration.
    pub fn take_ready(&mut self) -> Vec<PathBuf> {
        self.take_ready_at(Instant::now())
    }

    pub fn take_ready_at(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut ready = Vec::new();

        self.pending.retain(|path, last_change| {
            if now.saturating_duration_since(*last_change) >= self.duration {
                ready.push(path.clone());
                false
            } else {
                true
            }
        });

        ready
    }

    /// Time until the earliest pending path becomes ready.
    ///
    /// `None` when nothing is pending; `Some(ZERO)` when something is overdue.
    pub fn next_due_in(&self) -> Option<Duration> {
        self.next_due_in_at(Instant::now())
    }

    pub fn next_due_in_at(&self, now: Instant) -> Option<Duration> {
        self.pending
            .values()
            .map(|last_change| {
                (*last_change + self.duration).saturating_duration_since(now)
            })
            .min()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
