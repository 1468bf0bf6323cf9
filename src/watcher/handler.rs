//! Handler trait and reload outcome types for the watch subsystem.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What a background reconciliation did for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The file's entries were replaced by `entries` freshly decoded records.
    Reloaded { entries: usize },
    /// The file content matched what the store last read or wrote and no
    /// in-memory edit to it was pending, so a reload would change nothing.
    Unchanged,
    /// The file was renamed away; its entries were dropped and it is no
    /// longer tracked.
    Removed { entries: usize },
    /// The reload failed; the file's previous entries were kept.
    Failed { error: String },
}

/// Notification delivered to the reload hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadEvent {
    /// Tracked path, as the store knows it.
    pub path: PathBuf,
    pub outcome: ReloadOutcome,
}

impl fmt::Display for ReloadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            ReloadOutcome::Reloaded { entries } => {
                write!(f, "{}: reloaded {entries} entries", self.path.display())
            }
            ReloadOutcome::Unchanged => write!(f, "{}: unchanged", self.path.display()),
            ReloadOutcome::Removed { entries } => {
                write!(f, "{}: renamed away, dropped {entries} entries", self.path.display())
            }
            ReloadOutcome::Failed { error } => {
                write!(f, "{}: reload failed: {error}", self.path.display())
            }
        }
    }
}

/// Callback observing background reloads.
pub type ReloadHook = Arc<dyn Fn(&ReloadEvent) + Send + Sync>;

/// The side of the store the watch subsystem drives.
///
/// Implementations must not panic: failures are reported through the
/// returned outcome.
pub trait ReloadHandler: Send + Sync {
    /// A tracked file has been quiet for the debounce interval; reconcile it.
    fn on_modify(&self, path: &Path) -> ReloadOutcome;

    /// A tracked file was renamed to something else; forget it.
    fn on_rename_away(&self, path: &Path) -> ReloadOutcome;
}
