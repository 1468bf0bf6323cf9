//! Watch subsystem for resource files edited outside the process.
//!
//! # Architecture
//!
//! ```text
//! WatchSubsystem
//!   - WatchBackend (one Subscription per directory holding a tracked file)
//!   - PathRegistry (tracked files, event-path aliases, watched dirs)
//!   - worker thread with a Debouncer
//!         |
//!   ReloadHandler (the store)
//! ```
//!
//! Bursts of events for one file collapse into a single reload that runs once
//! the file has been quiet for the debounce interval (300ms by default).

mod backend;
mod debouncer;
mod error;
mod handler;
mod path_registry;
mod subsystem;

pub use backend::{
    EventSink, FileEvent, ManualBackend, ManualEmitter, NotifyBackend, NotifyMode, Subscription,
    WatchBackend, translate,
};
pub use debouncer::{DEFAULT_DEBOUNCE, Debouncer};
pub use error::WatchError;
pub use handler::{ReloadEvent, ReloadHandler, ReloadHook, ReloadOutcome};
pub use path_registry::PathRegistry;
pub use subsystem::WatchSubsystem;
