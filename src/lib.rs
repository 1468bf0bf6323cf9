//! Infrastructure inventory kept in human-editable YAML files.
//!
//! - [`resource`]: the record types (hardware, systems, services)
//! - [`codec`]: `kind`-tagged encoding of records and whole documents
//! - [`store`]: the in-memory inventory with load, mutation and save
//! - [`watcher`]: debounced reloads of files edited by other programs
//! - [`io`]: resilient file access and the CLI JSON envelope

pub mod cli;
pub mod codec;
pub mod config;
pub mod io;
pub mod logging;
pub mod resource;
pub mod store;
pub mod watcher;

pub use codec::{Codec, CodecError, KindRegistry};
pub use config::Settings;
pub use resource::{Category, Kind, Resource};
pub use store::{DuplicatePolicy, Entry, ResourceStore, StoreBuilder, StoreError, StoreResult};
pub use watcher::{ReloadEvent, ReloadOutcome};
