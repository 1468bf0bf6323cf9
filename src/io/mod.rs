//! Input/output helpers.
//!
//! - [`file`]: resilient whole-file reads and writes for resource files
//! - [`envelope`]: JSON output structure for the CLI

pub mod envelope;
pub mod file;

pub use envelope::{Envelope, Meta, ResultCode, SCHEMA_VERSION, Status};
pub use file::{ReadOutcome, ReadPolicy, content_hash, read_text, write_text};
