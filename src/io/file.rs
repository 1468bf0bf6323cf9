//! Whole-file text access for resource files.
//!
//! Editors and sync tools briefly hold files open exclusively while saving.
//! Reads therefore retry a few times with a fixed pause, and when every
//! attempt fails the read degrades to empty content. A caller that reloads
//! from degraded content sees the file as empty; [`ReadOutcome::Degraded`]
//! keeps that case distinguishable so it can be logged.

use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use sha2::{Digest, Sha256};

/// Retry policy for reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    /// Total number of attempts, including the first.
    pub attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_millis(50),
        }
    }
}

/// Result of a resilient read.
#[derive(Debug)]
pub enum ReadOutcome {
    /// The file does not exist.
    Missing,
    /// The file was read.
    Read(String),
    /// Every attempt failed; treat as empty.
    Degraded { attempts: u32, last_error: io::Error },
}

impl ReadOutcome {
    /// The text to decode. Missing and degraded reads yield empty text.
    pub fn into_text(self) -> String {
        match self {
            Self::Read(text) => text,
            Self::Missing | Self::Degraded { .. } => String::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Read `path` as UTF-8 text, retrying per `policy`.
pub fn read_text(path: &Path, policy: ReadPolicy) -> ReadOutcome {
    if !path.exists() {
        return ReadOutcome::Missing;
    }
    read_with_retry(path, policy, || fs::read_to_string(path))
}

/// Retry loop behind [`read_text`], with the actual read supplied by the caller.
pub fn read_with_retry<F>(path: &Path, policy: ReadPolicy, mut read: F) -> ReadOutcome
where
    F: FnMut() -> io::Result<String>,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match read() {
            Ok(text) => return ReadOutcome::Read(text),
            // Deleted between the existence check and the read.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return ReadOutcome::Missing,
            Err(e) => {
                crate::debug_event!(
                    "io",
                    "read retry",
                    "{} attempt {attempt}/{attempts}: {e}",
                    path.display()
                );
                last_error = Some(e);
                if attempt < attempts {
                    thread::sleep(policy.delay);
                }
            }
        }
    }

    let last_error = last_error.unwrap_or_else(|| io::Error::other("read failed"));
    tracing::warn!(
        "[io] giving up on {} after {attempts} attempts, treating as empty: {last_error}",
        path.display()
    );
    ReadOutcome::Degraded {
        attempts,
        last_error,
    }
}

/// Overwrite `path` with `text`, creating parent directories as needed.
pub fn write_text(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, text)
}

/// SHA-256 of `text`, hex encoded.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    format!("{digest:x}")
}
