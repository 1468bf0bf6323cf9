//! Error types for store operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CodecError;
use crate::watcher::WatchError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Resource '{name}' not found")]
    NotFound { name: String },

    #[error("Resource '{name}' already exists in {}", file.display())]
    DuplicateName { name: String, file: PathBuf },

    #[error("{}: {source}", file.display())]
    Codec {
        file: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),

    #[error("Store has been disposed")]
    Disposed,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn not_found(name: &str) -> Self {
        Self::NotFound {
            name: name.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
