//! Command implementations for the CLI.
//!
//! Mutating commands follow one shape: load the configured files, apply the
//! change, save every tracked file, dispose the store.

pub mod init;
pub mod resources;
pub mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use serde::Serialize;

use crate::codec::Codec;
use crate::config::{ConfigError, Settings};
use crate::io::{Envelope, ResultCode};
use crate::resource::Resource;
use crate::store::{ResourceStore, StoreError, StoreResult};

/// Settings and global flags shared by every command.
#[derive(Debug, Clone)]
pub struct Session {
    pub settings: Settings,
    /// Files given with `--file`; empty means "use settings".
    pub cli_files: Vec<PathBuf>,
    pub json: bool,
}

impl Session {
    pub fn new(settings: Settings, cli_files: Vec<PathBuf>, json: bool) -> Self {
        Self {
            settings,
            cli_files,
            json,
        }
    }

    /// Files loaded by every store-backed command.
    pub fn files(&self) -> Vec<PathBuf> {
        if self.cli_files.is_empty() {
            self.settings.resource_files()
        } else {
            self.cli_files.clone()
        }
    }

    /// Where a new resource goes: `explicit`, else the first `--file`, else
    /// the configured default.
    pub fn target_file(&self, explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
        explicit
            .or_else(|| self.cli_files.first().cloned())
            .or_else(|| self.settings.target_file())
            .context("No resource file configured; pass --file or set `files` in settings")
    }

    /// Load the inventory without watching.
    pub fn open(&self) -> anyhow::Result<ResourceStore> {
        let mut settings = self.settings.clone();
        settings.watch.enabled = false;
        let store = ResourceStore::from_settings(&settings)?;
        store.load_files(self.files())?;
        Ok(store)
    }

    /// Run `f` against a freshly loaded store and save the result.
    ///
    /// Nothing is written when `f` fails.
    pub fn mutate<R>(
        &self,
        f: impl FnOnce(&ResourceStore) -> StoreResult<R>,
    ) -> anyhow::Result<R> {
        let store = self.open()?;
        let result = f(&store).and_then(|value| store.save_all().map(|_| value));
        store.dispose();
        Ok(result?)
    }

    /// Print `envelope` as JSON, or run `human` for terminal output.
    pub fn emit<T: Serialize>(
        &self,
        envelope: Envelope<T>,
        human: impl FnOnce(),
    ) -> anyhow::Result<ExitCode> {
        let code = envelope.exit_code;
        if self.json {
            println!("{}", envelope.to_json()?);
        } else {
            human();
        }
        Ok(ExitCode::from(code))
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files()
            .iter()
            .map(|file| file.display().to_string())
            .collect()
    }
}

/// JSON form of a resource: the on-disk mapping.
pub fn resource_json(codec: &Codec, resource: &Resource) -> anyhow::Result<serde_json::Value> {
    let mapping = codec.encode(resource)?;
    Ok(serde_json::to_value(serde_yaml::Value::Mapping(mapping))?)
}

/// Map an error to the envelope result code.
pub fn result_code(err: &anyhow::Error) -> ResultCode {
    match err.downcast_ref::<StoreError>() {
        Some(StoreError::NotFound { .. }) => ResultCode::NotFound,
        Some(StoreError::DuplicateName { .. }) => ResultCode::DuplicateName,
        Some(StoreError::Codec { source, .. }) if source.is_internal() => ResultCode::InternalError,
        Some(StoreError::Codec { .. }) => ResultCode::ParseError,
        Some(StoreError::Io { .. }) | Some(StoreError::Watch(_)) => ResultCode::IoError,
        Some(StoreError::Disposed) => ResultCode::InternalError,
        None if err.downcast_ref::<ConfigError>().is_some() => ResultCode::InvalidInput,
        None => ResultCode::InternalError,
    }
}

/// Print a failed command and pick its exit code.
pub fn report_error(err: &anyhow::Error, json: bool) -> ExitCode {
    let code = result_code(err);
    let envelope: Envelope = match code {
        ResultCode::NotFound => Envelope::not_found(err.to_string()),
        code => Envelope::error(code, format!("{err:#}")),
    };

    if json {
        match envelope.to_json() {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("Error: {err:#} ({e})"),
        }
    } else {
        eprintln!("Error: {err:#}");
    }
    ExitCode::from(envelope.exit_code)
}
