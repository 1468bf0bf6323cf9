//! Init and Config commands.

use std::process::ExitCode;

use console::style;
use serde_json::json;

use super::Session;
use crate::config::Settings;
use crate::io::{Envelope, ResultCode};

/// Run init command - create `.rackledger/settings.toml`.
pub fn run_init(force: bool, json: bool) -> anyhow::Result<ExitCode> {
    let session = Session::new(Settings::default(), Vec::new(), json);

    match Settings::init_config_file(force) {
        Ok(path) => {
            let envelope = Envelope::success(json!({ "path": path.display().to_string() }))
                .with_message("Created configuration file");
            session.emit(envelope, || {
                println!(
                    "{} configuration file at: {}",
                    style("Created").green().bold(),
                    path.display()
                );
                println!("Edit this file to list your resource files.");
            })
        }
        Err(e) => {
            let envelope: Envelope = Envelope::error(ResultCode::InvalidInput, e.to_string());
            session.emit(envelope, || eprintln!("Error: {e}"))
        }
    }
}

/// Run config command - display the effective configuration.
pub fn run_config(session: &Session) -> anyhow::Result<ExitCode> {
    let envelope = Envelope::success(serde_json::to_value(&session.settings)?)
        .with_files(session.file_names());

    let rendered = toml::to_string_pretty(&session.settings)?;
    session.emit(envelope, || {
        println!("Current Configuration:");
        println!("{}", "=".repeat(50));
        println!("{rendered}");
    })
}
