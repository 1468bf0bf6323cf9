//! Command-line interface over the resource store.
//!
//! Argument parsing lives in [`args`]; each command is implemented in
//! [`commands`].

pub mod args;
pub mod commands;

use std::process::ExitCode;

pub use args::{Cli, Commands};
use commands::Session;
use commands::resources::ServiceChanges;

use crate::config::Settings;

/// Load settings, run the selected command and map failures to exit codes.
pub fn run(cli: Cli) -> ExitCode {
    let json = cli.json;
    match dispatch(cli) {
        Ok(code) => code,
        Err(e) => commands::report_error(&e, json),
    }
}

fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    let Cli {
        config,
        files,
        json,
        command,
    } = cli;

    let session = || -> anyhow::Result<Session> {
        let settings = match &config {
            Some(path) => Settings::load_from(path)?,
            None => Settings::load()?,
        };
        crate::logging::init_with_config(&settings.logging);
        crate::debug_event!("cli", "settings", "files {:?}", settings.files);
        Ok(Session::new(settings, files.clone(), json))
    };

    match command {
        Commands::Init { force } => {
            crate::logging::init();
            commands::init::run_init(force, json)
        }
        Commands::Config => commands::init::run_config(&session()?),
        Commands::Kinds => commands::resources::run_kinds(&session()?),
        Commands::Add {
            kind,
            name,
            into,
            tags,
        } => commands::resources::run_add(&session()?, kind, name, into, tags),
        Commands::Get { name } => commands::resources::run_get(&session()?, &name),
        Commands::List { kind } => commands::resources::run_list(&session()?, kind),
        Commands::Del { name } => commands::resources::run_del(&session()?, &name),
        Commands::Tag { name, tag } => commands::resources::run_tag(&session()?, &name, &tag),
        Commands::SetService {
            name,
            ip,
            port,
            protocol,
            url,
            runs_on,
        } => commands::resources::run_set_service(
            &session()?,
            &name,
            ServiceChanges {
                ip,
                port,
                protocol,
                url,
                runs_on,
            },
        ),
        Commands::Watch { for_secs } => commands::watch::run_watch(&session()?, for_secs),
    }
}
