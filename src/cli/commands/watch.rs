//! Watch command: keep the inventory loaded and report background reloads.

use std::process::ExitCode;
use std::time::{Duration, Instant};

use console::style;
use crossbeam_channel::RecvTimeoutError;
use serde_json::json;

use super::Session;
use crate::io::Envelope;
use crate::store::{ResourceStore, StoreBuilder};
use crate::watcher::{ReloadEvent, ReloadOutcome};

pub fn run_watch(session: &Session, for_secs: Option<u64>) -> anyhow::Result<ExitCode> {
    let (tx, rx) = crossbeam_channel::unbounded::<ReloadEvent>();

    let mut settings = session.settings.clone();
    settings.watch.enabled = true;
    let store = StoreBuilder::from_settings(&settings)
        .on_reload(move |event| {
            let _ = tx.send(event.clone());
        })
        .build()?;
    let loaded = store.load_files(session.files())?;

    if !session.json {
        println!(
            "{} {loaded} resources from {} files, watching {} directories",
            style("Loaded").green().bold(),
            store.source_files().len(),
            store.watched_dirs().len()
        );
    }

    let deadline = for_secs.map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut events = Vec::new();
    loop {
        let received = match deadline {
            Some(deadline) => {
                rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(event) => {
                if !session.json {
                    print_event(&event, &store);
                }
                events.push(event);
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    store.dispose();

    if session.json {
        let data: Vec<_> = events
            .iter()
            .map(|event| json!({ "path": event.path.display().to_string(), "event": event.to_string() }))
            .collect();
        let count = data.len();
        session.emit(
            Envelope::success(data)
                .with_count(count)
                .with_files(session.file_names()),
            || {},
        )
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_event(event: &ReloadEvent, store: &ResourceStore) {
    let label = match &event.outcome {
        ReloadOutcome::Reloaded { .. } => style("Reloaded").green().bold(),
        ReloadOutcome::Unchanged => style("Unchanged").dim(),
        ReloadOutcome::Removed { .. } => style("Removed").yellow().bold(),
        ReloadOutcome::Failed { .. } => style("Failed").red().bold(),
    };
    println!("{label} {event} ({} resources total)", store.len());
}
