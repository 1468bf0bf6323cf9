//! Background reloads through real filesystem notifications.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rackledger::watcher::NotifyBackend;
use rackledger::{ReloadEvent, ReloadOutcome, ResourceStore};
use tempfile::TempDir;

const DEADLINE: Duration = Duration::from_secs(10);

fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < DEADLINE {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    done()
}

fn exercise(backend: NotifyBackend, dir: &Path) {
    let file = dir.join("config.yaml");
    std::fs::write(&file, "resources:\n- kind: Server\n  name: srv01\n").unwrap();

    let events: Arc<Mutex<Vec<ReloadEvent>>> = Arc::default();
    let sink = events.clone();
    let store = ResourceStore::builder()
        .backend(backend)
        .debounce(Duration::from_millis(100))
        .on_reload(move |event| sink.lock().push(event.clone()))
        .build()
        .unwrap();
    store.load_files([&file]).unwrap();
    assert!(store.is_watching());

    std::fs::write(&file, "resources:\n- kind: Server\n  name: edge-router\n").unwrap();
    assert!(
        wait_until(|| store.contains("edge-router")),
        "external edit was not picked up: {:?}",
        events.lock()
    );
    assert!(!store.contains("srv01"));
    assert!(
        events
            .lock()
            .iter()
            .any(|e| e.outcome == ReloadOutcome::Reloaded { entries: 1 })
    );

    store.dispose();
    assert!(!store.is_watching());

    std::fs::write(&file, "resources:\n- kind: Server\n  name: srv03\n").unwrap();
    thread::sleep(Duration::from_millis(500));
    assert!(!store.contains("srv03"));
    assert!(store.contains("edge-router"));
}

#[test]
fn test_native_notifications_reload_edits() {
    let temp = TempDir::new().unwrap();
    exercise(NotifyBackend::native(), temp.path());
}

#[test]
fn test_polling_reloads_edits() {
    let temp = TempDir::new().unwrap();
    exercise(NotifyBackend::poll(Duration::from_millis(100)), temp.path());
}
