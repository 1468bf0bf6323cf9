//! Shared store state and the reload path.
//!
//! Every mutation of the entry list goes through one [`parking_lot::Mutex`].
//! File reads, parsing, rendering and writes happen outside it: a reload
//! decodes first and only locks to swap the file's entries, and a save locks
//! only to snapshot.
//!
//! A tracked file whose current content could not be loaded is held back:
//! `save_all` leaves it alone until a later reload succeeds, so the stale
//! entries never overwrite what is on disk.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexSet;
use parking_lot::Mutex;

use super::entry::{DuplicatePolicy, Entry};
use super::error::{StoreError, StoreResult};
use crate::codec::Codec;
use crate::io::file::{self, ReadPolicy};
use crate::resource::{Resource, same_name};
use crate::watcher::{ReloadHandler, ReloadOutcome};

#[derive(Debug, Default)]
struct StoreState {
    entries: Vec<Entry>,
    files: IndexSet<PathBuf>,
    /// Hash of the text last read from or written to each file.
    hashes: HashMap<PathBuf, String>,
    /// Files whose disk content failed to load; not saved.
    held: HashSet<PathBuf>,
    /// Bumped on every in-memory edit.
    revision: u64,
    /// Files with edits not yet written, and the revision of the last edit.
    edited: HashMap<PathBuf, u64>,
}

impl StoreState {
    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.resource.is_named(name))
    }

    fn touch(&mut self, file: PathBuf) {
        self.revision += 1;
        self.edited.insert(file, self.revision);
    }

    /// First name in `batch` that collides with another file's entries or
    /// with an earlier element of the batch.
    fn find_conflict(&self, file: &Path, batch: &[Resource]) -> Option<(String, PathBuf)> {
        for (index, resource) in batch.iter().enumerate() {
            let name = resource.name();
            if let Some(existing) = self
                .entries
                .iter()
                .find(|e| !e.is_in(file) && e.resource.is_named(name))
            {
                return Some((name.to_string(), existing.file.clone()));
            }
            if batch[..index].iter().any(|r| same_name(r.name(), name)) {
                return Some((name.to_string(), file.to_path_buf()));
            }
        }
        None
    }
}

/// How a file is brought back in from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Refresh {
    /// Explicit load: the duplicate-name policy applies.
    Load,
    /// Explicit reload: always a full replace; name clashes are logged.
    Reload,
    /// Watcher-driven reload: like `Reload`, but skipped when the content is
    /// what the store last read or wrote and no edit is pending.
    Watch,
}

pub(crate) struct StoreCore {
    state: Mutex<StoreState>,
    /// Serializes `save_all` so an older snapshot never overwrites a newer one.
    save_lock: Mutex<()>,
    codec: Codec,
    read_policy: ReadPolicy,
    duplicates: DuplicatePolicy,
    disposed: AtomicBool,
}

impl StoreCore {
    pub(crate) fn new(codec: Codec, read_policy: ReadPolicy, duplicates: DuplicatePolicy) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            save_lock: Mutex::new(()),
            codec,
            read_policy,
            duplicates,
            disposed: AtomicBool::new(false),
        }
    }

    pub(crate) fn codec(&self) -> &Codec {
        &self.codec
    }

    pub(crate) fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicates
    }

    pub(crate) fn mark_disposed(&self) -> bool {
        !self.disposed.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> StoreResult<()> {
        if self.is_disposed() {
            Err(StoreError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Re-read `file` and replace its entries.
    ///
    /// Returns `Ok(None)` when a [`Refresh::Watch`] finds nothing to do. On
    /// failure the file keeps its entries and is held back from saving.
    pub(crate) fn refresh(&self, file: &Path, mode: Refresh) -> StoreResult<Option<usize>> {
        self.ensure_live()?;

        let outcome = file::read_text(file, self.read_policy);
        // A degraded read is not remembered so the next change retries it.
        let hash = (!outcome.is_degraded()).then(|| outcome_hash(&outcome));
        let text = outcome.into_text();

        if mode == Refresh::Watch {
            if let Some(hash) = &hash {
                let state = self.state.lock();
                if state.hashes.get(file) == Some(hash) && !state.edited.contains_key(file) {
                    return Ok(None);
                }
            }
        }

        let loaded = self
            .codec
            .parse_document(&text)
            .map_err(|source| StoreError::Codec {
                file: file.to_path_buf(),
                source,
            })
            .and_then(|resources| {
                self.replace_file(file, resources, hash, mode == Refresh::Load)
            });

        if loaded.is_err() && self.state.lock().held.insert(file.to_path_buf()) {
            tracing::warn!(
                "[store] {} not loaded; it will not be saved until it reloads",
                file.display()
            );
        }
        loaded.map(Some)
    }

    /// Parse `text` as the content of `file` and replace its entries.
    pub(crate) fn load_text(&self, text: &str, file: &Path) -> StoreResult<usize> {
        self.ensure_live()?;
        let resources = self
            .codec
            .parse_document(text)
            .map_err(|source| StoreError::Codec {
                file: file.to_path_buf(),
                source,
            })?;
        // The file on disk may differ from the injected text.
        self.replace_file(file, resources, None, true)
    }

    /// Swap every entry of `file` for `resources`. Never merges.
    ///
    /// With `refuse_duplicates` a name clash fails the whole batch under
    /// [`DuplicatePolicy::Reject`]; otherwise it is only logged, since a
    /// record moved between two files is seen in both until the second one
    /// reloads.
    fn replace_file(
        &self,
        file: &Path,
        resources: Vec<Resource>,
        hash: Option<String>,
        refuse_duplicates: bool,
    ) -> StoreResult<usize> {
        let mut state = self.state.lock();
        self.ensure_live()?;

        if self.duplicates == DuplicatePolicy::Reject {
            if let Some((name, existing)) = state.find_conflict(file, &resources) {
                if refuse_duplicates {
                    return Err(StoreError::DuplicateName {
                        name,
                        file: existing,
                    });
                }
                tracing::warn!(
                    "[store] '{name}' in {} is also defined in {}",
                    file.display(),
                    existing.display()
                );
            }
        }

        let before = state.entries.len();
        state.entries.retain(|e| !e.is_in(file));
        let removed = before - state.entries.len();

        let count = resources.len();
        state
            .entries
            .extend(resources.into_iter().map(|r| Entry::new(r, file)));
        state.files.insert(file.to_path_buf());
        match hash {
            Some(hash) => state.hashes.insert(file.to_path_buf(), hash),
            None => state.hashes.remove(file),
        };
        state.held.remove(file);
        state.edited.remove(file);
        drop(state);

        crate::log_event!(
            "store",
            "loaded",
            "{} ({count} entries, replaced {removed})",
            file.display()
        );
        Ok(count)
    }

    pub(crate) fn add(&self, resource: Resource, file: &Path) -> StoreResult<()> {
        let mut state = self.state.lock();
        self.ensure_live()?;

        if self.duplicates == DuplicatePolicy::Reject {
            if let Some(index) = state.position(resource.name()) {
                return Err(StoreError::DuplicateName {
                    name: resource.name().to_string(),
                    file: state.entries[index].file.clone(),
                });
            }
        }

        crate::debug_event!(
            "store",
            "add",
            "{} {} -> {}",
            resource.kind(),
            resource.name(),
            file.display()
        );
        state.files.insert(file.to_path_buf());
        state.entries.push(Entry::new(resource, file));
        state.touch(file.to_path_buf());
        Ok(())
    }

    pub(crate) fn update(&self, resource: Resource) -> StoreResult<()> {
        let mut state = self.state.lock();
        self.ensure_live()?;

        let index = state
            .position(resource.name())
            .ok_or_else(|| StoreError::not_found(resource.name()))?;
        state.entries[index].resource = resource;
        let file = state.entries[index].file.clone();
        state.touch(file);
        Ok(())
    }

    pub(crate) fn delete(&self, name: &str) -> StoreResult<Entry> {
        let mut state = self.state.lock();
        self.ensure_live()?;

        let index = state
            .position(name)
            .ok_or_else(|| StoreError::not_found(name))?;
        let entry = state.entries.remove(index);
        state.touch(entry.file.clone());
        Ok(entry)
    }

    /// Apply `f` to the named resource in place.
    pub(crate) fn modify<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Resource) -> R,
    ) -> StoreResult<R> {
        let mut state = self.state.lock();
        self.ensure_live()?;

        let index = state
            .position(name)
            .ok_or_else(|| StoreError::not_found(name))?;
        let resource = &mut state.entries[index].resource;
        let original = resource.name().to_string();
        let result = f(resource);
        // The name is the identity; it cannot be changed through `modify`.
        if resource.name() != original {
            resource.set_name(original);
        }
        let file = state.entries[index].file.clone();
        state.touch(file);
        Ok(result)
    }

    pub(crate) fn get_entry(&self, name: &str) -> Option<Entry> {
        let state = self.state.lock();
        state.position(name).map(|index| state.entries[index].clone())
    }

    pub(crate) fn select<T>(&self, f: impl FnMut(&Entry) -> Option<T>) -> Vec<T> {
        self.state.lock().entries.iter().filter_map(f).collect()
    }

    pub(crate) fn files(&self) -> Vec<PathBuf> {
        self.state.lock().files.iter().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Write every tracked file, including files with no entries left.
    /// Held-back files are skipped.
    ///
    /// Every file is attempted; the first failure is returned.
    pub(crate) fn save_all(&self) -> StoreResult<usize> {
        self.ensure_live()?;
        let _saving = self.save_lock.lock();

        let (revision, snapshot): (u64, Vec<(PathBuf, Vec<Resource>)>) = {
            let state = self.state.lock();
            for file in &state.held {
                if state.files.contains(file) {
                    tracing::warn!("[store] not saving {}: it failed to load", file.display());
                }
            }
            let snapshot = state
                .files
                .iter()
                .filter(|file| !state.held.contains(*file))
                .map(|file| {
                    let resources = state
                        .entries
                        .iter()
                        .filter(|e| e.is_in(file))
                        .map(|e| e.resource.clone())
                        .collect();
                    (file.clone(), resources)
                })
                .collect();
            (state.revision, snapshot)
        };

        let mut first_error = None;
        let mut written = 0;
        for (file, resources) in snapshot {
            match self.write_file(&file, &resources, revision) {
                Ok(()) => written += 1,
                Err(e) => {
                    tracing::error!("[store] failed to save {}: {e}", file.display());
                    first_error.get_or_insert(e);
                }
            }
        }

        crate::log_event!("store", "saved", "{written} files");
        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }

    /// Write `resources` to `file`; edits up to `revision` are then saved.
    fn write_file(&self, file: &Path, resources: &[Resource], revision: u64) -> StoreResult<()> {
        let text = self
            .codec
            .render_document(resources)
            .map_err(|source| StoreError::Codec {
                file: file.to_path_buf(),
                source,
            })?;

        file::write_text(file, &text).map_err(|source| StoreError::Io {
            path: file.to_path_buf(),
            source,
        })?;

        let mut state = self.state.lock();
        state
            .hashes
            .insert(file.to_path_buf(), file::content_hash(&text));
        if state.edited.get(file).is_some_and(|edit| *edit <= revision) {
            state.edited.remove(file);
        }
        Ok(())
    }

    /// Drop `file` and all of its entries.
    pub(crate) fn forget_file(&self, file: &Path) -> usize {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|e| !e.is_in(file));
        state.files.shift_remove(file);
        state.hashes.remove(file);
        state.held.remove(file);
        state.edited.remove(file);
        before - state.entries.len()
    }
}

fn outcome_hash(outcome: &file::ReadOutcome) -> String {
    match outcome {
        file::ReadOutcome::Read(text) => file::content_hash(text),
        _ => file::content_hash(""),
    }
}

impl ReloadHandler for StoreCore {
    fn on_modify(&self, path: &Path) -> ReloadOutcome {
        match self.refresh(path, Refresh::Watch) {
            Ok(Some(entries)) => ReloadOutcome::Reloaded { entries },
            Ok(None) => ReloadOutcome::Unchanged,
            Err(e) => ReloadOutcome::Failed {
                error: e.to_string(),
            },
        }
    }

    fn on_rename_away(&self, path: &Path) -> ReloadOutcome {
        let entries = self.forget_file(path);
        ReloadOutcome::Removed { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Kind, Service};
    use std::time::Duration;
    use tempfile::TempDir;

    fn core() -> StoreCore {
        StoreCore::new(Codec::new(), ReadPolicy::default(), DuplicatePolicy::Reject)
    }

    #[test]
    fn test_modified_file_reloads_and_unchanged_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "resources:\n- kind: Server\n  name: srv01\n").unwrap();

        let core = core();
        assert_eq!(
            core.on_modify(&path),
            ReloadOutcome::Reloaded { entries: 1 }
        );
        assert_eq!(core.on_modify(&path), ReloadOutcome::Unchanged);

        std::fs::write(&path, "resources:\n- kind: Server\n  name: srv02\n").unwrap();
        assert_eq!(
            core.on_modify(&path),
            ReloadOutcome::Reloaded { entries: 1 }
        );
        assert!(core.get_entry("srv01").is_none());
        assert!(core.get_entry("srv02").is_some());
    }

    #[test]
    fn test_own_save_does_not_trigger_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");

        let core = core();
        core.add(Resource::new(Kind::Switch, "sw01"), &path).unwrap();
        core.save_all().unwrap();

        assert_eq!(core.on_modify(&path), ReloadOutcome::Unchanged);
    }

    #[test]
    fn test_failed_reload_keeps_previous_entries() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "resources:\n- kind: Server\n  name: srv01\n").unwrap();

        let core = core();
        core.refresh(&path, Refresh::Load).unwrap();

        std::fs::write(
            &path,
            "resources:\n- kind: Server\n  name: srv01\n- kind: Mainframe\n  name: big\n",
        )
        .unwrap();
        let outcome = core.on_modify(&path);
        assert!(matches!(outcome, ReloadOutcome::Failed { ref error } if error.contains("Mainframe")));
        assert!(core.get_entry("srv01").is_some());
        assert_eq!(core.len(), 1);

        // The stale entries are not written over the edited file.
        let edited = std::fs::read_to_string(&path).unwrap();
        assert_eq!(core.save_all().unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), edited);

        std::fs::write(&path, "resources:\n- kind: Server\n  name: srv02\n").unwrap();
        assert_eq!(core.on_modify(&path), ReloadOutcome::Reloaded { entries: 1 });
        assert_eq!(core.save_all().unwrap(), 1);
    }

    #[test]
    fn test_record_moved_between_files_survives_reload_order() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.yaml");
        let b = temp.path().join("b.yaml");
        std::fs::write(&a, "resources:\n- kind: Server\n  name: x\n").unwrap();
        std::fs::write(&b, "resources:\n- kind: Server\n  name: y\n").unwrap();

        let core = core();
        core.refresh(&a, Refresh::Load).unwrap();
        core.refresh(&b, Refresh::Load).unwrap();

        // x moves from a.yaml to b.yaml; b.yaml is picked up first.
        std::fs::write(
            &b,
            "resources:\n- kind: Server\n  name: y\n- kind: Server\n  name: x\n",
        )
        .unwrap();
        std::fs::write(&a, "resources: []\n").unwrap();

        assert_eq!(core.refresh(&b, Refresh::Reload).unwrap(), Some(2));
        assert_eq!(core.on_modify(&a), ReloadOutcome::Reloaded { entries: 0 });

        let x = core.get_entry("x").unwrap();
        assert_eq!(x.file, b);
        assert_eq!(core.len(), 2);

        core.save_all().unwrap();
        let saved = std::fs::read_to_string(&b).unwrap();
        assert!(saved.contains("name: x"));
        assert!(saved.contains("name: y"));
    }

    #[test]
    fn test_touched_file_with_pending_edits_is_reloaded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "resources:\n- kind: Server\n  name: srv01\n").unwrap();

        let core = core();
        core.refresh(&path, Refresh::Load).unwrap();
        core.add(Resource::new(Kind::Server, "srv02"), &path).unwrap();

        // Same bytes on disk, but the in-memory edit differs from them.
        assert_eq!(core.on_modify(&path), ReloadOutcome::Reloaded { entries: 1 });
        assert!(core.get_entry("srv02").is_none());

        core.add(Resource::new(Kind::Server, "srv02"), &path).unwrap();
        core.save_all().unwrap();
        assert_eq!(core.on_modify(&path), ReloadOutcome::Unchanged);
        assert!(core.get_entry("srv02").is_some());
    }

    #[test]
    fn test_rename_away_forgets_file() {
        let core = core();
        core.load_text(
            "resources:\n- kind: Server\n  name: a\n- kind: Server\n  name: b\n",
            Path::new("old.yaml"),
        )
        .unwrap();
        core.add(Resource::new(Kind::Server, "c"), Path::new("other.yaml"))
            .unwrap();

        assert_eq!(
            core.on_rename_away(Path::new("old.yaml")),
            ReloadOutcome::Removed { entries: 2 }
        );
        assert_eq!(core.files(), vec![PathBuf::from("other.yaml")]);
        assert_eq!(core.len(), 1);
    }

    #[test]
    fn test_batch_conflicting_with_other_file_is_refused() {
        let core = core();
        core.load_text("resources:\n- kind: Server\n  name: srv01\n", Path::new("a.yaml"))
            .unwrap();

        let err = core
            .load_text(
                "resources:\n- kind: Desktop\n  name: SRV01\n",
                Path::new("b.yaml"),
            )
            .unwrap_err();
        assert!(
            matches!(err, StoreError::DuplicateName { ref file, .. } if file == Path::new("a.yaml"))
        );

        // Reloading the same file with the same names is not a conflict.
        core.load_text("resources:\n- kind: Server\n  name: srv01\n", Path::new("a.yaml"))
            .unwrap();
        assert_eq!(core.len(), 1);
    }

    #[test]
    fn test_duplicates_within_one_batch() {
        let text = "resources:\n- kind: Server\n  name: x\n- kind: Service\n  name: X\n";

        assert!(core().load_text(text, Path::new("a.yaml")).is_err());

        let permissive = StoreCore::new(Codec::new(), ReadPolicy::default(), DuplicatePolicy::Allow);
        assert_eq!(permissive.load_text(text, Path::new("a.yaml")).unwrap(), 2);
        // First match wins.
        assert_eq!(
            permissive.get_entry("x").unwrap().resource.kind(),
            Kind::Server
        );
    }

    #[test]
    fn test_modify_cannot_rename() {
        let core = core();
        core.add(Resource::Service(Service::named("immich")), Path::new("a.yaml"))
            .unwrap();

        core.modify("immich", |r| {
            if let Resource::Service(service) = r {
                service.name = "renamed".to_string();
                service.runs_on = Some("vm01".to_string());
            }
        })
        .unwrap();

        let entry = core.get_entry("immich").unwrap();
        assert_eq!(
            entry.resource.as_service().unwrap().runs_on.as_deref(),
            Some("vm01")
        );
        assert!(core.get_entry("renamed").is_none());
    }

    #[test]
    fn test_reads_happen_outside_the_lock() {
        let temp = TempDir::new().unwrap();
        // Reading a directory fails on every attempt, so the reload spends
        // the whole retry budget before touching the entry list.
        let unreadable = temp.path().join("dir.yaml");
        std::fs::create_dir(&unreadable).unwrap();

        let core = StoreCore::new(
            Codec::new(),
            ReadPolicy {
                attempts: 4,
                delay: Duration::from_millis(100),
            },
            DuplicatePolicy::Reject,
        );
        core.add(Resource::new(Kind::Server, "srv01"), Path::new("a.yaml"))
            .unwrap();

        std::thread::scope(|scope| {
            let reload = scope.spawn(|| core.refresh(&unreadable, Refresh::Reload));
            std::thread::sleep(Duration::from_millis(50));

            let started = std::time::Instant::now();
            assert!(core.get_entry("srv01").is_some());
            assert!(started.elapsed() < Duration::from_millis(100));

            // Degraded reads count as empty content.
            assert_eq!(reload.join().unwrap().unwrap(), Some(0));
        });
    }

    #[test]
    fn test_disposed_core_refuses_mutation() {
        let core = core();
        assert!(core.mark_disposed());
        assert!(!core.mark_disposed());

        assert!(matches!(
            core.add(Resource::new(Kind::Server, "a"), Path::new("a.yaml")),
            Err(StoreError::Disposed)
        ));
        assert!(matches!(core.save_all(), Err(StoreError::Disposed)));
    }
}
