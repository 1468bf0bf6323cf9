//! The resource store.
//!
//! [`ResourceStore`] is the single source of truth for every known entry.
//! Callers load files, mutate records and save; an optional watch subsystem
//! reconciles external edits in the background through the same reload path
//! as an explicit load.
//!
//! ```no_run
//! use rackledger::resource::{Resource, Service};
//! use rackledger::store::ResourceStore;
//!
//! # fn main() -> Result<(), rackledger::store::StoreError> {
//! let store = ResourceStore::new();
//! store.load_files(["config.yaml"])?;
//! store.add(Resource::Service(Service::named("immich")), "config.yaml")?;
//! store.save_all()?;
//! store.dispose();
//! # Ok(())
//! # }
//! ```

mod entry;
mod error;
mod state;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use self::state::{Refresh, StoreCore};
use crate::codec::Codec;
use crate::config::{Settings, WatchBackendKind};
use crate::io::file::ReadPolicy;
use crate::resource::{Category, Kind, Resource, SystemResource, same_name};
use crate::watcher::{
    DEFAULT_DEBOUNCE, NotifyBackend, ReloadEvent, ReloadHandler, ReloadHook, WatchBackend,
    WatchSubsystem,
};

pub use entry::{DuplicatePolicy, Entry};
pub use error::{StoreError, StoreResult};

/// In-memory inventory backed by resource files.
///
/// All operations are safe to call from several threads at once; each one is
/// atomic with respect to the others.
pub struct ResourceStore {
    core: Arc<StoreCore>,
    watch: Option<WatchSubsystem>,
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceStore {
    /// Store with the built-in kinds, duplicate names rejected, no watching.
    pub fn new() -> Self {
        Self {
            core: Arc::new(StoreCore::new(
                Codec::new(),
                ReadPolicy::default(),
                DuplicatePolicy::default(),
            )),
            watch: None,
        }
    }

    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    /// Build a store from layered settings.
    pub fn from_settings(settings: &Settings) -> StoreResult<Self> {
        StoreBuilder::from_settings(settings).build()
    }

    /// Load each path in order, tracking it once it has loaded.
    ///
    /// Missing files load as empty. Returns the total number of entries
    /// loaded; stops at the first file that fails to decode or, under
    /// [`DuplicatePolicy::Reject`], reuses a name already loaded. A file
    /// that failed is still watched but never saved until it loads.
    pub fn load_files<I, P>(&self, paths: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut total = 0;
        for path in paths {
            let path = path.as_ref();
            self.watch_file(path);
            total += self.core.refresh(path, Refresh::Load)?.unwrap_or_default();
        }
        Ok(total)
    }

    /// Replace the entries of `file` with the records parsed from `text`.
    ///
    /// Nothing is read from disk. Calling it twice with the same text leaves
    /// the store unchanged.
    pub fn load(&self, text: &str, file: impl AsRef<Path>) -> StoreResult<usize> {
        let file = file.as_ref();
        let count = self.core.load_text(text, file)?;
        self.watch_file(file);
        Ok(count)
    }

    /// Re-read `file` from disk and replace its entries. Always reloads,
    /// even when the content is unchanged.
    ///
    /// A name that another file also defines does not fail the reload; the
    /// clash is logged. Records moving between files pass through that
    /// state until both files have reloaded.
    pub fn reload_file(&self, file: impl AsRef<Path>) -> StoreResult<usize> {
        let count = self.core.refresh(file.as_ref(), Refresh::Reload)?;
        Ok(count.unwrap_or_default())
    }

    /// Attach a new record to `file`, tracking the file if needed.
    pub fn add(&self, resource: Resource, file: impl AsRef<Path>) -> StoreResult<()> {
        let file = file.as_ref();
        self.core.add(resource, file)?;
        self.watch_file(file);
        Ok(())
    }

    /// Replace the record with the same name, keeping its source file.
    pub fn update(&self, resource: Resource) -> StoreResult<()> {
        self.core.update(resource)
    }

    /// Edit the named record in place. The record's name cannot be changed
    /// this way.
    pub fn modify<R>(&self, name: &str, f: impl FnOnce(&mut Resource) -> R) -> StoreResult<R> {
        self.core.modify(name, f)
    }

    /// Remove the named record, returning it.
    pub fn delete(&self, name: &str) -> StoreResult<Resource> {
        self.core.delete(name).map(|entry| entry.resource)
    }

    pub fn get_by_name(&self, name: &str) -> Option<Resource> {
        self.core.get_entry(name).map(|entry| entry.resource)
    }

    pub fn get_entry(&self, name: &str) -> Option<Entry> {
        self.core.get_entry(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.core.get_entry(name).is_some()
    }

    pub fn hardware(&self) -> Vec<Resource> {
        self.by_category(Category::Hardware)
    }

    pub fn systems(&self) -> Vec<SystemResource> {
        self.core.select(|e| e.resource.as_system().cloned())
    }

    pub fn services(&self) -> Vec<Resource> {
        self.by_category(Category::Service)
    }

    pub fn by_category(&self, category: Category) -> Vec<Resource> {
        self.core
            .select(|e| (e.resource.category() == category).then(|| e.resource.clone()))
    }

    pub fn by_kind(&self, kind: Kind) -> Vec<Resource> {
        self.core
            .select(|e| (e.resource.kind() == kind).then(|| e.resource.clone()))
    }

    /// Systems whose `runsOn` names `host` (case-insensitive).
    pub fn systems_on_host(&self, host: &str) -> Vec<SystemResource> {
        self.core.select(|e| {
            e.resource
                .as_system()
                .filter(|s| s.runs_on.as_deref().is_some_and(|h| same_name(h, host)))
                .cloned()
        })
    }

    /// Every record, in store order.
    pub fn resources(&self) -> Vec<Resource> {
        self.core.select(|e| Some(e.resource.clone()))
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.core.select(|e| Some(e.clone()))
    }

    /// Tracked files in the order they were first seen.
    pub fn source_files(&self) -> Vec<PathBuf> {
        self.core.files()
    }

    pub fn len(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn codec(&self) -> &Codec {
        self.core.codec()
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.core.duplicate_policy()
    }

    /// Write every tracked file in full, including files left empty.
    /// Returns the number of files written.
    ///
    /// A tracked file whose last load or reload failed is skipped, so its
    /// entries from before the failure never replace the newer content.
    pub fn save_all(&self) -> StoreResult<usize> {
        self.core.save_all()
    }

    pub fn is_watching(&self) -> bool {
        self.watch.as_ref().is_some_and(WatchSubsystem::is_alive)
    }

    /// Directories with a live change subscription.
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        self.watch
            .as_ref()
            .map(WatchSubsystem::watched_dirs)
            .unwrap_or_default()
    }

    /// Release every subscription and stop background reloads.
    ///
    /// Afterwards mutations and saves fail with [`StoreError::Disposed`];
    /// queries keep answering from the last state. Idempotent.
    pub fn dispose(&self) {
        if let Some(watch) = &self.watch {
            watch.shutdown();
        }
        if self.core.mark_disposed() {
            crate::debug_event!("store", "disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }

    fn watch_file(&self, file: &Path) {
        if let Some(watch) = &self.watch {
            if let Err(e) = watch.track(file) {
                tracing::warn!("[store] cannot watch {}: {e}", file.display());
            }
        }
    }
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore")
            .field("entries", &self.len())
            .field("files", &self.source_files())
            .field("watch", &self.watch)
            .finish()
    }
}

/// Builder for [`ResourceStore`].
#[derive(Default)]
pub struct StoreBuilder {
    codec: Option<Codec>,
    read_policy: ReadPolicy,
    duplicates: DuplicatePolicy,
    backend: Option<Box<dyn WatchBackend>>,
    debounce: Option<Duration>,
    hook: Option<ReloadHook>,
}

impl StoreBuilder {
    /// Builder preconfigured from settings; watching only when
    /// `watch.enabled` is set.
    pub fn from_settings(settings: &Settings) -> Self {
        let builder = Self::default()
            .duplicate_policy(settings.store.duplicate_names)
            .read_policy(settings.io.read_policy());

        if !settings.watch.enabled {
            return builder;
        }

        let backend = match settings.watch.backend {
            WatchBackendKind::Native => NotifyBackend::native(),
            WatchBackendKind::Poll => {
                NotifyBackend::poll(Duration::from_millis(settings.watch.poll_interval_ms))
            }
        };
        builder
            .backend(backend)
            .debounce(Duration::from_millis(settings.watch.debounce_ms))
    }

    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn read_policy(mut self, policy: ReadPolicy) -> Self {
        self.read_policy = policy;
        self
    }

    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    /// Watch tracked files with native OS notifications.
    pub fn watch(self) -> Self {
        self.backend(NotifyBackend::native())
    }

    /// Watch tracked files through `backend`.
    pub fn backend(mut self, backend: impl WatchBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Quiet period before a changed file is reloaded. Defaults to 300ms.
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = Some(debounce);
        self
    }

    /// Observe every background reconciliation.
    pub fn on_reload<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ReloadEvent) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> StoreResult<ResourceStore> {
        let core = Arc::new(StoreCore::new(
            self.codec.unwrap_or_default(),
            self.read_policy,
            self.duplicates,
        ));

        let watch = match self.backend {
            Some(backend) => {
                let handler: Weak<dyn ReloadHandler> = Arc::downgrade(&core) as Weak<dyn ReloadHandler>;
                Some(WatchSubsystem::start(
                    backend,
                    self.debounce.unwrap_or(DEFAULT_DEBOUNCE),
                    handler,
                    self.hook,
                )?)
            }
            None => None,
        };

        Ok(ResourceStore { core, watch })
    }
}
