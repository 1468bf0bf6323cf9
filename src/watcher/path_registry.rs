//! Tracked-file registry and watch directory computation.
//!
//! The store refers to files by whatever path the caller used (often
//! relative), while notifications arrive with absolute paths. The registry
//! keeps both spellings so an event path can be resolved back to the tracked
//! path, and records which directories already have a subscription.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Registry for tracked files and their watch directories.
#[derive(Debug, Default)]
pub struct PathRegistry {
    /// Event-path spelling -> tracked path as given by the store.
    aliases: HashMap<PathBuf, PathBuf>,
    /// Tracked paths as given by the store.
    tracked: HashSet<PathBuf>,
    /// Directories that have an active subscription.
    watch_dirs: HashSet<PathBuf>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `path`, returning its directory if that directory is not watched yet.
    pub fn add_path(&mut self, path: &Path) -> Option<PathBuf> {
        if self.tracked.insert(path.to_path_buf()) {
            for alias in event_aliases(path) {
                self.aliases.insert(alias, path.to_path_buf());
            }
        }

        let dir = Self::watch_dir_for(path);
        if self.watch_dirs.contains(&dir) {
            None
        } else {
            Some(dir)
        }
    }

    /// Record that `dir` now has a subscription.
    pub fn mark_watched(&mut self, dir: PathBuf) -> bool {
        self.watch_dirs.insert(dir)
    }

    /// Stop tracking `path`.
    ///
    /// Does not release the directory subscription; other tracked files may
    /// live in the same directory.
    pub fn remove_path(&mut self, path: &Path) {
        if self.tracked.remove(path) {
            self.aliases.retain(|_, tracked| tracked != path);
        }
    }

    /// Resolve a path reported by a notification to the tracked path.
    pub fn resolve(&self, event_path: &Path) -> Option<PathBuf> {
        if let Some(tracked) = self.aliases.get(event_path) {
            return Some(tracked.clone());
        }
        event_aliases(event_path)
            .into_iter()
            .find_map(|alias| self.aliases.get(&alias).cloned())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.tracked.contains(path)
    }

    pub fn clear(&mut self) {
        self.aliases.clear();
        self.tracked.clear();
        self.watch_dirs.clear();
    }

    /// Absolute directory that must be watched to see changes to `path`.
    pub fn watch_dir_for(path: &Path) -> PathBuf {
        let absolute = absolute(path);
        match absolute.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Spellings under which notifications for `path` may arrive: the absolute
/// path, and the path with its directory canonicalized (symlinked temp dirs).
fn event_aliases(path: &Path) -> Vec<PathBuf> {
    let absolute = absolute(path);
    let mut aliases = vec![absolute.clone()];

    if let (Some(parent), Some(name)) = (absolute.parent(), absolute.file_name()) {
        if let Ok(canonical) = parent.canonicalize() {
            let canonical = canonical.join(name);
            if canonical != absolute {
                aliases.push(canonical);
            }
        }
    }

    aliases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_registry_basic() {
        let mut registry = PathRegistry::new();

        let first = registry.add_path(Path::new("/inventory/hardware.yaml"));
        assert_eq!(first, Some(PathBuf::from("/inventory")));
        registry.mark_watched(PathBuf::from("/inventory"));

        // Same directory: already watched
        let second = registry.add_path(Path::new("/inventory/services.yaml"));
        assert_eq!(second, None);

        let third = registry.add_path(Path::new("/other/site.yaml"));
        assert_eq!(third, Some(PathBuf::from("/other")));

        assert!(registry.contains(Path::new("/inventory/hardware.yaml")));
        assert!(registry.contains(Path::new("/inventory/services.yaml")));
        assert!(registry.contains(Path::new("/other/site.yaml")));
        // `/other` was offered but never marked, so it is offered again
        assert_eq!(
            registry.add_path(Path::new("/other/lab.yaml")),
            Some(PathBuf::from("/other"))
        );
    }

    #[test]
    fn test_unwatched_dir_is_offered_again() {
        let mut registry = PathRegistry::new();

        assert!(registry.add_path(Path::new("/inventory/a.yaml")).is_some());
        // Subscription failed, so the directory was never marked
        assert!(registry.add_path(Path::new("/inventory/b.yaml")).is_some());
    }

    #[test]
    fn test_relative_paths_resolve_from_absolute_events() {
        let mut registry = PathRegistry::new();
        registry.add_path(Path::new("config.yaml"));

        let event_path = std::env::current_dir().unwrap().join("config.yaml");
        assert_eq!(
            registry.resolve(&event_path),
            Some(PathBuf::from("config.yaml"))
        );
        assert_eq!(
            PathRegistry::watch_dir_for(Path::new("config.yaml")),
            std::env::current_dir().unwrap()
        );
    }

    #[test]
    fn test_path_registry_remove() {
        let mut registry = PathRegistry::new();

        let path = PathBuf::from("/inventory/config.yaml");
        registry.add_path(&path);
        assert!(registry.resolve(&path).is_some());

        registry.remove_path(&path);

        assert!(!registry.contains(&path));
        assert!(registry.resolve(&path).is_none());
    }

    #[test]
    fn test_untracked_event_paths_do_not_resolve() {
        let mut registry = PathRegistry::new();
        registry.add_path(Path::new("/inventory/config.yaml"));
        assert!(registry.resolve(Path::new("/inventory/.config.yaml.swp")).is_none());
    }
}
