//! Store entries and the duplicate-name policy.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::resource::Resource;

/// A resource paired with the file it was loaded from or will be saved to.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub resource: Resource,
    pub file: PathBuf,
}

impl Entry {
    pub fn new(resource: Resource, file: impl Into<PathBuf>) -> Self {
        Self {
            resource,
            file: file.into(),
        }
    }

    pub fn is_in(&self, file: &Path) -> bool {
        self.file == file
    }
}

/// What to do when a name is already present somewhere in the store.
///
/// Applies to `add` and to every batch load or reload. With `Reject`, a
/// conflicting batch is refused as a whole and the file keeps its previous
/// entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    Allow,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "allow" => Ok(Self::Allow),
            other => Err(format!(
                "unknown duplicate policy '{other}', expected 'reject' or 'allow'"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_policy_parsing() {
        assert_eq!("reject".parse::<DuplicatePolicy>(), Ok(DuplicatePolicy::Reject));
        assert_eq!("ALLOW".parse::<DuplicatePolicy>(), Ok(DuplicatePolicy::Allow));
        assert!("merge".parse::<DuplicatePolicy>().is_err());
        assert_eq!(DuplicatePolicy::default(), DuplicatePolicy::Reject);
    }

    #[test]
    fn test_entry_file_match() {
        let entry = Entry::new(Resource::new(crate::resource::Kind::Server, "srv01"), "a.yaml");
        assert!(entry.is_in(Path::new("a.yaml")));
        assert!(!entry.is_in(Path::new("b.yaml")));
    }
}
