// ABOUTME: The set of changed local paths that triggered an update.
// ABOUTME: Ordered so that logging and matching are deterministic.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Files that changed since the workload was last updated.
///
/// Captured once per dispatch and shared read-only by every strategy attempt,
/// so fallback checks and trigger matching always see the same files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    paths: BTreeSet<PathBuf>,
}

impl ChangeSet {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduplicates_and_sorts() {
        let changes = ChangeSet::new(["/src/b.rs", "/src/a.rs", "/src/b.rs"]);
        let paths: Vec<_> = changes.iter().collect();
        assert_eq!(paths, vec![Path::new("/src/a.rs"), Path::new("/src/b.rs")]);
    }
}
