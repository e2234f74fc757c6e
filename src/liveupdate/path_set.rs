// ABOUTME: Path patterns anchored at a base directory, used for triggers and fallbacks.
// ABOUTME: A pattern matches itself, anything beneath it, or anything its glob accepts.

use glob::{MatchOptions, Pattern, PatternError};
use std::path::{Component, Path, PathBuf};

/// A set of path patterns resolved against a base directory.
///
/// Relative patterns are anchored at `base_dir`. A changed path matches when
/// it equals a pattern, sits inside a pattern that names a directory, or is
/// accepted by a pattern containing glob metacharacters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSet {
    patterns: Vec<String>,
    base_dir: PathBuf,
    resolved: Vec<Resolved>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolved {
    Prefix(PathBuf),
    Glob(Pattern),
}

impl PathSet {
    pub fn new(patterns: Vec<String>, base_dir: impl Into<PathBuf>) -> Result<Self, PatternError> {
        let base_dir = base_dir.into();
        let resolved = patterns
            .iter()
            .map(|p| resolve_pattern(p, &base_dir))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns,
            base_dir,
            resolved,
        })
    }

    /// The patterns exactly as declared.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, path: &Path) -> bool {
        let path = normalize(&self.base_dir.join(path));
        self.resolved.iter().any(|r| match r {
            Resolved::Prefix(prefix) => path.starts_with(prefix),
            Resolved::Glob(pattern) => pattern.matches_path_with(&path, glob_options()),
        })
    }

    /// The first of `paths` this set matches.
    pub fn first_match<'a>(&self, paths: impl IntoIterator<Item = &'a Path>) -> Option<&'a Path> {
        paths.into_iter().find(|p| self.matches(p))
    }
}

fn resolve_pattern(pattern: &str, base_dir: &Path) -> Result<Resolved, PatternError> {
    let anchored = normalize(&base_dir.join(pattern));
    if pattern.contains(['*', '?', '[']) {
        Pattern::new(&anchored.to_string_lossy()).map(Resolved::Glob)
    } else {
        Ok(Resolved::Prefix(anchored))
    }
}

fn glob_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// Lexically drop `.` and resolve `..` without touching the filesystem.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
