// ABOUTME: What a dispatch updates: the workload plus how it can be patched or rebuilt.
// ABOUTME: Also computes the content fingerprint used as the image cache key.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::liveupdate::LiveUpdate;
use crate::runtime::traits::{BuildContext, CacheKey};
use crate::types::{ImageRef, TargetName, WorkloadRef};

/// How to build the target's image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    /// Repository the built image is tagged into.
    pub repository: ImageRef,
    pub context: PathBuf,
    pub dockerfile: String,
    pub build_args: BTreeMap<String, String>,
}

impl ImageSpec {
    pub fn new(repository: ImageRef, context: impl Into<PathBuf>) -> Self {
        Self {
            repository,
            context: context.into(),
            dockerfile: "Dockerfile".to_string(),
            build_args: BTreeMap::new(),
        }
    }

    pub fn build_context(&self) -> BuildContext {
        BuildContext {
            context_dir: self.context.clone(),
            dockerfile: self.dockerfile.clone(),
            build_args: self.build_args.clone(),
        }
    }

    /// Cache key for building this image from what is on disk now.
    ///
    /// Covers every file the build context uploads (relative path and
    /// contents) plus the dockerfile name and build args, so any edit inside
    /// the context yields a new key.
    pub fn cache_key(&self) -> io::Result<CacheKey> {
        let mut hasher = Sha256::new();
        hasher.update(self.dockerfile.as_bytes());
        hasher.update([0u8]);
        for (name, value) in &self.build_args {
            hasher.update(name.as_bytes());
            hasher.update([b'=']);
            hasher.update(value.as_bytes());
            hasher.update([0u8]);
        }
        hash_tree(&mut hasher, &self.context, Path::new(""))?;

        let digest = format!("{:x}", hasher.finalize());
        Ok(CacheKey {
            repository: self.repository.clone(),
            digest: digest[..16].to_string(),
        })
    }
}

/// Feed every entry under `dir` into `hasher` in name order.
///
/// Symlinked files are followed the way the context archive follows them.
/// Symlinked directories contribute their link target only.
fn hash_tree(hasher: &mut Sha256, dir: &Path, relative: &Path) -> io::Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let name = relative.join(entry.file_name());
        let file_type = entry.file_type()?;
        hasher.update(name.to_string_lossy().as_bytes());
        hasher.update([0u8]);

        if file_type.is_dir() {
            hash_tree(hasher, &path, &name)?;
        } else if file_type.is_symlink() && fs::metadata(&path).is_ok_and(|m| m.is_dir()) {
            hasher.update(fs::read_link(&path)?.to_string_lossy().as_bytes());
        } else {
            let contents = fs::read(&path)?;
            hasher.update((contents.len() as u64).to_le_bytes());
            hasher.update(&contents);
        }
        hasher.update([0u8]);
    }
    Ok(())
}

/// A workload and every way hotpatch knows to update it.
#[derive(Debug, Clone)]
pub struct BuildTarget {
    pub name: TargetName,
    pub workload: WorkloadRef,
    /// Directory relative change paths and compose contexts resolve against.
    pub project_dir: PathBuf,
    pub live_update: Option<LiveUpdate>,
    pub image: Option<ImageSpec>,
    pub manifest: Option<PathBuf>,
    pub compose_service: Option<String>,
}

impl BuildTarget {
    pub fn new(name: TargetName, workload: WorkloadRef, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            name,
            workload,
            project_dir: project_dir.into(),
            live_update: None,
            image: None,
            manifest: None,
            compose_service: None,
        }
    }

    pub fn with_live_update(mut self, live_update: LiveUpdate) -> Self {
        self.live_update = Some(live_update);
        self
    }

    pub fn with_image(mut self, image: ImageSpec) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_manifest(mut self, manifest: impl Into<PathBuf>) -> Self {
        self.manifest = Some(manifest.into());
        self
    }

    pub fn with_compose_service(mut self, service: impl Into<String>) -> Self {
        self.compose_service = Some(service.into());
        self
    }

    /// Directory a compose rebuild sends as its context.
    pub fn compose_context(&self) -> &Path {
        self.image
            .as_ref()
            .map(|image| image.context.as_path())
            .unwrap_or(&self.project_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a1").unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/b.txt"), "b1").unwrap();
        dir
    }

    fn spec(dir: &Path) -> ImageSpec {
        ImageSpec::new(ImageRef::parse("registry.local/web").unwrap(), dir)
    }

    fn digest(dir: &Path) -> String {
        spec(dir).cache_key().unwrap().digest
    }

    #[test]
    fn cache_key_is_deterministic() {
        let dir = context();
        assert_eq!(spec(dir.path()).cache_key().unwrap(), spec(dir.path()).cache_key().unwrap());
    }

    #[test]
    fn editing_any_file_in_context_changes_key() {
        let dir = context();
        let before = digest(dir.path());

        fs::write(dir.path().join("lib/b.txt"), "b2").unwrap();
        let after_b = digest(dir.path());
        assert_ne!(before, after_b);

        fs::write(dir.path().join("lib/b.txt"), "b1").unwrap();
        assert_eq!(digest(dir.path()), before, "same contents, same key");
    }

    #[test]
    fn adding_or_renaming_a_file_changes_key() {
        let dir = context();
        let before = digest(dir.path());

        fs::write(dir.path().join("c.txt"), "").unwrap();
        let added = digest(dir.path());
        assert_ne!(before, added);

        fs::rename(dir.path().join("c.txt"), dir.path().join("d.txt")).unwrap();
        assert_ne!(added, digest(dir.path()));
    }

    #[test]
    fn key_ignores_where_the_context_lives() {
        let first = context();
        let second = context();
        assert_eq!(digest(first.path()), digest(second.path()));
    }

    #[test]
    fn cache_key_depends_on_build_args() {
        let dir = context();
        let mut with_args = spec(dir.path());
        with_args
            .build_args
            .insert("NODE_ENV".to_string(), "production".to_string());
        assert_ne!(digest(dir.path()), with_args.cache_key().unwrap().digest);
    }

    #[test]
    fn cache_key_digest_is_hex() {
        let dir = context();
        let key = digest(dir.path());
        assert_eq!(key.len(), 16);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn missing_context_is_an_error() {
        let spec = spec(Path::new("/nonexistent/hotpatch/context"));
        assert!(spec.cache_key().is_err());
    }

    #[test]
    fn compose_context_prefers_image_context() {
        let target = BuildTarget::new(
            TargetName::new("web").unwrap(),
            WorkloadRef::parse("service/web").unwrap(),
            "/project",
        );
        assert_eq!(target.compose_context(), Path::new("/project"));

        let mut image = spec(Path::new("/project"));
        image.context = PathBuf::from("/project/web");
        let target = target.with_image(image);
        assert_eq!(target.compose_context(), Path::new("/project/web"));
    }
}
