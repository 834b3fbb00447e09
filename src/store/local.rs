//! Directory-backed object store.
//!
//! Keys are paths relative to the root, always `/`-separated.

use crate::error::{DashboardError, Result};
use crate::store::{KeyFilter, ObjectStore};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Serves objects from a local directory tree.
pub struct LocalStore {
    /// Directory treated as the bucket root.
    pub root: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at `root`. The directory must exist.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(DashboardError::NotFound(format!(
                "Local store root {} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Resolve a key to a path under the root, rejecting anything that escapes it.
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(DashboardError::InvalidArgument(format!(
                "Invalid object key: {:?}",
                key
            )));
        }
        Ok(self.root.join(relative))
    }

    fn walk(&self, dir: &Path, out: &mut Vec<String>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                self.walk(&path, out)?;
            } else if let Ok(rel) = path.strip_prefix(&self.root) {
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(key);
            }
        }
        Ok(())
    }
}

impl ObjectStore for LocalStore {
    fn list(&self, prefix: &str, filter: &KeyFilter) -> Result<Vec<String>> {
        let mut all = Vec::new();
        self.walk(&self.root, &mut all)?;
        let mut keys: Vec<String> = all
            .into_iter()
            .filter(|k| k.starts_with(prefix) && filter.matches(k))
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        if !path.is_file() {
            return Err(DashboardError::NotFound(format!("object {}", key)));
        }
        Ok(fs::read(path)?)
    }

    fn location(&self) -> String {
        format!("file://{}", self.root.display())
    }
}
