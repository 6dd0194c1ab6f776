//! In-memory storage backend for testing.

use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// A storage area held in memory.
///
/// Files live in a `BTreeMap` behind a [`RwLock`]. Paths can additionally be
/// *denied*, making every read or mutation of them fail with
/// [`PermissionDenied`](ErrorKind::PermissionDenied), which is how tests
/// exercise best-effort failure paths.
///
/// # Examples
///
/// ```
/// use resman_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([("UI/Main.dat", b"bytes")]);
/// assert!(backend.exists(Path::new("UI/Main.dat")).await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    denied: HashSet<PathBuf>,
    prune_denied: bool,
}

impl MockBackend {
    /// An area holding `files`.
    ///
    /// Panics on a path that fails validation.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let files = files.into_iter().map(|(path, data)| (Self::checked(path.into()), data.into())).collect();
        Self { name: "mock".to_string(), files: RwLock::new(files), denied: HashSet::new(), prune_denied: false }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make every operation touching `path` fail with `PermissionDenied`.
    pub fn deny(mut self, path: impl Into<PathBuf>) -> Self {
        self.denied.insert(Self::checked(path.into()));
        self
    }

    /// Make [`prune_empty_dirs`](StorageBackend::prune_empty_dirs) fail.
    pub fn deny_prune(mut self) -> Self {
        self.prune_denied = true;
        self
    }

    /// Stored paths, sorted.
    pub async fn paths(&self) -> Vec<PathBuf> {
        self.files.read().await.keys().cloned().collect()
    }

    fn checked(path: PathBuf) -> PathBuf {
        let Ok(validated) = validate_path(&path) else {
            panic!("MockBackend: invalid path {}", path.display());
        };
        validated
    }

    fn guard(&self, path: &Path) -> Result<PathBuf> {
        let path = validate_path(path)?;
        if self.denied.contains(&path) {
            exn::bail!(ErrorKind::PermissionDenied(path));
        }
        Ok(path)
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.files.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = self.guard(path)?;
        let files = self.files.read().await;
        let data = files.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        Ok(data.clone())
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = self.guard(path)?;
        self.files.write().await.insert(path, data.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = self.guard(path)?;
        match self.files.write().await.remove(&path) {
            Some(_) => Ok(()),
            None => exn::bail!(ErrorKind::NotFound(path)),
        }
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let (from, to) = (self.guard(from)?, self.guard(to)?);
        let mut files = self.files.write().await;
        let Some(data) = files.remove(&from) else {
            exn::bail!(ErrorKind::NotFound(from));
        };
        files.insert(to, data);
        Ok(())
    }

    async fn prune_empty_dirs(&self) -> Result<u64> {
        if self.prune_denied {
            exn::bail!(ErrorKind::PermissionDenied(PathBuf::from(".")));
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read() {
        let backend = MockBackend::default();
        backend.write(Path::new("Main.dat"), b"hello").await.unwrap();
        assert_eq!(backend.read(Path::new("Main.dat")).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let backend = MockBackend::default();
        let err = backend.read(Path::new("missing.dat")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_and_rename() {
        let backend = MockBackend::with_files([("old.dat", b"data".to_vec())]);
        backend.rename(Path::new("old.dat"), Path::new("new.dat")).await.unwrap();
        assert_eq!(backend.paths().await, vec![PathBuf::from("new.dat")]);
        backend.delete(Path::new("new.dat")).await.unwrap();
        assert!(backend.paths().await.is_empty());
        let err = backend.delete(Path::new("new.dat")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_denied_paths() {
        let backend = MockBackend::with_files([("locked.dat", b"data".to_vec())]).deny("locked.dat");
        let err = backend.delete(Path::new("locked.dat")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
        assert!(backend.read(Path::new("locked.dat")).await.is_err());
        // Existence checks still answer truthfully.
        assert!(backend.exists(Path::new("locked.dat")).await.unwrap());
    }

    #[tokio::test]
    async fn test_prune_is_noop() {
        let backend = MockBackend::with_files([("UI/Main.dat", b"a".to_vec())]);
        assert_eq!(backend.prune_empty_dirs().await.unwrap(), 0);
        let err = backend.deny_prune().prune_empty_dirs().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files([("../escape", b"bad".to_vec())]);
    }
}
