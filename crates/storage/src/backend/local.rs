//! Local filesystem storage backend.
//!
//! Files are stored below a configured root directory and accessed through
//! `tokio::fs` for async I/O.

use crate::error::ErrorKind;
use crate::{StorageBackend, error::Result, path::validate as validate_path};
use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;

/// A storage area backed by a directory.
///
/// # Examples
///
/// ```no_run
/// use resman_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("read-write", "/var/lib/game/resources")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Open the area rooted at `root`, creating the directory when missing.
    ///
    /// # Errors
    ///
    /// [`InvalidPath`](ErrorKind::InvalidPath) for a relative root or one
    /// that exists but is not a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        match (root.is_absolute(), root.exists()) {
            (false, _) => exn::bail!(ErrorKind::InvalidPath(root)),
            (true, true) if !root.is_dir() => exn::bail!(ErrorKind::InvalidPath(root)),
            (true, true) => {},
            (true, false) => std::fs::create_dir_all(&root).map_err(|e| Self::map_io_error(e, &root))?,
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        Ok(self.root.join(validate_path(path)?))
    }

    fn map_io_error(error: std::io::Error, path: &Path) -> ErrorKind {
        use std::io::ErrorKind as Io;
        match error.kind() {
            Io::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            Io::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(error),
        }
    }

    async fn ensure_parent(full: &Path, path: &Path) -> Result<()> {
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        Ok(())
    }

    /// Depth-first removal of empty directories below `dir`. Resolves to
    /// whether `dir` itself ended up empty, plus the number of removals.
    ///
    /// Only a failure to read `dir` itself is an error. A child that cannot
    /// be inspected or removed is logged and kept, and pruning goes on with
    /// its siblings.
    fn prune_dir<'a>(&'a self, dir: PathBuf) -> Pin<Box<dyn Future<Output = Result<(bool, u64)>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = fs::read_dir(&dir).await.map_err(|e| Self::map_io_error(e, &dir))?;
            let mut empty = true;
            let mut removed = 0;
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(backend = self.name(), dir = %dir.display(), error = %e, "Could not read directory entry");
                        empty = false;
                        break;
                    },
                };
                let path = entry.path();
                match entry.file_type().await {
                    Ok(file_type) if file_type.is_dir() => {},
                    Ok(_) => {
                        empty = false;
                        continue;
                    },
                    Err(e) => {
                        tracing::warn!(backend = self.name(), path = %path.display(), error = %e, "Could not inspect entry");
                        empty = false;
                        continue;
                    },
                }
                let child_empty = match self.prune_dir(path.clone()).await {
                    Ok((child_empty, child_removed)) => {
                        removed += child_removed;
                        child_empty
                    },
                    Err(e) => {
                        tracing::warn!(backend = self.name(), path = %path.display(), error = ?e, "Could not prune directory");
                        false
                    },
                };
                if !child_empty {
                    empty = false;
                    continue;
                }
                match fs::remove_dir(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        tracing::warn!(backend = self.name(), path = %path.display(), error = %e, "Could not remove empty directory");
                        empty = false;
                    },
                }
            }
            Ok((empty, removed))
        })
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let full = self.resolve(path)?;
        Ok(fs::try_exists(&full).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        Ok(fs::read(&full).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        Self::ensure_parent(&full, path).await?;
        Ok(fs::write(&full, data).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let full = self.resolve(path)?;
        Ok(fs::remove_file(&full).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let (source, destination) = (self.resolve(from)?, self.resolve(to)?);
        Self::ensure_parent(&destination, to).await?;
        // Atomic on a single filesystem, which a storage area always is.
        Ok(fs::rename(&source, &destination).await.map_err(|e| Self::map_io_error(e, from))?)
    }

    async fn prune_empty_dirs(&self) -> Result<u64> {
        let (_root_empty, removed) = self.prune_dir(self.root.clone()).await?;
        tracing::debug!(backend = self.name(), removed, "Pruned empty directories");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("read-write", temp_dir.path()).unwrap();
        (temp_dir, backend)
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("name", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("name", "relative/path").is_err());
        assert!(LocalBackend::new("name", "./relative").is_err());
    }

    #[test]
    fn test_new_creates_missing_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("not/yet/there");
        let backend = LocalBackend::new("name", &root).unwrap();
        assert!(root.is_dir());
        assert_eq!(backend.root(), root);
    }

    #[test]
    fn test_resolve_stays_below_root() {
        let (temp_dir, backend) = backend();
        assert_eq!(backend.resolve(Path::new("UI/Main.dat")).unwrap(), temp_dir.path().join("UI/Main.dat"));
        assert!(backend.resolve(Path::new("../escape.dat")).is_err());
        assert_eq!(backend.resolve(Path::new("/etc/passwd")).unwrap(), temp_dir.path().join("etc/passwd"));
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("ResourceList.dat");
        std::fs::write(&file, b"x").unwrap();
        let err = LocalBackend::new("name", &file).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let (_temp_dir, backend) = backend();
        backend.write(Path::new("a/b/Main.dat"), b"payload").await.unwrap();
        assert_eq!(backend.read(Path::new("a/b/Main.dat")).await.unwrap(), b"payload");
        backend.delete(Path::new("a/b/Main.dat")).await.unwrap();
        assert!(!backend.exists(Path::new("a/b/Main.dat")).await.unwrap());
        let err = backend.delete(Path::new("a/b/Main.dat")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let (_temp_dir, backend) = backend();
        let err = backend.read(Path::new("ResourceList.dat")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rename_overwrites_destination() {
        let (_temp_dir, backend) = backend();
        backend.write(Path::new("ResourceList.dat"), b"half-written").await.unwrap();
        backend.write(Path::new("ResourceList.dat.bak"), b"complete").await.unwrap();
        backend.rename(Path::new("ResourceList.dat.bak"), Path::new("ResourceList.dat")).await.unwrap();
        assert!(!backend.exists(Path::new("ResourceList.dat.bak")).await.unwrap());
        assert_eq!(backend.read(Path::new("ResourceList.dat")).await.unwrap(), b"complete");
    }

    #[tokio::test]
    async fn test_prune_empty_dirs() {
        let (temp_dir, backend) = backend();
        backend.write(Path::new("keep/Main.dat"), b"a").await.unwrap();
        backend.write(Path::new("gone/deeper/Old.dat"), b"b").await.unwrap();
        backend.delete(Path::new("gone/deeper/Old.dat")).await.unwrap();
        std::fs::create_dir_all(temp_dir.path().join("keep/empty")).unwrap();

        let removed = backend.prune_empty_dirs().await.unwrap();
        assert_eq!(removed, 3);
        assert!(!temp_dir.path().join("gone").exists());
        assert!(!temp_dir.path().join("keep/empty").exists());
        assert!(temp_dir.path().join("keep/Main.dat").exists());
        assert!(temp_dir.path().is_dir());
        // Nothing left to prune.
        assert_eq!(backend.prune_empty_dirs().await.unwrap(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_prune_skips_unreadable_directories() {
        use std::os::unix::fs::PermissionsExt;

        let (temp_dir, backend) = backend();
        let locked = temp_dir.path().join("locked");
        std::fs::create_dir_all(locked.join("inner")).unwrap();
        std::fs::create_dir_all(temp_dir.path().join("empty/deeper")).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        // Privileged users read through permissions; nothing to test then.
        let readable = std::fs::read_dir(&locked).is_ok();

        let removed = backend.prune_empty_dirs().await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }
        assert_eq!(removed.unwrap(), 2);
        assert!(!temp_dir.path().join("empty").exists());
        assert!(locked.join("inner").is_dir());
    }
}
