//! Read-only storage backend.
//!
//! The immutable storage area ships with the application and must never be
//! modified. Wrapping its backend in [`ReadOnlyBackend`] guarantees that,
//! whatever the caller does.

use async_trait::async_trait;
use std::path::Path;

use crate::{BackendHandle, StorageBackend, error::Result};

/// Passes reads through to `inner` and turns every mutation into a logged
/// no-op.
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tracing::info!(backend = self.name(), path = %path.display(), bytes = data.len(), "Skipping write to read-only storage");
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        tracing::info!(backend = self.name(), path = %path.display(), "Skipping delete in read-only storage");
        Ok(())
    }

    async fn rename(&self, from: &Path, _to: &Path) -> Result<()> {
        tracing::info!(backend = self.name(), path = %from.display(), "Skipping rename in read-only storage");
        Ok(())
    }

    async fn prune_empty_dirs(&self) -> Result<u64> {
        tracing::info!(backend = self.name(), "Skipping directory pruning in read-only storage");
        Ok(0)
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_mutations_are_dropped() {
        let inner: BackendHandle = Arc::new(MockBackend::with_files([("Main.dat", b"bundled".to_vec())]));
        let backend = ReadOnlyBackend::new(inner.clone());
        backend.delete(Path::new("Main.dat")).await.unwrap();
        backend.write(Path::new("Other.dat"), b"nope").await.unwrap();
        backend.rename(Path::new("Main.dat"), Path::new("Moved.dat")).await.unwrap();
        assert_eq!(inner.read(Path::new("Main.dat")).await.unwrap(), b"bundled");
        assert!(!inner.exists(Path::new("Other.dat")).await.unwrap());
        assert!(!inner.exists(Path::new("Moved.dat")).await.unwrap());
    }

    #[tokio::test]
    async fn test_reads_pass_through() {
        let inner: BackendHandle = Arc::new(MockBackend::with_files([("UI/Main.dat", b"12345".to_vec())]));
        let backend = ReadOnlyBackend::new(inner);
        assert!(backend.exists(Path::new("UI/Main.dat")).await.unwrap());
        assert_eq!(backend.read(Path::new("UI/Main.dat")).await.unwrap(), b"12345");
        assert_eq!(backend.name(), "mock");
        assert_eq!(backend.prune_empty_dirs().await.unwrap(), 0);
    }
}
