//! Storage backend trait and implementations.
//!
//! A resource check talks to three storage areas: the remote area holding the
//! authoritative manifest, the immutable area bundled with the application,
//! and the mutable area holding previously downloaded resources. All three are
//! a [`StorageBackend`], so the checker never cares whether bytes come from a
//! directory, a read-only bundle, or memory.

mod local;
#[cfg(feature = "mock")]
mod mock;
mod ro;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// A storage area holding manifests and resource files.
///
/// All operations are asynchronous; a backend is free to run them on a thread
/// pool, an I/O driver, or not at all (in memory).
///
/// # Paths
/// Paths are relative to the area root. Implementations reject anything
/// [`validate_path`](crate::validate_path) refuses.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use resman_storage::{backend::StorageBackend, error::Result};
///
/// async fn manifest_size(backend: &dyn StorageBackend) -> Result<u64> {
///     let path = Path::new("ResourceList.dat");
///     if backend.exists(path).await? {
///         Ok(backend.read(path).await?.len() as u64)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Whether a file is present.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// The whole contents of a file, or
    /// [`NotFound`](crate::error::ErrorKind::NotFound).
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents, creating parent directories as needed.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Remove a single file. A missing file is
    /// [`NotFound`](crate::error::ErrorKind::NotFound).
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Move a file inside this area, replacing whatever is at `to` and
    /// creating its parent directories.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Remove every empty directory below the storage root (never the root
    /// itself), returning how many were removed.
    ///
    /// Backends without real directories have nothing to prune.
    async fn prune_empty_dirs(&self) -> Result<u64> {
        Ok(0)
    }
}
