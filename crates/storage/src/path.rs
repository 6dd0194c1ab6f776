//! Path validation for storage-relative paths.
//!
//! Resource names in a manifest end up as file paths below a storage root.
//! A hostile or broken manifest must never be able to point outside of it.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Normalizes a storage-relative path and rejects anything escaping the root.
///
/// `..` is resolved lexically; popping past the root, null bytes, Windows
/// prefixes and paths that normalize to nothing are all
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use resman_storage::validate_path;
/// assert!(validate_path("UI/Main.hd.dat").is_ok());
/// assert!(validate_path("UI/../Main.dat").is_ok());
/// assert!(validate_path("../ResourceList.dat").is_err());
/// assert!(validate_path("a\0b").is_err());
/// assert_eq!(
///     validate_path("./UI//Atlas/../Main.dat/").unwrap(),
///     Path::new("UI/Main.dat")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || exn::Exn::from(ErrorKind::InvalidPath(original.to_path_buf()));
    let mut normalized = PathBuf::new();
    for component in original.components() {
        match component {
            // Null bytes survive Path::components() on Unix but truncate in syscalls.
            Component::Normal(part) if part.as_encoded_bytes().contains(&0) => return Err(invalid()),
            Component::Normal(part) => normalized.push(part),
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => return Err(invalid()),
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(invalid());
                }
            },
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(invalid());
    }
    Ok(normalized)
}
