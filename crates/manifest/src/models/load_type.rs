use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// How the resource loader is expected to open a resource file.
///
/// The checker never interprets this beyond equality: a local copy recorded
/// with a different load type than the target manifest is not a usable copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    #[default]
    LoadFromFile,
    LoadFromMemory,
    LoadFromMemoryAndQuickDecrypt,
    LoadFromMemoryAndDecrypt,
    LoadFromBinary,
    LoadFromBinaryAndQuickDecrypt,
    LoadFromBinaryAndDecrypt,
}
impl LoadType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadType::LoadFromFile => "load_from_file",
            LoadType::LoadFromMemory => "load_from_memory",
            LoadType::LoadFromMemoryAndQuickDecrypt => "load_from_memory_and_quick_decrypt",
            LoadType::LoadFromMemoryAndDecrypt => "load_from_memory_and_decrypt",
            LoadType::LoadFromBinary => "load_from_binary",
            LoadType::LoadFromBinaryAndQuickDecrypt => "load_from_binary_and_quick_decrypt",
            LoadType::LoadFromBinaryAndDecrypt => "load_from_binary_and_decrypt",
        }
    }

    /// Binary resources are handed to the caller as raw bytes rather than
    /// being opened as an asset bundle.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            LoadType::LoadFromBinary | LoadType::LoadFromBinaryAndQuickDecrypt | LoadType::LoadFromBinaryAndDecrypt
        )
    }
}
impl Display for LoadType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
