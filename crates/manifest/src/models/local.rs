use super::{LoadType, ResourceName};
use serde::{Deserialize, Serialize};

/// A resource file recorded as present in a local storage area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalResource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default)]
    pub load_type: LoadType,
    pub length: u64,
    pub hash: u32,
}
impl LocalResource {
    pub fn resource_name(&self) -> ResourceName {
        ResourceName::new(self.name.clone(), self.variant.clone())
    }
}

/// Manifest of what is actually present in the immutable or the mutable
/// storage area. Both areas share this shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalManifest {
    #[serde(default)]
    pub resources: Vec<LocalResource>,
}
