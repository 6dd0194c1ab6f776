use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

/// Identity of a resource: a base name plus an optional variant tag.
///
/// Two names are equal iff both the name and the variant match exactly; a
/// resource without a variant is universal and is *not* equal to any of its
/// variant-tagged siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceName {
    name: String,
    variant: Option<String>,
}
impl ResourceName {
    pub fn new(name: impl Into<String>, variant: Option<impl Into<String>>) -> Self {
        Self { name: name.into(), variant: variant.map(Into::into) }
    }

    /// Shorthand for a variant-agnostic name.
    pub fn universal(name: impl Into<String>) -> Self {
        Self { name: name.into(), variant: None }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// Whether a resource with this name is wanted while `current` is the
    /// selected content variant.
    #[must_use]
    pub fn matches_variant(&self, current: Option<&str>) -> bool {
        match self.variant.as_deref() {
            None => true,
            Some(variant) => current == Some(variant),
        }
    }

    /// Path of the resource file relative to a storage root:
    /// `name[.variant].extension`.
    #[must_use]
    pub fn file_path(&self, extension: &str) -> PathBuf {
        PathBuf::from(format!("{self}.{extension}"))
    }
}
impl Display for ResourceName {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.variant {
            Some(variant) => write!(f, "{}.{}", self.name, variant),
            None => f.write_str(&self.name),
        }
    }
}
