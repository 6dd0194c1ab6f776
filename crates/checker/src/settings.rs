use resman_config::Config;
use std::path::PathBuf;

/// File naming and policy knobs of a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerSettings {
    /// Manifest path relative to each storage root.
    pub manifest_file: PathBuf,
    /// Backup of the mutable-area manifest, relative to its root.
    pub backup_file: PathBuf,
    /// Extension of resource files, without the leading dot.
    pub resource_extension: String,
    /// Keep cached resources that the target lists under another variant.
    pub keep_other_variants: bool,
}

impl Default for CheckerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for CheckerSettings {
    fn from(config: &Config) -> Self {
        Self {
            manifest_file: config.manifest.file_name(),
            backup_file: config.manifest.backup_file_name(),
            resource_extension: config.resource_extension.clone(),
            keep_other_variants: config.keep_other_variants,
        }
    }
}
