//! Layered configuration for resman.
//!
//! Sources, later ones winning:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A configuration file: the one given explicitly, otherwise
//!    `resman.toml` in the platform config directory if it exists. The format
//!    follows the extension (`.toml`, `.yaml`/`.yml`, `.json`).
//! 3. Environment variables prefixed with `RESMAN_`; nested keys are split on
//!    a double underscore (`RESMAN_MANIFEST__NAME=Assets`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "RESMAN_";
const DEFAULT_FILE_NAME: &str = "resman.toml";

/// Naming of the manifest files inside each storage area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Base name of the manifest file, without suffix.
    pub name: String,
    /// Manifest file suffix, without the leading dot.
    pub suffix: String,
    /// Suffix appended to the full manifest file name for the crash-safety
    /// backup, without the leading dot.
    pub backup_suffix: String,
}
impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            name: "ResourceList".to_string(),
            suffix: "dat".to_string(),
            backup_suffix: "bak".to_string(),
        }
    }
}
impl ManifestConfig {
    /// `name.suffix`, identical in all three storage areas.
    pub fn file_name(&self) -> PathBuf {
        PathBuf::from(format!("{}.{}", self.name, self.suffix))
    }

    /// `name.suffix.backup_suffix`, next to the mutable-area manifest.
    pub fn backup_file_name(&self) -> PathBuf {
        PathBuf::from(format!("{}.{}.{}", self.name, self.suffix, self.backup_suffix))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the authoritative (downloaded) target manifest.
    pub remote_root: Option<PathBuf>,
    /// Immutable storage area shipped with the application.
    pub read_only_root: Option<PathBuf>,
    /// Mutable storage area for downloaded resources.
    pub read_write_root: Option<PathBuf>,
    pub manifest: ManifestConfig,
    /// Extension of resource files on disk, without the leading dot.
    pub resource_extension: String,
    /// Content variant selected when none is given on the command line.
    pub variant: Option<String>,
    /// Keep cached resources of other variants instead of purging them.
    pub keep_other_variants: bool,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            remote_root: None,
            read_only_root: None,
            read_write_root: None,
            manifest: ManifestConfig::default(),
            resource_extension: "dat".to_string(),
            variant: None,
            keep_other_variants: false,
        }
    }
}

impl Config {
    /// Load, merge and validate configuration.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) if !path.exists() => exn::bail!(ErrorKind::FileNotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_file().filter(|path| path.exists()),
        };
        if let Some(path) = &file {
            tracing::debug!(path = %path.display(), "Loading configuration file");
        }
        Self::extract(Self::figment(file.as_deref()))
    }

    /// The layered [`Figment`] without extracting it.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn extract(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// `resman.toml` inside the platform configuration directory.
    pub fn default_file() -> Option<PathBuf> {
        ProjectDirs::from("", "", "resman").map(|dirs| dirs.config_dir().join(DEFAULT_FILE_NAME))
    }

    /// Check settings that cannot be expressed in types.
    ///
    /// Storage roots are optional here: whether they are required depends on
    /// the command, and the resource checker enforces its own preconditions.
    pub fn validate(&self) -> Result<()> {
        let plain = |field: &'static str, value: &str| -> Result<()> {
            if value.is_empty() {
                exn::bail!(ErrorKind::Missing(field));
            }
            if value.contains(['/', '\\']) {
                exn::bail!(ErrorKind::Invalid { field, reason: format!("{value:?} contains a path separator") });
            }
            Ok(())
        };
        plain("manifest.name", &self.manifest.name)?;
        plain("manifest.suffix", &self.manifest.suffix)?;
        plain("manifest.backup_suffix", &self.manifest.backup_suffix)?;
        plain("resource_extension", &self.resource_extension)?;
        if let Some(variant) = &self.variant
            && (variant.is_empty() || variant.contains('.'))
        {
            exn::bail!(ErrorKind::Invalid { field: "variant", reason: format!("{variant:?} is not a variant tag") });
        }
        let roots = [
            ("remote_root", &self.remote_root),
            ("read_only_root", &self.read_only_root),
            ("read_write_root", &self.read_write_root),
        ];
        for (field, root) in roots {
            if root.as_ref().is_some_and(|root| root.as_os_str().is_empty()) {
                exn::bail!(ErrorKind::Missing(field));
            }
        }
        Ok(())
    }
}
