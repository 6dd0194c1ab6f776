//! Plain-text rendering of check results and manifests.

use resman_checker::{CheckSummary, RecoveryOutcome, UpdateRequest};
use resman_manifest::models::{LocalManifest, TargetManifest};
use std::fmt::{Display, Formatter, Result as FmtResult};

pub struct Update<'a>(pub &'a UpdateRequest);
impl Display for Update<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let request = self.0;
        write!(
            f,
            "update  {:<40} {:>12} bytes  {:>12} compressed  {}",
            request.name.to_string(),
            request.length,
            request.compressed_length,
            request.load_type
        )
    }
}

pub struct Summary<'a> {
    pub summary: &'a CheckSummary,
    pub recovery: RecoveryOutcome,
}
impl Display for Summary<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let summary = self.summary;
        writeln!(f, "recovery: {}", self.recovery)?;
        writeln!(f, "removed:  {}", summary.removed_count)?;
        write!(
            f,
            "updates:  {} ({} bytes, {} compressed)",
            summary.update_count, summary.update_total_length, summary.update_total_compressed_length
        )?;
        for failure in &summary.failures {
            write!(f, "\nwarning:  {failure}")?;
        }
        Ok(())
    }
}

pub struct TargetListing<'a>(pub &'a TargetManifest);
impl Display for TargetListing<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let manifest = self.0;
        writeln!(f, "target manifest {} (build {})", manifest.applicable_version, manifest.internal_version)?;
        write!(f, "{} resources, {} assets", manifest.resources.len(), manifest.assets.len())?;
        for resource in &manifest.resources {
            write!(
                f,
                "\n  {:<40} {:>12} {:08x}  {:>12} {:08x}  {} asset(s)",
                resource.resource_name().to_string(),
                resource.length,
                resource.hash,
                resource.compressed_length,
                resource.compressed_hash,
                resource.assets.len()
            )?;
        }
        for group in &manifest.resource_groups {
            write!(f, "\ngroup {:?}: {} resource(s)", group.name, group.resources.len())?;
        }
        Ok(())
    }
}

pub struct LocalListing<'a>(pub &'a LocalManifest);
impl Display for LocalListing<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "local manifest, {} resources", self.0.resources.len())?;
        for resource in &self.0.resources {
            write!(
                f,
                "\n  {:<40} {:>12} {:08x}  {}",
                resource.resource_name().to_string(),
                resource.length,
                resource.hash,
                resource.load_type
            )?;
        }
        Ok(())
    }
}
