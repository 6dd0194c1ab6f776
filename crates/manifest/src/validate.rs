//! Structural validation of decoded manifests.
//!
//! A manifest that deserializes cleanly can still be unusable: indexes that
//! point nowhere, the same resource listed twice, names that would map to a
//! path outside the storage root, or sizes that add up past `u64::MAX`. Every
//! check here fails with [`ErrorKind::Inconsistent`].

use crate::error::{ErrorKind, Result};
use crate::models::{LocalManifest, TargetManifest};
use std::collections::HashSet;

fn inconsistent(message: String) -> crate::error::Error {
    exn::Exn::from(ErrorKind::Inconsistent(message))
}

/// Names become relative file paths; anything that could climb out of the
/// storage root or is not a plain name is rejected up front.
fn check_name(name: &str, variant: Option<&str>) -> Result<()> {
    let bad_segment = name.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if name.is_empty() || bad_segment || name.contains(['\\', '\0']) {
        return Err(inconsistent(format!("unusable resource name {name:?}")));
    }
    if let Some(variant) = variant
        && (variant.is_empty() || variant.contains(['.', '/', '\\', '\0']))
    {
        return Err(inconsistent(format!("unusable variant {variant:?} on resource {name:?}")));
    }
    Ok(())
}

fn check_index(index: usize, len: usize, what: impl FnOnce() -> String) -> Result<()> {
    match index < len {
        true => Ok(()),
        false => Err(inconsistent(format!("{} references index {index} of {len}", what()))),
    }
}

impl TargetManifest {
    /// Verifies internal consistency.
    pub fn validate(&self) -> Result<()> {
        let asset_count = self.assets.len();
        let mut asset_names = HashSet::with_capacity(asset_count);
        for (index, asset) in self.assets.iter().enumerate() {
            if asset.name.is_empty() {
                return Err(inconsistent(format!("asset #{index} has no name")));
            }
            if !asset_names.insert(asset.name.as_str()) {
                return Err(inconsistent(format!("duplicate asset {:?}", asset.name)));
            }
            for &dependency in &asset.dependencies {
                check_index(dependency, asset_count, || format!("asset {:?}", asset.name))?;
                if dependency == index {
                    return Err(inconsistent(format!("asset {:?} depends on itself", asset.name)));
                }
            }
        }

        let mut names = HashSet::with_capacity(self.resources.len());
        let mut owned_assets = HashSet::with_capacity(asset_count);
        let (mut total_length, mut total_compressed_length) = (0u64, 0u64);
        for resource in &self.resources {
            check_name(&resource.name, resource.variant.as_deref())?;
            let name = resource.resource_name();
            // Every download and group total is a sum over a subset of these.
            total_length = total_length
                .checked_add(resource.length)
                .ok_or_else(|| inconsistent(format!("total length overflows at resource {name}")))?;
            total_compressed_length = total_compressed_length
                .checked_add(resource.compressed_length)
                .ok_or_else(|| inconsistent(format!("total compressed length overflows at resource {name}")))?;
            for &asset in &resource.assets {
                check_index(asset, asset_count, || format!("resource {name}"))?;
                if !owned_assets.insert(asset) {
                    return Err(inconsistent(format!("asset {:?} is packed into more than one resource", self.assets[asset].name)));
                }
            }
            if !names.insert(name) {
                return Err(inconsistent(format!("duplicate resource {}", resource.resource_name())));
            }
        }

        let mut group_names = HashSet::with_capacity(self.resource_groups.len());
        for group in &self.resource_groups {
            // The empty name is reserved for the implicit group of everything.
            if group.name.is_empty() {
                return Err(inconsistent("resource group with empty name".to_string()));
            }
            if !group_names.insert(group.name.as_str()) {
                return Err(inconsistent(format!("duplicate resource group {:?}", group.name)));
            }
            for &resource in &group.resources {
                check_index(resource, self.resources.len(), || format!("resource group {:?}", group.name))?;
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl LocalManifest {
    /// Verifies internal consistency.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::with_capacity(self.resources.len());
        for resource in &self.resources {
            check_name(&resource.name, resource.variant.as_deref())?;
            if !names.insert(resource.resource_name()) {
                return Err(inconsistent(format!("duplicate resource {}", resource.resource_name())));
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoadType, LocalResource, TargetAsset, TargetResource, TargetResourceGroup};
    use rstest::rstest;

    fn resource(name: &str, variant: Option<&str>, assets: Vec<usize>) -> TargetResource {
        TargetResource {
            name: name.to_string(),
            variant: variant.map(str::to_string),
            load_type: LoadType::LoadFromFile,
            length: 100,
            hash: 1,
            compressed_length: 50,
            compressed_hash: 2,
            assets,
        }
    }

    fn asset(name: &str, dependencies: Vec<usize>) -> TargetAsset {
        TargetAsset { name: name.to_string(), dependencies }
    }

    fn manifest() -> TargetManifest {
        TargetManifest {
            applicable_version: "1.0.0".to_string(),
            internal_version: 7,
            assets: vec![asset("Assets/UI/Main.prefab", vec![1]), asset("Assets/UI/Atlas.png", vec![])],
            resources: vec![resource("UI/Main", None, vec![0]), resource("UI/Atlas", Some("hd"), vec![1])],
            resource_groups: vec![TargetResourceGroup { name: "UI".to_string(), resources: vec![0, 1] }],
        }
    }

    #[test]
    fn test_valid_target() {
        assert!(manifest().is_valid());
    }

    #[test]
    fn test_same_name_different_variant_is_fine() {
        let mut m = manifest();
        m.resources.push(resource("UI/Atlas", Some("sd"), vec![]));
        m.resources.push(resource("UI/Atlas", None, vec![]));
        assert!(m.is_valid());
    }

    #[test]
    fn test_duplicate_resource() {
        let mut m = manifest();
        m.resources.push(resource("UI/Atlas", Some("hd"), vec![]));
        let err = m.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Inconsistent(msg) if msg.contains("duplicate resource")));
    }

    #[rstest]
    #[case::asset_dependency(|m: &mut TargetManifest| m.assets[0].dependencies.push(9))]
    #[case::self_dependency(|m: &mut TargetManifest| m.assets[1].dependencies.push(1))]
    #[case::resource_asset(|m: &mut TargetManifest| m.resources[0].assets.push(5))]
    #[case::shared_asset(|m: &mut TargetManifest| m.resources[1].assets.push(0))]
    #[case::group_resource(|m: &mut TargetManifest| m.resource_groups[0].resources.push(2))]
    #[case::empty_group_name(|m: &mut TargetManifest| m.resource_groups[0].name.clear())]
    #[case::duplicate_asset(|m: &mut TargetManifest| m.assets.push(asset("Assets/UI/Atlas.png", vec![])))]
    fn test_inconsistent_target(#[case] corrupt: fn(&mut TargetManifest)) {
        let mut m = manifest();
        corrupt(&mut m);
        assert!(!m.is_valid());
    }

    #[rstest]
    #[case::length(|r: &mut TargetResource| r.length = u64::MAX / 2 + 1)]
    #[case::compressed_length(|r: &mut TargetResource| r.compressed_length = u64::MAX / 2 + 1)]
    fn test_size_totals_must_fit(#[case] grow: fn(&mut TargetResource)) {
        let mut m = manifest();
        grow(&mut m.resources[0]);
        assert!(m.is_valid());
        grow(&mut m.resources[1]);
        let err = m.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Inconsistent(msg) if msg.contains("overflows")));
    }

    #[rstest]
    #[case("", None)]
    #[case("../escape", None)]
    #[case("UI//Main", None)]
    #[case("/UI/Main", None)]
    #[case("UI\\Main", None)]
    #[case("UI/Main", Some(""))]
    #[case("UI/Main", Some("h.d"))]
    fn test_unusable_names(#[case] name: &str, #[case] variant: Option<&str>) {
        let local = LocalManifest {
            resources: vec![LocalResource {
                name: name.to_string(),
                variant: variant.map(str::to_string),
                load_type: LoadType::LoadFromFile,
                length: 1,
                hash: 1,
            }],
        };
        assert!(!local.is_valid());
    }

    #[test]
    fn test_local_duplicates() {
        let entry = LocalResource {
            name: "UI/Main".to_string(),
            variant: None,
            load_type: LoadType::LoadFromFile,
            length: 1,
            hash: 1,
        };
        let local = LocalManifest { resources: vec![entry.clone(), entry] };
        assert!(!local.is_valid());
        assert!(LocalManifest::default().is_valid());
    }
}
