//! Named resource groups with running size totals.

use resman_manifest::models::{ResourceName, TargetManifest};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Name of the implicit group containing every wanted resource.
pub const DEFAULT_GROUP: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Sizes {
    length: u64,
    compressed_length: u64,
}

/// A named subset of the wanted resources.
///
/// Totals are updated as resources are added; readiness is filled in by the
/// reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroup {
    name: String,
    resources: BTreeMap<ResourceName, Sizes>,
    total_length: u64,
    total_compressed_length: u64,
    ready: HashSet<ResourceName>,
    ready_length: u64,
}

impl ResourceGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: BTreeMap::new(),
            total_length: 0,
            total_compressed_length: 0,
            ready: HashSet::new(),
            ready_length: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_GROUP
    }

    /// Adds a resource, returning `false` if it was already a member.
    pub fn add(&mut self, resource: ResourceName, length: u64, compressed_length: u64) -> bool {
        if self.resources.contains_key(&resource) {
            return false;
        }
        self.total_length = self.total_length.saturating_add(length);
        self.total_compressed_length = self.total_compressed_length.saturating_add(compressed_length);
        self.resources.insert(resource, Sizes { length, compressed_length });
        true
    }

    /// Marks a member as usable without downloading. Non-members and repeat
    /// calls are ignored.
    pub fn mark_ready(&mut self, resource: &ResourceName) {
        let Some(sizes) = self.resources.get(resource) else {
            return;
        };
        if self.ready.insert(resource.clone()) {
            self.ready_length = self.ready_length.saturating_add(sizes.length);
        }
    }

    pub fn contains(&self, resource: &ResourceName) -> bool {
        self.resources.contains_key(resource)
    }

    /// Member names in sorted order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceName> {
        self.resources.keys()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn total_compressed_length(&self) -> u64 {
        self.total_compressed_length
    }

    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }

    pub fn ready_length(&self) -> u64 {
        self.ready_length
    }

    pub fn is_ready(&self) -> bool {
        self.ready.len() == self.resources.len()
    }

    /// Ready share of the uncompressed bytes, between 0 and 1. An empty group
    /// is complete.
    pub fn progress(&self) -> f64 {
        match self.total_length {
            0 => 1.0,
            total => self.ready_length as f64 / total as f64,
        }
    }
}

/// All groups of one target manifest, keyed by name, always including the
/// default group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroups {
    groups: HashMap<String, ResourceGroup>,
}
impl Default for ResourceGroups {
    fn default() -> Self {
        Self { groups: HashMap::from([(DEFAULT_GROUP.to_string(), ResourceGroup::new(DEFAULT_GROUP))]) }
    }
}

impl ResourceGroups {
    /// Build the default group and the named groups from the resources wanted
    /// while `variant` is selected.
    ///
    /// A named group keeps its name even when none of its resources match the
    /// variant.
    pub fn project(manifest: &TargetManifest, variant: Option<&str>) -> Self {
        let mut groups = Self::default();
        let wanted = |index: usize| {
            manifest.resources.get(index).filter(|resource| resource.resource_name().matches_variant(variant))
        };
        let default = groups.groups.entry(DEFAULT_GROUP.to_string()).or_insert_with(|| ResourceGroup::new(DEFAULT_GROUP));
        for resource in (0..manifest.resources.len()).filter_map(wanted) {
            default.add(resource.resource_name(), resource.length, resource.compressed_length);
        }
        for target_group in &manifest.resource_groups {
            let group = groups
                .groups
                .entry(target_group.name.clone())
                .or_insert_with(|| ResourceGroup::new(target_group.name.clone()));
            for resource in target_group.resources.iter().filter_map(|&index| wanted(index)) {
                group.add(resource.resource_name(), resource.length, resource.compressed_length);
            }
        }
        groups
    }

    pub fn get(&self, name: &str) -> Option<&ResourceGroup> {
        self.groups.get(name)
    }

    pub fn default_group(&self) -> &ResourceGroup {
        // Present from construction on; only `project` and `default` build
        // this type.
        &self.groups[DEFAULT_GROUP]
    }

    /// Marks `resource` ready in every group containing it.
    pub fn mark_ready(&mut self, resource: &ResourceName) {
        for group in self.groups.values_mut() {
            group.mark_ready(resource);
        }
    }

    /// Groups sorted by name, the default group first.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceGroup> {
        let mut groups: Vec<_> = self.groups.values().collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        groups.into_iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resman_manifest::models::{LoadType, TargetResource, TargetResourceGroup};

    fn resource(name: &str, variant: Option<&str>, length: u64) -> TargetResource {
        TargetResource {
            name: name.to_string(),
            variant: variant.map(str::to_string),
            load_type: LoadType::LoadFromFile,
            length,
            hash: 1,
            compressed_length: length / 4,
            compressed_hash: 2,
            assets: vec![],
        }
    }

    fn manifest() -> TargetManifest {
        TargetManifest {
            applicable_version: "1.0".to_string(),
            internal_version: 3,
            assets: vec![],
            resources: vec![
                resource("UI", None, 400),
                resource("Atlas", Some("hd"), 800),
                resource("Atlas", Some("sd"), 200),
                resource("Music", None, 1000),
            ],
            resource_groups: vec![
                TargetResourceGroup { name: "Menu".to_string(), resources: vec![0, 1, 2] },
                TargetResourceGroup { name: "HdOnly".to_string(), resources: vec![1] },
            ],
        }
    }

    #[test]
    fn test_projection_totals() {
        let groups = ResourceGroups::project(&manifest(), Some("sd"));
        assert_eq!(groups.len(), 3);

        let default = groups.default_group();
        assert!(default.is_default());
        assert_eq!(default.resource_count(), 3);
        assert_eq!(default.total_length(), 1600);
        assert_eq!(default.total_compressed_length(), 400);

        let menu = groups.get("Menu").unwrap();
        assert_eq!(menu.resource_count(), 2);
        assert_eq!(menu.total_length(), 600);
        assert!(menu.contains(&ResourceName::new("Atlas", Some("sd"))));
        assert!(!menu.contains(&ResourceName::new("Atlas", Some("hd"))));

        let hd_only = groups.get("HdOnly").unwrap();
        assert_eq!(hd_only.resource_count(), 0);
        assert_eq!(hd_only.progress(), 1.0);
    }

    #[test]
    fn test_readiness() {
        let mut groups = ResourceGroups::project(&manifest(), Some("sd"));
        groups.mark_ready(&ResourceName::universal("UI"));
        groups.mark_ready(&ResourceName::universal("UI"));
        groups.mark_ready(&ResourceName::new("Atlas", Some("hd")));

        let menu = groups.get("Menu").unwrap();
        assert_eq!(menu.ready_count(), 1);
        assert_eq!(menu.ready_length(), 400);
        assert!((menu.progress() - 400.0 / 600.0).abs() < f64::EPSILON);
        assert!(!menu.is_ready());
        assert_eq!(groups.default_group().ready_length(), 400);
    }

    #[test]
    fn test_iteration_order() {
        let groups = ResourceGroups::project(&manifest(), None);
        let names: Vec<_> = groups.iter().map(ResourceGroup::name).collect();
        assert_eq!(names, ["", "HdOnly", "Menu"]);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut group = ResourceGroup::new("Menu");
        assert!(group.add(ResourceName::universal("UI"), 10, 5));
        assert!(!group.add(ResourceName::universal("UI"), 10, 5));
        assert_eq!(group.total_length(), 10);
    }

    #[test]
    fn test_totals_saturate() {
        let mut group = ResourceGroup::new("Huge");
        group.add(ResourceName::universal("A"), u64::MAX / 2 + 1, u64::MAX);
        group.add(ResourceName::universal("B"), u64::MAX / 2 + 1, 1);
        assert_eq!(group.total_length(), u64::MAX);
        assert_eq!(group.total_compressed_length(), u64::MAX);
        group.mark_ready(&ResourceName::universal("A"));
        group.mark_ready(&ResourceName::universal("B"));
        assert_eq!(group.ready_length(), u64::MAX);
        assert!(group.is_ready());
    }
}
