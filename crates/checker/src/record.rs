//! Per-resource accumulation of the three manifest observations and the
//! disposition state machine.

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use resman_manifest::models::{LoadType, LocalResource, ResourceName, TargetResource};

/// What the target manifest says about a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetObservation {
    pub load_type: LoadType,
    pub length: u64,
    pub hash: u32,
    pub compressed_length: u64,
    pub compressed_hash: u32,
}
impl From<&TargetResource> for TargetObservation {
    fn from(resource: &TargetResource) -> Self {
        Self {
            load_type: resource.load_type,
            length: resource.length,
            hash: resource.hash,
            compressed_length: resource.compressed_length,
            compressed_hash: resource.compressed_hash,
        }
    }
}

/// What one of the local manifests says about a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalObservation {
    pub load_type: LoadType,
    pub length: u64,
    pub hash: u32,
}
impl LocalObservation {
    /// A local copy satisfies the target only if load type, length and hash
    /// are all identical.
    pub fn matches(&self, target: &TargetObservation) -> bool {
        self.load_type == target.load_type && self.length == target.length && self.hash == target.hash
    }
}
impl From<&LocalResource> for LocalObservation {
    fn from(resource: &LocalResource) -> Self {
        Self { load_type: resource.load_type, length: resource.length, hash: resource.hash }
    }
}

/// Outcome of reconciling one resource.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Wanted, and an identical copy ships in the immutable area.
    StorageInReadOnly,
    /// Wanted, and an identical copy was downloaded before.
    StorageInReadWrite,
    /// Wanted, but no usable copy exists.
    NeedUpdate,
    /// Cached but no longer wanted; the file gets deleted.
    Disuse,
    /// Neither wanted nor cached.
    Unavailable,
}
impl Disposition {
    /// Whether the resource can be loaded without downloading anything.
    pub fn is_ready(self) -> bool {
        matches!(self, Self::StorageInReadOnly | Self::StorageInReadWrite)
    }
}

/// Final classification of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub disposition: Disposition,
    pub needs_removal: bool,
}

/// The precedence table; the first matching rule wins.
///
/// `keep_other_variant` is only honoured for cached resources without a
/// target observation: they stay on disk as [`Disposition::Unavailable`].
pub fn classify(
    target: Option<&TargetObservation>,
    local: Option<&LocalObservation>,
    cache: Option<&LocalObservation>,
    keep_other_variant: bool,
) -> Verdict {
    let (disposition, needs_removal) = match (target, local, cache) {
        (Some(target), Some(local), _) if local.matches(target) => (Disposition::StorageInReadOnly, false),
        (Some(target), _, Some(cache)) if cache.matches(target) => (Disposition::StorageInReadWrite, false),
        (Some(_), _, _) => (Disposition::NeedUpdate, false),
        (None, _, Some(_)) if keep_other_variant => (Disposition::Unavailable, false),
        (None, _, Some(_)) => (Disposition::Disuse, true),
        (None, _, None) => (Disposition::Unavailable, false),
    };
    Verdict { disposition, needs_removal }
}

/// Observations of a single resource, each of which may be set at most once.
#[derive(Debug, Clone)]
pub struct CheckRecord {
    name: ResourceName,
    target: Option<TargetObservation>,
    local: Option<LocalObservation>,
    cache: Option<LocalObservation>,
}

impl CheckRecord {
    pub fn new(name: ResourceName) -> Self {
        Self { name, target: None, local: None, cache: None }
    }

    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    pub fn target(&self) -> Option<&TargetObservation> {
        self.target.as_ref()
    }

    pub fn local(&self) -> Option<&LocalObservation> {
        self.local.as_ref()
    }

    pub fn cache(&self) -> Option<&LocalObservation> {
        self.cache.as_ref()
    }

    pub fn set_target(&mut self, observation: TargetObservation) -> Result<()> {
        Self::set_once(&mut self.target, observation, &self.name, "target")
    }

    pub fn set_local(&mut self, observation: LocalObservation) -> Result<()> {
        Self::set_once(&mut self.local, observation, &self.name, "read-only")
    }

    pub fn set_cache(&mut self, observation: LocalObservation) -> Result<()> {
        Self::set_once(&mut self.cache, observation, &self.name, "read-write")
    }

    pub fn verdict(&self, keep_other_variant: bool) -> Verdict {
        classify(self.target.as_ref(), self.local.as_ref(), self.cache.as_ref(), keep_other_variant)
    }

    fn set_once<T>(slot: &mut Option<T>, value: T, name: &ResourceName, source: &str) -> Result<()> {
        if slot.is_some() {
            exn::bail!(ErrorKind::ProtocolViolation(format!("{source} observation of {name} set twice")));
        }
        *slot = Some(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    const PROPTEST_CASES: u32 = 256;

    fn target(length: u64, hash: u32) -> TargetObservation {
        TargetObservation {
            load_type: LoadType::LoadFromFile,
            length,
            hash,
            compressed_length: length / 2,
            compressed_hash: !hash,
        }
    }

    fn local(length: u64, hash: u32) -> LocalObservation {
        LocalObservation { load_type: LoadType::LoadFromFile, length, hash }
    }

    /// Absent, present and matching, present but different.
    #[derive(Debug, Clone, Copy)]
    enum Seen {
        Absent,
        Matching,
        Mismatching,
    }
    impl Seen {
        fn observe(self) -> Option<LocalObservation> {
            match self {
                Seen::Absent => None,
                Seen::Matching => Some(local(100, 0xAA)),
                Seen::Mismatching => Some(local(100, 0xBB)),
            }
        }
    }

    #[rstest]
    fn test_precedence_table(
        #[values(false, true)] has_target: bool,
        #[values(Seen::Absent, Seen::Matching, Seen::Mismatching)] local_seen: Seen,
        #[values(Seen::Absent, Seen::Matching, Seen::Mismatching)] cache_seen: Seen,
    ) {
        let target = has_target.then(|| target(100, 0xAA));
        let verdict = classify(target.as_ref(), local_seen.observe().as_ref(), cache_seen.observe().as_ref(), false);
        let expected = match (has_target, local_seen, cache_seen) {
            (true, Seen::Matching, _) => Disposition::StorageInReadOnly,
            (true, _, Seen::Matching) => Disposition::StorageInReadWrite,
            (true, _, _) => Disposition::NeedUpdate,
            (false, _, Seen::Absent) => Disposition::Unavailable,
            (false, _, _) => Disposition::Disuse,
        };
        assert_eq!(verdict.disposition, expected);
        assert_eq!(verdict.needs_removal, expected == Disposition::Disuse);
    }

    #[test]
    fn test_load_type_mismatch_forces_update() {
        let cached = LocalObservation { load_type: LoadType::LoadFromBinary, ..local(100, 0xAA) };
        let verdict = classify(Some(&target(100, 0xAA)), None, Some(&cached), false);
        assert_eq!(verdict.disposition, Disposition::NeedUpdate);
    }

    #[test]
    fn test_length_mismatch_forces_update() {
        let verdict = classify(Some(&target(100, 0xAA)), Some(&local(99, 0xAA)), None, false);
        assert_eq!(verdict.disposition, Disposition::NeedUpdate);
    }

    #[test]
    fn test_keep_other_variant() {
        let verdict = classify(None, None, Some(&local(1, 1)), true);
        assert_eq!(verdict, Verdict { disposition: Disposition::Unavailable, needs_removal: false });
        // Wanted resources are unaffected.
        let verdict = classify(Some(&target(1, 1)), None, Some(&local(1, 1)), true);
        assert_eq!(verdict.disposition, Disposition::StorageInReadWrite);
    }

    #[test]
    fn test_duplicate_observation_is_protocol_violation() {
        let mut record = CheckRecord::new(ResourceName::universal("res1"));
        record.set_cache(local(1, 1)).unwrap();
        record.set_local(local(1, 1)).unwrap();
        let err = record.set_cache(local(2, 2)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::ProtocolViolation(msg) if msg.contains("read-write")));
        // The first observation survives.
        assert_eq!(record.cache(), Some(&local(1, 1)));
    }

    fn arb_local() -> impl Strategy<Value = Option<LocalObservation>> {
        prop::option::of((0u64..4, 0u32..4).prop_map(|(length, hash)| local(length, hash)))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

        #[test]
        fn prop_insertion_order_is_irrelevant(
            target_seen in prop::option::of((0u64..4, 0u32..4).prop_map(|(l, h)| target(l, h))),
            local_seen in arb_local(),
            cache_seen in arb_local(),
            order in Just([0u8, 1, 2]).prop_shuffle(),
        ) {
            let mut record = CheckRecord::new(ResourceName::universal("res"));
            for step in order {
                match step {
                    0 => if let Some(t) = target_seen { record.set_target(t).unwrap() },
                    1 => if let Some(l) = local_seen { record.set_local(l).unwrap() },
                    _ => if let Some(c) = cache_seen { record.set_cache(c).unwrap() },
                }
            }
            prop_assert_eq!(
                record.verdict(false),
                classify(target_seen.as_ref(), local_seen.as_ref(), cache_seen.as_ref(), false)
            );
        }

        #[test]
        fn prop_ready_only_when_a_copy_matches(
            target_seen in (0u64..4, 0u32..4).prop_map(|(l, h)| target(l, h)),
            local_seen in arb_local(),
            cache_seen in arb_local(),
        ) {
            let verdict = classify(Some(&target_seen), local_seen.as_ref(), cache_seen.as_ref(), false);
            let any_match = local_seen.iter().chain(cache_seen.iter()).any(|o| o.matches(&target_seen));
            prop_assert_eq!(verdict.disposition.is_ready(), any_match);
            prop_assert!(!verdict.needs_removal);
        }
    }
}
