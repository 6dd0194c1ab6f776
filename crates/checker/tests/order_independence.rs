use proptest::prelude::*;
use resman_checker::{CheckOutcome, ResolvedResourceEntry, ResourceChecker};
use resman_manifest::models::{LoadType, LocalManifest, LocalResource, ResourceName, TargetManifest, TargetResource};
use resman_manifest::{FramedCodec, ManifestCodec};
use resman_storage::backend::MockBackend;
use std::collections::HashMap;
use std::sync::Arc;

const PROPTEST_CASES: u32 = 64;
const MANIFEST: &str = "ResourceList.dat";

/// How a local area relates to the target for one resource.
#[derive(Debug, Clone, Copy)]
enum Presence {
    Absent,
    Matching,
    Stale,
}

#[derive(Debug, Clone)]
struct Scenario {
    target: Vec<TargetResource>,
    read_only: Vec<LocalResource>,
    cache: Vec<LocalResource>,
}

fn arb_presence() -> impl Strategy<Value = Presence> {
    prop_oneof![Just(Presence::Absent), Just(Presence::Matching), Just(Presence::Stale)]
}

fn arb_scenario() -> impl Strategy<Value = Scenario> {
    prop::collection::vec((any::<bool>(), arb_presence(), arb_presence(), 1u64..10_000), 1..12).prop_map(|specs| {
        let mut scenario = Scenario { target: vec![], read_only: vec![], cache: vec![] };
        for (index, (wanted, read_only, cache, length)) in specs.into_iter().enumerate() {
            let name = format!("Pack/res{index}");
            let hash = u32::try_from(index).unwrap_or(0) + 1;
            if wanted {
                scenario.target.push(TargetResource {
                    name: name.clone(),
                    variant: None,
                    load_type: LoadType::LoadFromMemory,
                    length,
                    hash,
                    compressed_length: length / 3,
                    compressed_hash: hash << 4,
                    assets: vec![],
                });
            }
            let observe = |presence: Presence| {
                let hash = match presence {
                    Presence::Absent => return None,
                    Presence::Matching => hash,
                    Presence::Stale => hash + 1_000,
                };
                Some(LocalResource { name: name.clone(), variant: None, load_type: LoadType::LoadFromMemory, length, hash })
            };
            scenario.read_only.extend(observe(read_only));
            scenario.cache.extend(observe(cache));
        }
        scenario
    })
}

fn arb_shuffled() -> impl Strategy<Value = (Scenario, Vec<usize>)> {
    arb_scenario().prop_flat_map(|scenario| {
        let order: Vec<usize> = (0..scenario.target.len()).collect();
        (Just(scenario), Just(order).prop_shuffle())
    })
}

fn run(scenario: &Scenario, order: &[usize]) -> (HashMap<ResourceName, ResolvedResourceEntry>, CheckOutcome) {
    let codec = FramedCodec::new();
    let target = TargetManifest {
        applicable_version: "1.0.0".to_string(),
        internal_version: 1,
        resources: order.iter().map(|&i| scenario.target[i].clone()).collect(),
        ..Default::default()
    };
    let local = |resources: &[LocalResource]| {
        let bytes = codec.encode_local(&LocalManifest { resources: resources.to_vec() }).unwrap();
        let files = resources.iter().map(|r| (r.resource_name().file_path("dat"), b"x".to_vec()));
        Arc::new(MockBackend::with_files(files.chain([(MANIFEST.into(), bytes)])))
    };
    let checker = ResourceChecker::new()
        .with_remote(Arc::new(MockBackend::with_files([(MANIFEST, codec.encode_target(&target).unwrap())])))
        .with_read_only(local(&scenario.read_only))
        .with_read_write(local(&scenario.cache));

    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let outcome = runtime.block_on(checker.check_and_collect(None)).unwrap();
    let resolved = checker.context().snapshot().unwrap().resolved.clone();
    (resolved, outcome)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

    #[test]
    fn prop_target_order_does_not_change_results((scenario, shuffled) in arb_shuffled()) {
        let identity: Vec<usize> = (0..scenario.target.len()).collect();
        let (resolved_a, outcome_a) = run(&scenario, &identity);
        let (resolved_b, outcome_b) = run(&scenario, &shuffled);

        prop_assert_eq!(resolved_a, resolved_b);
        prop_assert_eq!(outcome_a.summary.totals(), outcome_b.summary.totals());
        let mut updates_a: Vec<_> = outcome_a.updates.into_iter().map(|u| u.name).collect();
        let mut updates_b: Vec<_> = outcome_b.updates.into_iter().map(|u| u.name).collect();
        updates_a.sort();
        updates_b.sort();
        prop_assert_eq!(updates_a, updates_b);
    }

    #[test]
    fn prop_every_wanted_resource_is_resolved_or_updated(scenario in arb_scenario()) {
        let identity: Vec<usize> = (0..scenario.target.len()).collect();
        let (resolved, outcome) = run(&scenario, &identity);
        let cached_only = scenario
            .cache
            .iter()
            .filter(|c| !scenario.target.iter().any(|t| t.name == c.name))
            .count();

        prop_assert_eq!(resolved.len() + outcome.updates.len(), scenario.target.len());
        prop_assert_eq!(outcome.summary.removed_count, cached_only as u64);
        prop_assert_eq!(outcome.summary.update_count, outcome.updates.len() as u64);
    }
}
