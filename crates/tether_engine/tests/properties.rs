//! Property tests for reconciliation.
//!
//! Random sequences of evaluations, mounts and unmounts are applied to a few
//! sites sharing one engine. After every step the registry must hold exactly
//! the union of what the mounted sites last declared, each live resource must
//! have been activated once, and every released resource cleaned up once.

mod test_utils;

use proptest::prelude::*;
use std::collections::BTreeSet;
use tether_engine::site::ReactiveSite;
use test_utils::{Recorder, declare_all, engine_with_context};

const KEYS: [&str; 5] = ["a", "b", "c", "d", "e"];
const SITES: usize = 3;

/// One host lifecycle event.
#[derive(Debug, Clone)]
enum Step {
    Evaluate { site: usize, keys: BTreeSet<usize> },
    Mount { site: usize },
    Unmount { site: usize },
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0..SITES, prop::collection::btree_set(0..KEYS.len(), 0..=KEYS.len()))
            .prop_map(|(site, keys)| Step::Evaluate { site, keys }),
        1 => (0..SITES).prop_map(|site| Step::Mount { site }),
        1 => (0..SITES).prop_map(|site| Step::Unmount { site }),
    ]
}

/// The model: what each site last declared and whether it is mounted.
#[derive(Default, Clone)]
struct Model {
    declared: [BTreeSet<usize>; SITES],
    mounted: [bool; SITES],
}

impl Model {
    fn apply(&mut self, step: &Step) {
        match step {
            Step::Evaluate { site, keys } => self.declared[*site] = keys.clone(),
            Step::Mount { site } => self.mounted[*site] = true,
            Step::Unmount { site } => self.mounted[*site] = false,
        }
    }

    fn expected_live(&self) -> BTreeSet<&'static str> {
        (0..SITES)
            .filter(|&s| self.mounted[s])
            .flat_map(|s| self.declared[s].iter().map(|&k| KEYS[k]))
            .collect()
    }

    fn holders(&self, key: usize) -> usize {
        (0..SITES)
            .filter(|&s| self.mounted[s] && self.declared[s].contains(&key))
            .count()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The registry always mirrors the union of mounted sites' declarations.
    #[test]
    fn prop_registry_matches_model(steps in prop::collection::vec(arb_step(), 1..40)) {
        let engine = engine_with_context(0);
        let rec = Recorder::new("r");
        let mut sites: Vec<ReactiveSite<u32>> = (0..SITES).map(|_| engine.create_site()).collect();
        let mut model = Model::default();

        for step in &steps {
            match step {
                Step::Evaluate { site, keys } => {
                    let intents: Vec<_> = keys.iter().map(|&k| rec.intent(KEYS[k])).collect();
                    sites[*site].evaluate(intents.as_slice(), declare_all).unwrap();
                }
                Step::Mount { site } => sites[*site].mount().unwrap(),
                Step::Unmount { site } => sites[*site].unmount(),
            }
            model.apply(step);

            let live: BTreeSet<String> = rec.log.live().into_iter().collect();
            let expected: BTreeSet<String> =
                model.expected_live().into_iter().map(str::to_owned).collect();
            prop_assert_eq!(&live, &expected, "after {:?}", step);
            prop_assert_eq!(engine.registry().active_count(), expected.len());

            for (k, key) in KEYS.iter().enumerate() {
                let id = rec.intent(key).id();
                prop_assert_eq!(engine.registry().holders(&id), model.holders(k), "key {}", key);
                // Never more than one live activation per key.
                let net = rec.log.activations(key) - rec.log.cleanups(key);
                prop_assert!(net <= 1, "key {} has {} live activations", key, net);
            }
        }

        drop(sites);
        prop_assert!(engine.registry().is_empty());
        prop_assert!(rec.log.live().is_empty());
        let stats = engine.registry().stats();
        prop_assert_eq!(stats.activations, stats.cleanups);
    }

    /// Repeating the last step changes nothing.
    #[test]
    fn prop_repeated_step_is_idempotent(steps in prop::collection::vec(arb_step(), 1..20)) {
        let engine = engine_with_context(0);
        let rec = Recorder::new("r");
        let mut sites: Vec<ReactiveSite<u32>> = (0..SITES).map(|_| engine.create_site()).collect();

        let mut apply = |step: &Step| match step {
            Step::Evaluate { site, keys } => {
                let intents: Vec<_> = keys.iter().map(|&k| rec.intent(KEYS[k])).collect();
                sites[*site].evaluate(intents.as_slice(), declare_all).unwrap();
            }
            Step::Mount { site } => sites[*site].mount().unwrap(),
            Step::Unmount { site } => sites[*site].unmount(),
        };

        for step in &steps {
            apply(step);
        }
        let before = rec.log.events().len();
        if let Some(last) = steps.last() {
            apply(last);
        }
        prop_assert_eq!(rec.log.events().len(), before);
    }

    /// After every site unmounts, nothing is held, whatever came before.
    #[test]
    fn prop_unmount_releases_everything(steps in prop::collection::vec(arb_step(), 0..30)) {
        let engine = engine_with_context(0);
        let rec = Recorder::new("r");
        let mut sites: Vec<ReactiveSite<u32>> = (0..SITES).map(|_| engine.create_site()).collect();

        for step in &steps {
            match step {
                Step::Evaluate { site, keys } => {
                    let intents: Vec<_> = keys.iter().map(|&k| rec.intent(KEYS[k])).collect();
                    sites[*site].evaluate(intents.as_slice(), declare_all).unwrap();
                }
                Step::Mount { site } => sites[*site].mount().unwrap(),
                Step::Unmount { site } => sites[*site].unmount(),
            }
        }
        for site in &mut sites {
            site.unmount();
            prop_assert_eq!(site.held_count(), 0);
        }
        prop_assert!(engine.registry().is_empty());
        prop_assert!(rec.log.live().is_empty());
    }
}
