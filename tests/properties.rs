//! Property tests: reported deltas always match the change in global state.

use proptest::prelude::*;
use std::collections::BTreeSet;
use sublayer::{SubscribeOptions, SubscriptionTracker};

#[derive(Clone, Debug)]
enum Op {
    Subscribe(usize, Vec<String>),
    Unsubscribe(usize, Vec<String>),
    Resubscribe(usize, Vec<String>),
}

const LAYERS: [&str; 3] = ["L1", "L2", "L3"];

fn ids() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::sample::select(vec!["A", "B", "C", "D", "E"]), 0..5)
        .prop_map(|v| v.into_iter().map(str::to_string).collect())
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..LAYERS.len(), ids()).prop_map(|(l, ids)| Op::Subscribe(l, ids)),
        (0..LAYERS.len(), ids()).prop_map(|(l, ids)| Op::Unsubscribe(l, ids)),
        (0..LAYERS.len(), ids()).prop_map(|(l, ids)| Op::Resubscribe(l, ids)),
    ]
}

fn global(tracker: &SubscriptionTracker) -> BTreeSet<String> {
    tracker
        .get_all_subscribed()
        .into_iter()
        .filter(|e| e.entity == "Order")
        .flat_map(|e| e.ids)
        .collect()
}

proptest! {
    #[test]
    fn prop_deltas_match_global_change(ops in prop::collection::vec(op(), 1..40)) {
        let mut tracker = SubscriptionTracker::new();

        for op in ops {
            let before = global(&tracker);

            let (added, removed) = match op {
                Op::Subscribe(l, ids) => {
                    let added = tracker
                        .subscribe("Order", ids, SubscribeOptions::layer(LAYERS[l]))
                        .unwrap();
                    (added, Vec::new())
                }
                Op::Unsubscribe(l, ids) => {
                    let removed = tracker
                        .unsubscribe("Order", ids, SubscribeOptions::layer(LAYERS[l]))
                        .unwrap();
                    (Vec::new(), removed)
                }
                Op::Resubscribe(l, ids) => {
                    let delta = tracker
                        .resubscribe("Order", ids, SubscribeOptions::layer(LAYERS[l]))
                        .unwrap();
                    (delta.subscribed, delta.unsubscribed)
                }
            };

            let after = global(&tracker);
            let expected_added: BTreeSet<String> = after.difference(&before).cloned().collect();
            let expected_removed: BTreeSet<String> = before.difference(&after).cloned().collect();

            prop_assert_eq!(added.iter().cloned().collect::<BTreeSet<_>>(), expected_added);
            prop_assert_eq!(removed.iter().cloned().collect::<BTreeSet<_>>(), expected_removed);
            prop_assert_eq!(added.len(), added.iter().collect::<BTreeSet<_>>().len());
        }
    }

    #[test]
    fn prop_layer_sets_stay_unique(ops in prop::collection::vec(op(), 1..40)) {
        let mut tracker = SubscriptionTracker::new();

        for op in ops {
            match op {
                Op::Subscribe(l, ids) => {
                    tracker.subscribe("Order", ids, SubscribeOptions::layer(LAYERS[l])).unwrap();
                }
                Op::Unsubscribe(l, ids) => {
                    tracker.unsubscribe("Order", ids, SubscribeOptions::layer(LAYERS[l])).unwrap();
                }
                Op::Resubscribe(l, ids) => {
                    tracker.resubscribe("Order", ids, SubscribeOptions::layer(LAYERS[l])).unwrap();
                }
            }
        }

        for layer in tracker.get_subscribed_layers().layers() {
            prop_assert!(!layer.is_empty());
            for set in layer.entities() {
                let ids = set.ids().to_vec();
                let unique: BTreeSet<_> = ids.iter().collect();
                prop_assert!(!ids.is_empty());
                prop_assert_eq!(ids.len(), unique.len());
            }
        }
    }
}
