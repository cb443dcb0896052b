//! Property-based tests for the vessel conservation model.
//!
//! Uses proptest to generate random fill/transfer/clear sequences over a
//! small set of vessels and verify volume invariants hold throughout.

use labsim_core::engine::LabEngine;
use labsim_core::fixed::{Fixed64, VOLUME_EPSILON, f64_to_fixed64 as fx};
use labsim_core::id::VesselId;
use labsim_core::test_utils::{demo_registry, make_beaker, total_volume};
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

/// One step in a random operation sequence. Indices are taken modulo the
/// vessel/chemical counts so every generated op is applicable.
#[derive(Debug, Clone)]
enum Op {
    Fill { vessel: usize, chemical: usize, amount: f64 },
    Transfer { src: usize, dst: usize, amount: f64 },
    Take { vessel: usize, amount: f64 },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..4usize, 0..3usize, 0.0..400.0f64)
            .prop_map(|(vessel, chemical, amount)| Op::Fill { vessel, chemical, amount }),
        (0..4usize, 0..4usize, 0.0..400.0f64)
            .prop_map(|(src, dst, amount)| Op::Transfer { src, dst, amount }),
        (0..4usize, 0.0..400.0f64).prop_map(|(vessel, amount)| Op::Take { vessel, amount }),
    ]
}

fn setup() -> (LabEngine, Vec<VesselId>, Vec<labsim_core::id::ChemicalId>) {
    let (registry, chems) = demo_registry();
    let mut engine = LabEngine::new(registry);
    let vessels: Vec<VesselId> = (0..4).map(|_| engine.add_vessel(make_beaker(500.0))).collect();
    // Non-reacting chemicals only, so contents never collapse mid-sequence.
    let chemicals = vec![chems.water, chems.nacl, chems.sand];
    (engine, vessels, chemicals)
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A transfer moves volume, never creates or destroys it: the closed
    /// system total only changes through fills and takes, by exactly the
    /// amount each operation reports.
    #[test]
    fn conservation_over_random_sequences(ops in proptest::collection::vec(arb_op(), 1..60)) {
        let (mut engine, vessels, chemicals) = setup();
        let mut expected_total = Fixed64::ZERO;

        for op in ops {
            match op {
                Op::Fill { vessel, chemical, amount } => {
                    let added = engine.fill_vessel(
                        vessels[vessel % vessels.len()],
                        chemicals[chemical % chemicals.len()],
                        fx(amount),
                    );
                    expected_total += added;
                }
                Op::Transfer { src, dst, amount } => {
                    // Moves volume inside the closed system.
                    engine.transfer(
                        vessels[src % vessels.len()],
                        vessels[dst % vessels.len()],
                        fx(amount),
                    );
                }
                Op::Take { vessel, amount } => {
                    let id = vessels[vessel % vessels.len()];
                    if let Some(v) = engine.vessel_mut(id) {
                        let removed: Fixed64 = v.take(fx(amount)).iter().map(|(_, a)| *a).sum();
                        expected_total -= removed;
                    }
                }
            }

            // Pruning of sub-epsilon residues may shave a hair off the total;
            // allow one epsilon per vessel of slack.
            let slack = VOLUME_EPSILON * Fixed64::from_num(4 * 8);
            let actual = total_volume(&engine);
            prop_assert!(
                (actual - expected_total).abs() <= slack,
                "total drifted: actual {actual} vs expected {expected_total}"
            );
            expected_total = actual;
        }
    }

    /// Per-vessel invariants hold after any sequence: volume equals the sum
    /// of entries, volume never exceeds capacity, no sub-epsilon entries.
    #[test]
    fn vessel_invariants_hold(ops in proptest::collection::vec(arb_op(), 1..60)) {
        let (mut engine, vessels, chemicals) = setup();

        for op in ops {
            match op {
                Op::Fill { vessel, chemical, amount } => {
                    engine.fill_vessel(
                        vessels[vessel % vessels.len()],
                        chemicals[chemical % chemicals.len()],
                        fx(amount),
                    );
                }
                Op::Transfer { src, dst, amount } => {
                    engine.transfer(
                        vessels[src % vessels.len()],
                        vessels[dst % vessels.len()],
                        fx(amount),
                    );
                }
                Op::Take { vessel, amount } => {
                    if let Some(v) = engine.vessel_mut(vessels[vessel % vessels.len()]) {
                        v.take(fx(amount));
                    }
                }
            }

            for &id in &vessels {
                let v = engine.vessel(id).unwrap();
                let sum: Fixed64 = v.contents().map(|(_, a)| a).sum();
                prop_assert!((v.volume() - sum).abs() < VOLUME_EPSILON);
                prop_assert!(v.volume() <= v.capacity + VOLUME_EPSILON);
                for (_, amount) in v.contents() {
                    prop_assert!(amount >= VOLUME_EPSILON);
                }
            }
        }
    }

    /// Transfer clamp: a huge requested amount moves at most
    /// min(source volume, destination free capacity).
    #[test]
    fn transfer_clamp(src_fill in 0.0..500.0f64, dst_fill in 0.0..500.0f64) {
        let (mut engine, vessels, chemicals) = setup();
        let (a, b) = (vessels[0], vessels[1]);
        engine.fill_vessel(a, chemicals[0], fx(src_fill));
        engine.fill_vessel(b, chemicals[1], fx(dst_fill));

        let src_before = engine.vessel(a).unwrap().volume();
        let dst_free = engine.vessel(b).unwrap().free_capacity();

        let moved = engine.transfer(a, b, fx(1_000_000.0));
        prop_assert!(moved <= src_before);
        prop_assert!(moved <= dst_free);
        prop_assert!((moved - src_before.min(dst_free)).abs() < VOLUME_EPSILON);
    }
}
