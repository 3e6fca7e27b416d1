use fuzzchain_consensus::fuzzy::{FuzzySet, FuzzyTrustEngine, RULE_BASE};
use proptest::prelude::*;

/// Checked only where validity and consensus sit on their HIGH plateaus.
/// Below that, rule (H, M, M) -> MEDIUM makes trust dip as reputation rises;
/// see `test_medium_rule_dips_off_the_plateau`.
#[test]
fn test_monotonic_in_reputation_on_high_grid() {
    let engine = FuzzyTrustEngine::new();
    for validity in [0.85, 0.9, 0.95, 1.0] {
        for consensus in [0.75, 0.85, 0.9, 1.0] {
            let mut previous = f64::MIN;
            for step in 1..=9 {
                let reputation = step as f64 / 10.0;
                let trust = engine.evaluate(reputation, validity, consensus);
                assert!(
                    trust + 1e-12 >= previous,
                    "trust fell at rep {} (val {}, cons {}): {} < {}",
                    reputation,
                    validity,
                    consensus,
                    trust,
                    previous
                );
                previous = trust;
            }
        }
    }
}

#[test]
fn test_medium_rule_dips_off_the_plateau() {
    let engine = FuzzyTrustEngine::new();
    let before = engine.evaluate(0.65, 0.71, 0.63);
    let after = engine.evaluate(0.66, 0.71, 0.63);
    assert!(
        after < before - 0.01,
        "expected a dip: {} -> {}",
        before,
        after
    );
}

#[test]
fn test_rule_table_has_eighteen_rules() {
    assert_eq!(RULE_BASE.len(), 18);
    assert_eq!(FuzzyTrustEngine::new().rules().len(), 18);
}

proptest! {
    /// Same plateau restriction as the grid test above.
    #[test]
    fn prop_monotonic_in_reputation(
        r1 in 0.1f64..=0.9,
        r2 in 0.1f64..=0.9,
        validity in 0.85f64..=1.0,
        consensus in 0.75f64..=1.0,
    ) {
        let engine = FuzzyTrustEngine::new();
        let (lo, hi) = if r1 <= r2 { (r1, r2) } else { (r2, r1) };
        let t_lo = engine.evaluate(lo, validity, consensus);
        let t_hi = engine.evaluate(hi, validity, consensus);
        prop_assert!(t_lo <= t_hi + 1e-12, "{} -> {}, {} -> {}", lo, t_lo, hi, t_hi);
    }

    #[test]
    fn prop_trust_in_unit_interval(
        r in -1.0f64..2.0,
        v in -1.0f64..2.0,
        c in -1.0f64..2.0,
    ) {
        let trust = FuzzyTrustEngine::new().evaluate(r, v, c);
        prop_assert!((0.0..=1.0).contains(&trust));
    }
}

#[test]
fn test_boundary_classification() {
    let engine = FuzzyTrustEngine::new();
    assert_eq!(engine.classify(engine.evaluate(0.0, 0.0, 0.0)), FuzzySet::Low);
    assert_eq!(engine.classify(engine.evaluate(1.0, 1.0, 1.0)), FuzzySet::High);
}
