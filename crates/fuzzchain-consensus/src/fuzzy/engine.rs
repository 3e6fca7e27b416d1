// FUZZY TRUST ENGINE
// Mamdani inference from {reputation, validity, consensus} to a crisp trust value.
//
// SAFETY CONSTRAINTS:
// 1. Stateless per call: the same inputs always give the same trust
// 2. Inputs are clamped to [0, 1]; NaN is treated as 0
// 3. Output is always in [0, 1]; with no firing rule it is the neutral 0.5

use log::debug;
use serde::{Deserialize, Serialize};

use super::membership::{FuzzyMembership, FuzzySet, LinguisticVariable};
use super::rules::{FuzzyRule, RULE_BASE};

/// Default acceptance threshold on defuzzified trust.
pub const DEFAULT_TRUST_THRESHOLD: f64 = 0.55;

/// Below this aggregated mass the defuzzifiers return the neutral value.
const MASS_EPSILON: f64 = 1e-3;
const NEUTRAL_TRUST: f64 = 0.5;

/// Clamp into [0, 1], mapping NaN to 0.
pub fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Defuzzifier {
    /// Strength-weighted mean of the output set centroids.
    #[default]
    Centroid,
    /// Mean of the centroids of the most strongly activated output sets.
    MeanOfMaximum,
}

impl Defuzzifier {
    pub fn defuzzify(&self, aggregated: &FuzzyMembership) -> f64 {
        match self {
            Defuzzifier::Centroid => {
                let (num, den) = FuzzySet::ALL.iter().fold((0.0, 0.0), |(n, d), set| {
                    let s = aggregated.degree(*set);
                    (n + s * set.centroid(), d + s)
                });
                if den < MASS_EPSILON {
                    NEUTRAL_TRUST
                } else {
                    num / den
                }
            }
            Defuzzifier::MeanOfMaximum => {
                let peak = aggregated.peak();
                if peak < MASS_EPSILON {
                    return NEUTRAL_TRUST;
                }
                let maxima: Vec<f64> = FuzzySet::ALL
                    .iter()
                    .filter(|set| (aggregated.degree(**set) - peak).abs() < 1e-12)
                    .map(|set| set.centroid())
                    .collect();
                maxima.iter().sum::<f64>() / maxima.len() as f64
            }
        }
    }
}

/// Full trace of one inference, for logging and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrustEvaluation {
    pub reputation: FuzzyMembership,
    pub validity: FuzzyMembership,
    pub consensus: FuzzyMembership,
    /// Firing strength per rule, in rule-table order.
    pub rule_strengths: Vec<f64>,
    /// Max-aggregated strength per output set.
    pub aggregated: FuzzyMembership,
    pub trust: f64,
}

#[derive(Debug, Clone)]
pub struct FuzzyTrustEngine {
    reputation: LinguisticVariable,
    validity: LinguisticVariable,
    consensus: LinguisticVariable,
    rules: Vec<FuzzyRule>,
    defuzzifier: Defuzzifier,
}

impl Default for FuzzyTrustEngine {
    fn default() -> Self {
        FuzzyTrustEngine {
            reputation: LinguisticVariable::reputation(),
            validity: LinguisticVariable::validity(),
            consensus: LinguisticVariable::consensus(),
            rules: RULE_BASE.to_vec(),
            defuzzifier: Defuzzifier::default(),
        }
    }
}

impl FuzzyTrustEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defuzzifier(mut self, defuzzifier: Defuzzifier) -> Self {
        self.defuzzifier = defuzzifier;
        self
    }

    pub fn rules(&self) -> &[FuzzyRule] {
        &self.rules
    }

    pub fn defuzzifier(&self) -> Defuzzifier {
        self.defuzzifier
    }

    /// Crisp trust in [0, 1].
    pub fn evaluate(&self, reputation: f64, validity: f64, consensus: f64) -> f64 {
        self.evaluate_detailed(reputation, validity, consensus).trust
    }

    /// Run the whole pipeline and keep every intermediate stage.
    pub fn evaluate_detailed(&self, reputation: f64, validity: f64, consensus: f64) -> TrustEvaluation {
        let rep = self.reputation.fuzzify(clamp_unit(reputation));
        let val = self.validity.fuzzify(clamp_unit(validity));
        let cons = self.consensus.fuzzify(clamp_unit(consensus));

        let mut aggregated = FuzzyMembership::default();
        let rule_strengths: Vec<f64> = self
            .rules
            .iter()
            .map(|rule| {
                let strength = rule.strength(
                    rep.degree(rule.reputation),
                    val.degree(rule.validity),
                    cons.degree(rule.consensus),
                );
                aggregated.raise(rule.output, strength);
                strength
            })
            .collect();

        let trust = clamp_unit(self.defuzzifier.defuzzify(&aggregated));

        debug!(
            "Fuzzy trust: rep={:.3} val={:.3} cons={:.3} -> L={:.3} M={:.3} H={:.3} -> {:.3}",
            reputation, validity, consensus, aggregated.low, aggregated.medium, aggregated.high, trust
        );

        TrustEvaluation {
            reputation: rep,
            validity: val,
            consensus: cons,
            rule_strengths,
            aggregated,
            trust,
        }
    }

    /// Output set whose centroid is nearest to `trust`.
    pub fn classify(&self, trust: f64) -> FuzzySet {
        FuzzySet::ALL
            .iter()
            .copied()
            .min_by(|a, b| {
                (a.centroid() - trust)
                    .abs()
                    .total_cmp(&(b.centroid() - trust).abs())
            })
            .unwrap_or(FuzzySet::Medium)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_boundaries() {
        let engine = FuzzyTrustEngine::new();

        let low = engine.evaluate(0.0, 0.0, 0.0);
        assert!(low <= 0.2);
        assert_eq!(engine.classify(low), FuzzySet::Low);

        let high = engine.evaluate(1.0, 1.0, 1.0);
        assert!(high >= 0.8);
        assert_eq!(engine.classify(high), FuzzySet::High);
    }

    #[test]
    fn test_neutral_inputs() {
        let engine = FuzzyTrustEngine::new();
        assert_abs_diff_eq!(engine.evaluate(0.5, 0.5, 0.5), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_fresh_proposer_with_valid_block_is_accepted() {
        let engine = FuzzyTrustEngine::new();
        let trust = engine.evaluate(0.5, 1.0, 0.5);
        assert!(trust >= DEFAULT_TRUST_THRESHOLD, "trust {}", trust);
    }

    #[test]
    fn test_invalid_block_is_rejected() {
        let engine = FuzzyTrustEngine::new();
        for rep in [0.3, 0.5, 0.57, 0.7] {
            let trust = engine.evaluate(rep, 0.1, 0.5);
            assert!(trust < DEFAULT_TRUST_THRESHOLD, "rep {} trust {}", rep, trust);
        }
    }

    #[test]
    fn test_no_firing_rule_is_neutral() {
        // (HIGH, LOW, MEDIUM) has no rule.
        let engine = FuzzyTrustEngine::new();
        let eval = engine.evaluate_detailed(1.0, 0.0, 0.5);
        assert!(eval.rule_strengths.iter().all(|s| *s == 0.0));
        assert_eq!(eval.trust, 0.5);
    }

    #[test]
    fn test_inputs_are_clamped() {
        let engine = FuzzyTrustEngine::new();
        assert_eq!(engine.evaluate(-3.0, -1.0, f64::NAN), engine.evaluate(0.0, 0.0, 0.0));
        assert_eq!(engine.evaluate(7.0, 2.0, 1.5), engine.evaluate(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_detailed_trace() {
        let engine = FuzzyTrustEngine::new();
        let eval = engine.evaluate_detailed(1.0, 1.0, 1.0);
        assert_eq!(eval.rule_strengths.len(), RULE_BASE.len());
        assert_eq!(eval.rule_strengths[0], 1.0);
        assert_eq!(eval.aggregated.high, 1.0);
        assert_eq!(eval.reputation.high, 1.0);
    }

    #[test]
    fn test_mean_of_maximum() {
        let engine = FuzzyTrustEngine::new().with_defuzzifier(Defuzzifier::MeanOfMaximum);
        assert_abs_diff_eq!(engine.evaluate(1.0, 1.0, 1.0), 0.85, epsilon = 1e-12);
        assert_abs_diff_eq!(engine.evaluate(0.0, 0.0, 0.0), 0.15, epsilon = 1e-12);

        let tie = FuzzyMembership { low: 0.4, medium: 0.0, high: 0.4 };
        assert_abs_diff_eq!(Defuzzifier::MeanOfMaximum.defuzzify(&tie), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_classify() {
        let engine = FuzzyTrustEngine::new();
        assert_eq!(engine.classify(0.3), FuzzySet::Low);
        assert_eq!(engine.classify(0.5), FuzzySet::Medium);
        assert_eq!(engine.classify(0.7), FuzzySet::High);
    }
}
