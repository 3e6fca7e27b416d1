//! Weighted Mamdani rule base for block trust.

use super::membership::FuzzySet::{self, High as H, Low as L, Medium as M};
use serde::Serialize;
use std::fmt;

/// `IF reputation AND validity AND consensus THEN trust`, scaled by `weight`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FuzzyRule {
    pub reputation: FuzzySet,
    pub validity: FuzzySet,
    pub consensus: FuzzySet,
    pub output: FuzzySet,
    /// In (0, 1].
    pub weight: f64,
    pub description: &'static str,
}

const fn rule(
    reputation: FuzzySet,
    validity: FuzzySet,
    consensus: FuzzySet,
    output: FuzzySet,
    weight: f64,
    description: &'static str,
) -> FuzzyRule {
    FuzzyRule {
        reputation,
        validity,
        consensus,
        output,
        weight,
        description,
    }
}

/// The fixed rule table.
pub const RULE_BASE: [FuzzyRule; 18] = [
    // Strong acceptance
    rule(H, H, H, H, 1.0, "Trusted proposer, valid block, strong agreement"),
    rule(H, H, M, H, 0.9, "Trusted proposer, valid block, moderate agreement"),
    rule(H, M, H, H, 0.8, "Trusted proposer, partly valid block, strong agreement"),
    // Conditional acceptance
    rule(M, H, H, M, 0.7, "Average proposer, valid block, strong agreement"),
    rule(H, M, M, M, 0.6, "Trusted proposer, partly valid block, moderate agreement"),
    rule(M, M, H, M, 0.5, "Average proposer, partly valid block, strong agreement"),
    rule(M, H, M, M, 0.5, "Average proposer, valid block, moderate agreement"),
    // Single weak factor
    rule(L, H, H, L, 0.8, "Distrusted proposer despite a valid, agreed block"),
    rule(H, L, H, L, 0.9, "Invalid block even from a trusted proposer"),
    rule(H, H, L, L, 0.8, "Network disagrees with a trusted proposer"),
    // Two or more weak factors
    rule(L, L, H, L, 1.0, "Distrusted proposer with an invalid block"),
    rule(L, H, L, L, 1.0, "Distrusted proposer without network support"),
    rule(H, L, L, L, 1.0, "Invalid block without network support"),
    rule(L, L, L, L, 1.0, "Every signal is weak"),
    rule(L, M, L, L, 0.9, "Distrusted proposer, doubtful block, no support"),
    rule(M, L, M, L, 0.8, "Invalid block from an average proposer"),
    // Neutral ground
    rule(M, M, M, M, 0.4, "Every signal is moderate"),
    rule(M, H, M, H, 0.6, "Valid block from a fresh proposer under neutral agreement"),
];

impl FuzzyRule {
    /// Firing strength: `weight * min(antecedent degrees)`.
    pub fn strength(&self, reputation: f64, validity: f64, consensus: f64) -> f64 {
        self.weight * reputation.min(validity).min(consensus)
    }
}

impl fmt::Display for FuzzyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IF reputation is {} AND validity is {} AND consensus is {} THEN trust is {} (w={:.2}): {}",
            self.reputation, self.validity, self.consensus, self.output, self.weight, self.description
        )
    }
}
