//! Mamdani fuzzy inference over {reputation, validity, consensus}.

pub mod engine;
pub mod membership;
pub mod rules;

pub use engine::{clamp_unit, Defuzzifier, FuzzyTrustEngine, TrustEvaluation, DEFAULT_TRUST_THRESHOLD};
pub use membership::{FuzzyMembership, FuzzySet, LinguisticVariable, MembershipFunction};
pub use rules::{FuzzyRule, RULE_BASE};
