//! Membership functions and linguistic variables for the trust engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Linguistic terms shared by every input and the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FuzzySet {
    Low,
    Medium,
    High,
}

impl FuzzySet {
    pub const ALL: [FuzzySet; 3] = [FuzzySet::Low, FuzzySet::Medium, FuzzySet::High];

    /// Representative output value used by the defuzzifiers.
    pub fn centroid(self) -> f64 {
        match self {
            FuzzySet::Low => 0.15,
            FuzzySet::Medium => 0.5,
            FuzzySet::High => 0.85,
        }
    }
}

impl fmt::Display for FuzzySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FuzzySet::Low => "LOW",
            FuzzySet::Medium => "MEDIUM",
            FuzzySet::High => "HIGH",
        };
        f.write_str(name)
    }
}

/// Shape of a single membership curve over [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MembershipFunction {
    Triangular { a: f64, b: f64, c: f64 },
    /// Flat top on `[b, c]`. With `a == b` (or `c == d`) the left (right)
    /// edge is a shoulder and includes its endpoint.
    Trapezoidal { a: f64, b: f64, c: f64, d: f64 },
    Gaussian { mean: f64, sigma: f64 },
    Sigmoid { slope: f64, center: f64 },
}

impl MembershipFunction {
    /// Degree of membership of `x`, in [0, 1].
    pub fn degree(&self, x: f64) -> f64 {
        match *self {
            MembershipFunction::Triangular { a, b, c } => {
                if x == b {
                    1.0
                } else if x <= a || x >= c {
                    0.0
                } else if x < b {
                    (x - a) / (b - a)
                } else {
                    (c - x) / (c - b)
                }
            }
            MembershipFunction::Trapezoidal { a, b, c, d } => {
                if x < a || x > d {
                    0.0
                } else if x >= b && x <= c {
                    1.0
                } else if x < b {
                    (x - a) / (b - a)
                } else {
                    (d - x) / (d - c)
                }
            }
            MembershipFunction::Gaussian { mean, sigma } => {
                if sigma <= 0.0 {
                    return if x == mean { 1.0 } else { 0.0 };
                }
                (-(x - mean).powi(2) / (2.0 * sigma * sigma)).exp()
            }
            MembershipFunction::Sigmoid { slope, center } => {
                1.0 / (1.0 + (-slope * (x - center)).exp())
            }
        }
    }
}

/// Degrees of membership of one crisp value in LOW / MEDIUM / HIGH.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FuzzyMembership {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl FuzzyMembership {
    pub fn degree(&self, set: FuzzySet) -> f64 {
        match set {
            FuzzySet::Low => self.low,
            FuzzySet::Medium => self.medium,
            FuzzySet::High => self.high,
        }
    }

    pub(crate) fn raise(&mut self, set: FuzzySet, value: f64) {
        let slot = match set {
            FuzzySet::Low => &mut self.low,
            FuzzySet::Medium => &mut self.medium,
            FuzzySet::High => &mut self.high,
        };
        *slot = slot.max(value);
    }

    /// Largest degree across the three sets.
    pub fn peak(&self) -> f64 {
        self.low.max(self.medium).max(self.high)
    }
}

/// An input dimension with its three term curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinguisticVariable {
    pub name: String,
    pub low: MembershipFunction,
    pub medium: MembershipFunction,
    pub high: MembershipFunction,
}

impl LinguisticVariable {
    pub fn new(
        name: &str,
        low: MembershipFunction,
        medium: MembershipFunction,
        high: MembershipFunction,
    ) -> Self {
        LinguisticVariable {
            name: name.to_string(),
            low,
            medium,
            high,
        }
    }

    /// Proposer reputation as seen by the evaluating node.
    pub fn reputation() -> Self {
        Self::new(
            "reputation",
            MembershipFunction::Trapezoidal { a: 0.0, b: 0.0, c: 0.2, d: 0.4 },
            MembershipFunction::Triangular { a: 0.2, b: 0.5, c: 0.8 },
            MembershipFunction::Trapezoidal { a: 0.6, b: 0.8, c: 1.0, d: 1.0 },
        )
    }

    /// Structural and content validity of the proposed block.
    pub fn validity() -> Self {
        Self::new(
            "validity",
            MembershipFunction::Trapezoidal { a: 0.0, b: 0.0, c: 0.3, d: 0.5 },
            MembershipFunction::Triangular { a: 0.3, b: 0.6, c: 0.8 },
            MembershipFunction::Trapezoidal { a: 0.7, b: 0.85, c: 1.0, d: 1.0 },
        )
    }

    /// Network agreement; the HIGH ramp sits on the 60-75% BFT safety band.
    pub fn consensus() -> Self {
        Self::new(
            "consensus",
            MembershipFunction::Trapezoidal { a: 0.0, b: 0.0, c: 0.25, d: 0.4 },
            MembershipFunction::Triangular { a: 0.3, b: 0.5, c: 0.7 },
            MembershipFunction::Trapezoidal { a: 0.6, b: 0.75, c: 1.0, d: 1.0 },
        )
    }

    pub fn fuzzify(&self, x: f64) -> FuzzyMembership {
        FuzzyMembership {
            low: self.low.degree(x),
            medium: self.medium.degree(x),
            high: self.high.degree(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_triangular_shape() {
        let f = MembershipFunction::Triangular { a: 0.2, b: 0.5, c: 0.8 };
        assert_eq!(f.degree(0.2), 0.0);
        assert_eq!(f.degree(0.5), 1.0);
        assert_eq!(f.degree(0.8), 0.0);
        assert_abs_diff_eq!(f.degree(0.35), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(f.degree(0.65), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_trapezoid_shoulders_include_edges() {
        let low = MembershipFunction::Trapezoidal { a: 0.0, b: 0.0, c: 0.2, d: 0.4 };
        let high = MembershipFunction::Trapezoidal { a: 0.6, b: 0.8, c: 1.0, d: 1.0 };
        assert_eq!(low.degree(0.0), 1.0);
        assert_eq!(high.degree(1.0), 1.0);
        assert_abs_diff_eq!(low.degree(0.3), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(high.degree(0.7), 0.5, epsilon = 1e-12);
        assert_eq!(low.degree(0.5), 0.0);
    }

    #[test]
    fn test_gaussian_and_sigmoid() {
        let g = MembershipFunction::Gaussian { mean: 0.5, sigma: 0.1 };
        assert_eq!(g.degree(0.5), 1.0);
        assert!(g.degree(0.9) < 0.01);

        let s = MembershipFunction::Sigmoid { slope: 10.0, center: 0.5 };
        assert_abs_diff_eq!(s.degree(0.5), 0.5, epsilon = 1e-12);
        assert!(s.degree(1.0) > 0.99);
    }

    #[test]
    fn test_fuzzify_reputation_midpoint() {
        let m = LinguisticVariable::reputation().fuzzify(0.5);
        assert_eq!(m.low, 0.0);
        assert_eq!(m.medium, 1.0);
        assert_eq!(m.high, 0.0);
        assert_eq!(m.peak(), 1.0);
    }

    #[test]
    fn test_raise_keeps_maximum() {
        let mut m = FuzzyMembership::default();
        m.raise(FuzzySet::High, 0.4);
        m.raise(FuzzySet::High, 0.2);
        assert_eq!(m.degree(FuzzySet::High), 0.4);
        assert_eq!(m.degree(FuzzySet::Low), 0.0);
    }
}
