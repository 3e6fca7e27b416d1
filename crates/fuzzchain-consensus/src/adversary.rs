// BYZANTINE BEHAVIOR MODEL
// Per-node-type probabilities for misbehavior, plus the payload forgeries
// and report distortions a Byzantine node applies.
//
// SAFETY CONSTRAINTS:
// 1. Every draw comes from a caller-owned RNG, so a seed fixes the run
// 2. HONEST consumes no randomness and never distorts anything
// 3. Misreported values always stay inside [0, 1]

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConsensusError;
use crate::messages::NodeId;

/// Amount stamped on double-spend payloads.
const DOUBLE_SPEND_AMOUNT: u64 = 999_999;

/// Bernoulli draw that skips the RNG for certain outcomes.
pub fn bernoulli<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    if p >= 1.0 {
        true
    } else if p <= 0.0 || p.is_nan() {
        false
    } else {
        rng.gen_bool(p)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Honest,
    /// Mostly absent: rarely participates, drops traffic, reports zero validity.
    Silent,
    /// Tampers with payloads and inverts its assessments.
    Corrupt,
    /// Proposes conflicting blocks at one height.
    DoubleSpend,
    /// Uniform noise in every report.
    Random,
}

/// Probabilities of each misbehavior for one node type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BehaviorProfile {
    pub invalid_block: f64,
    pub participation: f64,
    pub drop: f64,
    pub delay: f64,
}

impl NodeType {
    pub const ALL: [NodeType; 5] = [
        NodeType::Honest,
        NodeType::Silent,
        NodeType::Corrupt,
        NodeType::DoubleSpend,
        NodeType::Random,
    ];

    pub fn profile(self) -> BehaviorProfile {
        let (invalid_block, participation, drop, delay) = match self {
            NodeType::Honest => (0.0, 1.0, 0.0, 0.0),
            NodeType::Silent => (0.0, 0.2, 0.3, 0.0),
            NodeType::Corrupt => (0.8, 0.7, 0.1, 0.15),
            NodeType::DoubleSpend => (0.6, 0.7, 0.0, 0.15),
            NodeType::Random => (0.5, 0.7, 0.2, 0.25),
        };
        BehaviorProfile {
            invalid_block,
            participation,
            drop,
            delay,
        }
    }

    pub fn is_byzantine(self) -> bool {
        self != NodeType::Honest
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Honest => "HONEST",
            NodeType::Silent => "SILENT",
            NodeType::Corrupt => "CORRUPT",
            NodeType::DoubleSpend => "DOUBLE_SPEND",
            NodeType::Random => "RANDOM",
        }
    }

    pub fn should_send_invalid_block<R: Rng + ?Sized>(self, rng: &mut R) -> bool {
        bernoulli(rng, self.profile().invalid_block)
    }

    pub fn should_participate<R: Rng + ?Sized>(self, rng: &mut R) -> bool {
        bernoulli(rng, self.profile().participation)
    }

    pub fn should_drop_message<R: Rng + ?Sized>(self, rng: &mut R) -> bool {
        bernoulli(rng, self.profile().drop)
    }

    pub fn should_delay_message<R: Rng + ?Sized>(self, rng: &mut R) -> bool {
        bernoulli(rng, self.profile().delay)
    }

    /// Validity this node reports instead of the observed `validity`.
    pub fn misreport_validity<R: Rng + ?Sized>(self, validity: f64, rng: &mut R) -> f64 {
        match self {
            NodeType::Honest => validity,
            NodeType::Silent => 0.0,
            NodeType::Corrupt => {
                if validity > 0.5 {
                    rng.gen::<f64>() * 0.4
                } else {
                    0.6 + rng.gen::<f64>() * 0.4
                }
            }
            NodeType::DoubleSpend => 0.8 + rng.gen::<f64>() * 0.2,
            NodeType::Random => rng.gen::<f64>(),
        }
    }

    /// Reputation this node reports instead of the actual `reputation`.
    pub fn misreport_reputation<R: Rng + ?Sized>(self, reputation: f64, rng: &mut R) -> f64 {
        match self {
            NodeType::Honest | NodeType::Silent => reputation,
            NodeType::Corrupt => {
                if reputation < 0.5 {
                    0.7 + rng.gen::<f64>() * 0.3
                } else {
                    rng.gen::<f64>() * 0.4
                }
            }
            NodeType::DoubleSpend => 0.8 + rng.gen::<f64>() * 0.2,
            NodeType::Random => rng.gen::<f64>(),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = ConsensusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        NodeType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| ConsensusError::InvalidConfig(format!("unknown node type {:?}", s)))
    }
}

/// Payload forgeries a corrupt node picks from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CorruptionKind {
    /// `CORRUPT_{data}`
    PrefixTag,
    /// `{data}_MALICIOUS_{node}`
    InjectMarker,
    /// `FAKE_BLOCK_NODE_{node}_{time}`, discarding the data
    Fabricate,
    /// `SCRAMBLED_{second half}_{first half}`
    ByteSwapHalves,
}

impl CorruptionKind {
    pub const ALL: [CorruptionKind; 4] = [
        CorruptionKind::PrefixTag,
        CorruptionKind::InjectMarker,
        CorruptionKind::Fabricate,
        CorruptionKind::ByteSwapHalves,
    ];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub fn apply(self, payload: &str, node: NodeId, logical_time: u64) -> String {
        match self {
            CorruptionKind::PrefixTag => format!("CORRUPT_{}", payload),
            CorruptionKind::InjectMarker => format!("{}_MALICIOUS_{}", payload, node),
            CorruptionKind::Fabricate => format!("FAKE_BLOCK_NODE_{}_{}", node, logical_time),
            CorruptionKind::ByteSwapHalves => {
                let chars: Vec<char> = payload.chars().collect();
                let (first, second) = chars.split_at(chars.len() / 2);
                format!(
                    "SCRAMBLED_{}_{}",
                    second.iter().collect::<String>(),
                    first.iter().collect::<String>()
                )
            }
        }
    }
}

/// Apply a uniformly chosen forgery to `payload`.
pub fn corrupt_payload<R: Rng + ?Sized>(
    payload: &str,
    node: NodeId,
    logical_time: u64,
    rng: &mut R,
) -> (CorruptionKind, String) {
    let kind = CorruptionKind::random(rng);
    (kind, kind.apply(payload, node, logical_time))
}

/// Payload of one half of a double spend.
pub fn double_spend_payload(node: NodeId, sequence: u64, logical_time: u64) -> String {
    format!(
        "DOUBLE_SPEND_NODE_{}_SEQ_{}_TIME_{}_AMOUNT_{}",
        node, sequence, logical_time, DOUBLE_SPEND_AMOUNT
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_honest_never_misbehaves() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert!(!NodeType::Honest.should_send_invalid_block(&mut rng));
            assert!(NodeType::Honest.should_participate(&mut rng));
            assert!(!NodeType::Honest.should_drop_message(&mut rng));
            assert!(!NodeType::Honest.should_delay_message(&mut rng));
        }
        assert_eq!(NodeType::Honest.misreport_validity(0.73, &mut rng), 0.73);
        assert_eq!(NodeType::Honest.misreport_reputation(0.41, &mut rng), 0.41);
    }

    #[test]
    fn test_honest_consumes_no_randomness() {
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        NodeType::Honest.should_participate(&mut a);
        NodeType::Honest.should_drop_message(&mut a);
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    fn test_corrupt_inverts_validity() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..100 {
            let v = NodeType::Corrupt.misreport_validity(0.9, &mut rng);
            assert!((0.0..0.4).contains(&v));
            let v = NodeType::Corrupt.misreport_validity(0.1, &mut rng);
            assert!((0.6..1.0).contains(&v));
        }
    }

    #[test]
    fn test_reputation_misreports_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for t in NodeType::ALL {
            for _ in 0..50 {
                let r = t.misreport_reputation(0.42, &mut rng);
                assert!((0.0..=1.0).contains(&r), "{} gave {}", t, r);
                let v = t.misreport_validity(0.42, &mut rng);
                assert!((0.0..=1.0).contains(&v), "{} gave {}", t, v);
            }
        }
        assert!(NodeType::Corrupt.misreport_reputation(0.42, &mut rng) >= 0.7);
        assert!(NodeType::DoubleSpend.misreport_reputation(0.1, &mut rng) >= 0.8);
        assert_eq!(NodeType::Silent.misreport_validity(0.9, &mut rng), 0.0);
    }

    #[test]
    fn test_corruption_transforms() {
        assert_eq!(CorruptionKind::PrefixTag.apply("tx2", 3, 0), "CORRUPT_tx2");
        assert_eq!(CorruptionKind::InjectMarker.apply("tx2", 3, 0), "tx2_MALICIOUS_3");
        assert_eq!(CorruptionKind::Fabricate.apply("tx2", 3, 17), "FAKE_BLOCK_NODE_3_17");
        assert_eq!(CorruptionKind::ByteSwapHalves.apply("abcdef", 3, 0), "SCRAMBLED_def_abc");
        assert_eq!(CorruptionKind::ByteSwapHalves.apply("abc", 3, 0), "SCRAMBLED_bc_a");
    }

    #[test]
    fn test_corrupt_payload_covers_all_kinds() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let (kind, text) = corrupt_payload("payload", 1, 5, &mut rng);
            assert_eq!(text, kind.apply("payload", 1, 5));
            seen.insert(format!("{:?}", kind));
        }
        assert_eq!(seen.len(), CorruptionKind::ALL.len());
    }

    #[test]
    fn test_double_spend_payload() {
        assert_eq!(
            double_spend_payload(16, 2, 40),
            "DOUBLE_SPEND_NODE_16_SEQ_2_TIME_40_AMOUNT_999999"
        );
    }

    #[test]
    fn test_node_type_parsing() {
        assert_eq!("corrupt".parse::<NodeType>().unwrap(), NodeType::Corrupt);
        assert_eq!("double-spend".parse::<NodeType>().unwrap(), NodeType::DoubleSpend);
        assert_eq!("DOUBLE_SPEND".parse::<NodeType>().unwrap(), NodeType::DoubleSpend);
        assert!("sneaky".parse::<NodeType>().is_err());
        for t in NodeType::ALL {
            assert_eq!(t.to_string().parse::<NodeType>().unwrap(), t);
        }
    }

    #[test]
    fn test_profiles() {
        assert_eq!(NodeType::Corrupt.profile().invalid_block, 0.8);
        assert_eq!(NodeType::Silent.profile().participation, 0.2);
        assert_eq!(NodeType::Random.profile().delay, 0.25);
        assert!(!NodeType::Honest.is_byzantine());
        assert!(NodeType::Silent.is_byzantine());
    }
}
