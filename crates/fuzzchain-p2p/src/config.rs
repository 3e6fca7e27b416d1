//! Network-level settings: size, who misbehaves, how long to run.

use fuzzchain_consensus::{NodeConfig, NodeId, NodeType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RuntimeError, RuntimeResult};

pub const DEFAULT_NODE_COUNT: usize = 20;
pub const DEFAULT_DURATION_MS: u64 = 120_000;
pub const DEFAULT_MINING_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_SEED: u64 = 42;

/// Behaviors given to the tail of the network when no assignment is configured.
const DEFAULT_BYZANTINE_TAIL: [NodeType; 5] = [
    NodeType::Silent,
    NodeType::Corrupt,
    NodeType::DoubleSpend,
    NodeType::Random,
    NodeType::Corrupt,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeKind {
    /// Single-threaded discrete-event loop on simulated time.
    #[default]
    EventLoop,
    /// One tokio task per node on scaled wall-clock time.
    Actors,
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeKind::EventLoop => write!(f, "event_loop"),
            RuntimeKind::Actors => write!(f, "actors"),
        }
    }
}

impl FromStr for RuntimeKind {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "event_loop" | "events" | "des" => Ok(RuntimeKind::EventLoop),
            "actors" | "tokio" => Ok(RuntimeKind::Actors),
            other => Err(RuntimeError::InvalidConfig(format!(
                "unknown runtime '{}', expected event_loop or actors",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub node_count: usize,
    /// Explicit Byzantine assignment by node id. `None` gives the last five
    /// nodes SILENT, CORRUPT, DOUBLE_SPEND, RANDOM and CORRUPT in that order.
    pub byzantine: Option<BTreeMap<NodeId, NodeType>>,
    pub mining_interval_ms: u64,
    /// Simulated time to run for.
    pub duration_ms: u64,
    pub seed: u64,
    pub runtime: RuntimeKind,
    /// Wall-clock time per simulated millisecond in the actor runtime.
    pub time_scale: f64,
    /// Offer every node's chain to every other node once the run ends.
    pub sync_on_finish: bool,
    pub node: NodeConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            node_count: DEFAULT_NODE_COUNT,
            byzantine: None,
            mining_interval_ms: DEFAULT_MINING_INTERVAL_MS,
            duration_ms: DEFAULT_DURATION_MS,
            seed: DEFAULT_SEED,
            runtime: RuntimeKind::EventLoop,
            time_scale: 0.01,
            sync_on_finish: true,
            node: NodeConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Load from a YAML file; absent keys take their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> RuntimeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> RuntimeResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> RuntimeResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Node constants with the network-wide mining interval applied.
    pub fn node_config(&self) -> NodeConfig {
        NodeConfig {
            mining_interval_ms: self.mining_interval_ms,
            ..self.node.clone()
        }
    }

    /// Behavior of every node, indexed by id.
    pub fn node_types(&self) -> Vec<NodeType> {
        let mut types = vec![NodeType::Honest; self.node_count];
        match &self.byzantine {
            Some(assignment) => {
                for (id, node_type) in assignment {
                    if let Some(slot) = types.get_mut(*id) {
                        *slot = *node_type;
                    }
                }
            }
            None => {
                // Keep at least one honest node.
                let tail = DEFAULT_BYZANTINE_TAIL.len().min(self.node_count.saturating_sub(1));
                let start = self.node_count - tail;
                for (offset, node_type) in DEFAULT_BYZANTINE_TAIL.iter().take(tail).enumerate() {
                    types[start + offset] = *node_type;
                }
            }
        }
        types
    }

    pub fn byzantine_count(&self) -> usize {
        self.node_types().iter().filter(|t| t.is_byzantine()).count()
    }

    pub fn validate(&self) -> RuntimeResult<()> {
        if self.node_count < 2 {
            return Err(RuntimeError::InvalidConfig(format!(
                "at least 2 nodes are required, got {}",
                self.node_count
            )));
        }
        if let Some(assignment) = &self.byzantine {
            if let Some(id) = assignment.keys().find(|id| **id >= self.node_count) {
                return Err(RuntimeError::InvalidConfig(format!(
                    "byzantine assignment names node {} but the network has {} nodes",
                    id, self.node_count
                )));
            }
        }
        if self.duration_ms == 0 {
            return Err(RuntimeError::InvalidConfig(
                "duration_ms must be positive".to_string(),
            ));
        }
        if !(self.time_scale > 0.0 && self.time_scale.is_finite()) {
            return Err(RuntimeError::InvalidConfig(format!(
                "time_scale must be positive, got {}",
                self.time_scale
            )));
        }
        self.node_config().validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_assignment() {
        let config = SimulationConfig::default();
        let types = config.node_types();
        assert_eq!(types.len(), 20);
        assert!(types[..15].iter().all(|t| *t == NodeType::Honest));
        assert_eq!(
            &types[15..],
            &[
                NodeType::Silent,
                NodeType::Corrupt,
                NodeType::DoubleSpend,
                NodeType::Random,
                NodeType::Corrupt
            ]
        );
        assert_eq!(config.byzantine_count(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_small_network_keeps_an_honest_node() {
        let config = SimulationConfig {
            node_count: 3,
            ..SimulationConfig::default()
        };
        let types = config.node_types();
        assert_eq!(types, vec![NodeType::Honest, NodeType::Silent, NodeType::Corrupt]);
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = "\
node_count: 4
seed: 7
runtime: actors
byzantine:
  3: DOUBLE_SPEND
node:
  difficulty: 2
  trust_threshold: 0.6
";
        let config = SimulationConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.node_count, 4);
        assert_eq!(config.seed, 7);
        assert_eq!(config.runtime, RuntimeKind::Actors);
        assert_eq!(config.node.difficulty, 2);
        assert_eq!(config.node.trust_threshold, 0.6);
        assert_eq!(config.node.vote_fanout, 2);
        assert_eq!(config.duration_ms, DEFAULT_DURATION_MS);
        assert_eq!(
            config.node_types(),
            vec![NodeType::Honest, NodeType::Honest, NodeType::Honest, NodeType::DoubleSpend]
        );
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let shipped = include_str!("../../../config/simulation.yaml");
        let config = SimulationConfig::from_yaml_str(shipped).unwrap();
        assert_eq!(config.node_types(), SimulationConfig::default().node_types());
        assert_eq!(config.node, NodeConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = SimulationConfig::default();
        let text = config.to_yaml().unwrap();
        assert_eq!(SimulationConfig::from_yaml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_validation_failures() {
        let config = SimulationConfig {
            node_count: 1,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());

        let mut assignment = BTreeMap::new();
        assignment.insert(20, NodeType::Corrupt);
        let config = SimulationConfig {
            byzantine: Some(assignment),
            ..SimulationConfig::default()
        };
        assert!(matches!(config.validate(), Err(RuntimeError::InvalidConfig(_))));

        let mut config = SimulationConfig::default();
        config.node.trust_threshold = -0.1;
        assert!(matches!(config.validate(), Err(RuntimeError::Protocol(_))));

        let mut config = SimulationConfig::default();
        config.node.difficulty = 65;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_runtime_kind_parsing() {
        assert_eq!("event-loop".parse::<RuntimeKind>().unwrap(), RuntimeKind::EventLoop);
        assert_eq!("Actors".parse::<RuntimeKind>().unwrap(), RuntimeKind::Actors);
        assert!("threads".parse::<RuntimeKind>().is_err());
    }
}
