use fuzzchain_consensus::NodeType;
use fuzzchain_p2p::{run, RuntimeKind, Simulation, SimulationConfig, SimulationReport};
use std::collections::BTreeMap;
use std::time::Duration;

fn small_network(seed: u64) -> SimulationConfig {
    let mut byzantine = BTreeMap::new();
    byzantine.insert(4, NodeType::Corrupt);
    byzantine.insert(5, NodeType::DoubleSpend);

    let mut config = SimulationConfig {
        node_count: 6,
        byzantine: Some(byzantine),
        duration_ms: 120_000,
        seed,
        ..SimulationConfig::default()
    };
    config.node.difficulty = 2;
    config
}

/// Mining wall time is the one field that varies between identical runs.
fn without_timing(mut report: SimulationReport) -> SimulationReport {
    for node in &mut report.nodes {
        node.stats.mining_time_ms = 0;
    }
    report
}

#[test]
fn test_same_seed_replays_the_run() {
    let first = without_timing(Simulation::new(small_network(11)).unwrap().run());
    let second = without_timing(Simulation::new(small_network(11)).unwrap().run());
    assert_eq!(first, second);

    let other = Simulation::new(small_network(12)).unwrap().run();
    let tips = |r: &SimulationReport| r.nodes.iter().map(|n| n.tip.clone()).collect::<Vec<_>>();
    assert_ne!(tips(&first), tips(&other));
}

#[test]
fn test_honest_majority_outranks_byzantine_peers() {
    let report = Simulation::new(small_network(21)).unwrap().run();

    assert!(report.all_chains_valid());
    assert!(report.longest_chain() > 1);
    assert!(report.total_accepted() > 0);
    assert!(report.total_forged_blocks() > 0);
    assert!(report.total_byzantine_detected() > 0);
    assert!(
        report.honest_view_of_honest > report.honest_view_of_byzantine,
        "honest {} vs byzantine {}",
        report.honest_view_of_honest,
        report.honest_view_of_byzantine
    );
    assert!(report.delivery.timers_fired > 0);
    assert!(report.delivery.last_event_ms <= 120_000);
}

#[test]
fn test_sync_spreads_the_longest_chain() {
    let mut config = small_network(31);
    config.byzantine = Some(BTreeMap::new());
    let report = Simulation::new(config).unwrap().run();

    let longest = report.longest_chain();
    assert!(longest > 1);
    assert!(report.nodes.iter().all(|n| n.chain_length == longest));
    assert!(report.all_chains_valid());
}

#[test]
fn test_forged_blocks_never_enter_honest_chains() {
    let mut config = small_network(5);
    config.node.difficulty = 3;
    config.duration_ms = 90_000;
    config.sync_on_finish = false;

    let mut sim = Simulation::new(config).unwrap();
    sim.run_until(Duration::from_millis(90_000));

    let forged: Vec<&String> = sim
        .nodes()
        .iter()
        .filter(|n| n.node_type().is_byzantine())
        .flat_map(|n| n.forged_blocks())
        .collect();
    assert!(!forged.is_empty());

    let honest: Vec<_> = sim
        .nodes()
        .iter()
        .filter(|n| !n.node_type().is_byzantine())
        .collect();
    assert!(honest.iter().any(|n| n.stats().blocks_rejected > 0));
    for node in honest {
        assert!(node.chain().is_chain_valid());
        for id in &forged {
            assert!(
                !node.chain().contains(id),
                "node {} holds forged block {}",
                node.id(),
                id
            );
        }
    }
}

#[tokio::test]
async fn test_run_dispatches_to_event_loop() {
    let config = small_network(51);
    let expected = without_timing(Simulation::new(config.clone()).unwrap().run());

    let report = without_timing(run(config).await.unwrap());
    assert_eq!(report.runtime, RuntimeKind::EventLoop);
    assert_eq!(report, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_actor_runtime_smoke() {
    let mut config = small_network(41);
    config.runtime = RuntimeKind::Actors;
    config.duration_ms = 60_000;
    config.time_scale = 0.005;

    let report = run(config).await.unwrap();
    assert_eq!(report.runtime, RuntimeKind::Actors);
    assert_eq!(report.nodes.len(), 6);
    assert!(report.all_chains_valid());
    assert!(report.delivery.timers_fired > 0);
}
