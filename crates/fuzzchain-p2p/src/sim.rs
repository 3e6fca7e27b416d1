// DISCRETE-EVENT SIMULATION
// Runs every node on one thread over simulated time.
//
// SAFETY INVARIANTS:
// 1. Events fire in (time, insertion order); ties never depend on hashing or threads
// 2. Every send is delivered exactly once and every timer fires once, unless the
//    run ends first
// 3. All randomness derives from the configured seed, so a seed replays a run
// 4. Simulated time never goes backwards

use fuzzchain_consensus::{Message, Node, NodeId, Transport};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use crate::config::{RuntimeKind, SimulationConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::report::{DeliveryStats, SimulationReport};

#[derive(Debug)]
enum EventKind {
    Timer(NodeId),
    Deliver {
        from: NodeId,
        to: NodeId,
        message: Message,
    },
}

#[derive(Debug)]
struct Scheduled {
    at_ms: u64,
    seq: u64,
    kind: EventKind,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.at_ms == other.at_ms && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Reversed so the max-heap pops the earliest event first.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.at_ms, other.seq).cmp(&(self.at_ms, self.seq))
    }
}

/// Pending timers and in-flight messages, ordered by delivery time.
#[derive(Debug, Default)]
pub struct EventQueue {
    now_ms: u64,
    next_seq: u64,
    heap: BinaryHeap<Scheduled>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time.
    pub fn now(&self) -> Duration {
        Duration::from_millis(self.now_ms)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn push(&mut self, delay: Duration, kind: EventKind) {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let event = Scheduled {
            at_ms: self.now_ms.saturating_add(delay_ms),
            seq: self.next_seq,
            kind,
        };
        self.next_seq += 1;
        self.heap.push(event);
    }

    /// Pop the next event due no later than `deadline_ms`, advancing the clock.
    fn pop_until(&mut self, deadline_ms: u64) -> Option<Scheduled> {
        if self.heap.peek()?.at_ms > deadline_ms {
            return None;
        }
        let event = self.heap.pop()?;
        self.now_ms = event.at_ms;
        Some(event)
    }
}

impl Transport for EventQueue {
    fn schedule_timer(&mut self, node: NodeId, delay: Duration) {
        self.push(delay, EventKind::Timer(node));
    }

    fn send(&mut self, from: NodeId, to: NodeId, message: Message, delay: Duration) {
        self.push(delay, EventKind::Deliver { from, to, message });
    }
}

/// Build the network described by `config`, each node with its own seed.
pub fn build_nodes(config: &SimulationConfig) -> Vec<Node> {
    let mut master = StdRng::seed_from_u64(config.seed);
    let node_config = config.node_config();
    let ids: Vec<NodeId> = (0..config.node_count).collect();

    config
        .node_types()
        .into_iter()
        .enumerate()
        .map(|(id, node_type)| {
            let peers = ids.iter().copied().filter(|p| *p != id).collect();
            Node::new(id, node_type, peers, node_config.clone(), master.gen())
        })
        .collect()
}

/// Offer every node's chain to every other node.
///
/// # Returns
/// Number of chain replacements that took place.
pub fn sync_chains(nodes: &mut [Node]) -> usize {
    let mut adopted = 0;
    // Offer longer chains first so each node converges in one pass.
    let mut order: Vec<usize> = (0..nodes.len()).collect();
    order.sort_by_key(|i| std::cmp::Reverse(nodes[*i].chain().len()));

    for source in order {
        let wire = nodes[source].chain().serialize();
        for (id, node) in nodes.iter_mut().enumerate() {
            if id != source && node.offer_chain(&wire) {
                adopted += 1;
                debug!("Node {} adopted the chain of node {}", id, source);
            }
        }
    }
    adopted
}

pub struct Simulation {
    config: SimulationConfig,
    nodes: Vec<Node>,
    queue: EventQueue,
    delivery: DeliveryStats,
    started: bool,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> RuntimeResult<Self> {
        config.validate()?;
        let nodes = build_nodes(&config);
        Ok(Simulation {
            config,
            nodes,
            queue: EventQueue::new(),
            delivery: DeliveryStats::default(),
            started: false,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> RuntimeResult<&Node> {
        self.nodes.get(id).ok_or(RuntimeError::UnknownNode(id))
    }

    pub fn now(&self) -> Duration {
        self.queue.now()
    }

    pub fn delivery(&self) -> DeliveryStats {
        self.delivery
    }

    fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        let Simulation { nodes, queue, .. } = self;
        for node in nodes.iter_mut() {
            node.start(queue);
        }
    }

    /// Process every event due up to `deadline`.
    ///
    /// # Returns
    /// Number of events processed by this call.
    pub fn run_until(&mut self, deadline: Duration) -> u64 {
        self.start();
        let deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
        let mut processed = 0;

        let Simulation {
            nodes,
            queue,
            delivery,
            ..
        } = self;

        while let Some(event) = queue.pop_until(deadline_ms) {
            processed += 1;
            delivery.last_event_ms = event.at_ms;
            match event.kind {
                EventKind::Timer(id) => {
                    delivery.timers_fired += 1;
                    if let Some(node) = nodes.get_mut(id) {
                        node.on_timer(queue);
                    }
                }
                EventKind::Deliver { from, to, message } => {
                    delivery.messages_delivered += 1;
                    match nodes.get_mut(to) {
                        Some(node) => node.on_message(message, queue),
                        None => debug!("Dropping {} from {} to unknown node {}", message.kind(), from, to),
                    }
                }
            }
        }

        processed
    }

    /// Run for the configured duration, sync chains if asked, and report.
    pub fn run(mut self) -> SimulationReport {
        info!(
            "Starting event-loop simulation: {} nodes ({} Byzantine), {} ms, seed {}",
            self.config.node_count,
            self.config.byzantine_count(),
            self.config.duration_ms,
            self.config.seed
        );
        let processed = self.run_until(self.config.duration());
        info!(
            "Simulation reached {} ms after {} events, {} still pending",
            self.queue.now_ms,
            processed,
            self.queue.len()
        );

        let adopted = if self.config.sync_on_finish {
            sync_chains(&mut self.nodes)
        } else {
            0
        };

        SimulationReport::from_nodes(
            RuntimeKind::EventLoop,
            self.config.seed,
            self.config.duration_ms,
            self.delivery,
            adopted,
            &self.nodes,
        )
    }
}
