// TOKIO ACTOR RUNTIME
// One task per node, each owning its node and draining an unbounded mailbox.
//
// SAFETY INVARIANTS:
// 1. A node is only touched by its own actor task; handlers run one at a time
// 2. Sends and timers are fire-and-forget tasks that sleep then post once
// 3. Mining runs on the blocking pool so the scheduler keeps delivering
// 4. Shutdown is a mailbox message, so earlier deliveries are handled first

use fuzzchain_consensus::{Message, Node, NodeId, Transport};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::config::{RuntimeKind, SimulationConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::report::{DeliveryStats, SimulationReport};
use crate::sim::{build_nodes, sync_chains};

/// Mailbox item for a node actor.
#[derive(Debug)]
pub enum Envelope {
    Timer,
    Message { from: NodeId, message: Message },
    Shutdown,
}

#[derive(Debug, Default)]
struct Counters {
    timers_fired: AtomicU64,
    messages_delivered: AtomicU64,
}

impl Counters {
    fn snapshot(&self, last_event_ms: u64) -> DeliveryStats {
        DeliveryStats {
            timers_fired: self.timers_fired.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            last_event_ms,
        }
    }
}

/// Transport backed by tokio timers and per-node channels.
#[derive(Clone)]
pub struct ChannelTransport {
    mailboxes: Arc<Vec<mpsc::UnboundedSender<Envelope>>>,
    handle: Handle,
    time_scale: f64,
}

impl ChannelTransport {
    fn scaled(&self, delay: Duration) -> Duration {
        delay.mul_f64(self.time_scale)
    }

    fn post_later(&self, to: NodeId, delay: Duration, envelope: Envelope) {
        let Some(mailbox) = self.mailboxes.get(to).cloned() else {
            debug!("No mailbox for node {}", to);
            return;
        };
        let wait = self.scaled(delay);
        self.handle.spawn(async move {
            sleep(wait).await;
            // A closed mailbox means the actor already shut down.
            let _ = mailbox.send(envelope);
        });
    }
}

impl Transport for ChannelTransport {
    fn schedule_timer(&mut self, node: NodeId, delay: Duration) {
        self.post_later(node, delay, Envelope::Timer);
    }

    fn send(&mut self, from: NodeId, to: NodeId, message: Message, delay: Duration) {
        self.post_later(to, delay, Envelope::Message { from, message });
    }
}

async fn run_actor(
    mut node: Node,
    mut inbox: mpsc::UnboundedReceiver<Envelope>,
    transport: ChannelTransport,
    counters: Arc<Counters>,
) -> RuntimeResult<Node> {
    let id = node.id();
    node.start(&mut transport.clone());

    while let Some(envelope) = inbox.recv().await {
        let mut t = transport.clone();
        node = match envelope {
            Envelope::Shutdown => break,
            Envelope::Timer => {
                counters.timers_fired.fetch_add(1, Ordering::Relaxed);
                tokio::task::spawn_blocking(move || {
                    node.on_timer(&mut t);
                    node
                })
                .await
            }
            Envelope::Message { from, message } => {
                counters.messages_delivered.fetch_add(1, Ordering::Relaxed);
                debug!("Node {} <- {} from {}", id, message.kind(), from);
                tokio::task::spawn_blocking(move || {
                    node.on_message(message, &mut t);
                    node
                })
                .await
            }
        }
        .map_err(|e| RuntimeError::ActorFailed {
            node: id,
            reason: e.to_string(),
        })?;
    }

    debug!("Node {} actor stopped after {} rounds", id, node.round());
    Ok(node)
}

/// A running network of node actors.
pub struct ActorNetwork {
    config: SimulationConfig,
    mailboxes: Arc<Vec<mpsc::UnboundedSender<Envelope>>>,
    actors: Vec<JoinHandle<RuntimeResult<Node>>>,
    counters: Arc<Counters>,
}

impl ActorNetwork {
    /// Spawn one actor per node. Must be called inside a tokio runtime.
    pub fn spawn(config: SimulationConfig) -> RuntimeResult<Self> {
        config.validate()?;
        let nodes = build_nodes(&config);

        let (senders, receivers): (Vec<_>, Vec<_>) =
            nodes.iter().map(|_| mpsc::unbounded_channel::<Envelope>()).unzip();
        let mailboxes = Arc::new(senders);
        let counters = Arc::new(Counters::default());
        let transport = ChannelTransport {
            mailboxes: Arc::clone(&mailboxes),
            handle: Handle::current(),
            time_scale: config.time_scale,
        };

        let actors = nodes
            .into_iter()
            .zip(receivers)
            .map(|(node, inbox)| {
                tokio::spawn(run_actor(
                    node,
                    inbox,
                    transport.clone(),
                    Arc::clone(&counters),
                ))
            })
            .collect();

        Ok(ActorNetwork {
            config,
            mailboxes,
            actors,
            counters,
        })
    }

    /// Wall-clock time that corresponds to the configured simulated duration.
    pub fn wall_duration(&self) -> Duration {
        self.config.duration().mul_f64(self.config.time_scale)
    }

    pub fn delivery(&self) -> DeliveryStats {
        self.counters.snapshot(self.config.duration_ms)
    }

    /// Stop every actor and hand back the nodes in id order.
    pub async fn shutdown(self) -> RuntimeResult<(Vec<Node>, DeliveryStats)> {
        for mailbox in self.mailboxes.iter() {
            let _ = mailbox.send(Envelope::Shutdown);
        }

        let mut nodes = Vec::with_capacity(self.actors.len());
        for (id, actor) in self.actors.into_iter().enumerate() {
            let node = actor.await.map_err(|e| RuntimeError::ActorFailed {
                node: id,
                reason: e.to_string(),
            })??;
            nodes.push(node);
        }

        Ok((nodes, self.counters.snapshot(self.config.duration_ms)))
    }
}

/// Run the configured network on actors for its scaled duration and report.
pub async fn run_actors(config: SimulationConfig) -> RuntimeResult<SimulationReport> {
    let network = ActorNetwork::spawn(config.clone())?;
    let wall = network.wall_duration();
    info!(
        "Starting actor simulation: {} nodes ({} Byzantine), {} ms simulated over {:?}",
        config.node_count,
        config.byzantine_count(),
        config.duration_ms,
        wall
    );

    sleep(wall).await;
    let (mut nodes, delivery) = network.shutdown().await?;

    let adopted = if config.sync_on_finish {
        sync_chains(&mut nodes)
    } else {
        0
    };
    if nodes.iter().any(|n| !n.chain().is_chain_valid()) {
        warn!("At least one node finished with an invalid chain");
    }

    Ok(SimulationReport::from_nodes(
        RuntimeKind::Actors,
        config.seed,
        config.duration_ms,
        delivery,
        adopted,
        &nodes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuzzchain_consensus::Vote;

    #[tokio::test]
    async fn test_transport_delivers_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = ChannelTransport {
            mailboxes: Arc::new(vec![tx]),
            handle: Handle::current(),
            time_scale: 1.0,
        };

        transport.send(3, 0, Message::Vote(Vote::new("b", true, 3)), Duration::from_millis(20));
        transport.schedule_timer(0, Duration::from_millis(5));
        // Unknown destinations are ignored.
        transport.schedule_timer(9, Duration::from_millis(1));

        assert!(matches!(rx.recv().await, Some(Envelope::Timer)));
        match rx.recv().await {
            Some(Envelope::Message { from, message }) => {
                assert_eq!(from, 3);
                assert_eq!(message.kind(), "Vote");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_shutdown_returns_every_node() {
        let config = SimulationConfig {
            node_count: 3,
            ..SimulationConfig::default()
        };
        let network = ActorNetwork::spawn(config).unwrap();
        let (nodes, delivery) = network.shutdown().await.unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(nodes.iter().enumerate().all(|(i, n)| n.id() == i));
        assert_eq!(delivery.timers_fired, 0);
    }
}
