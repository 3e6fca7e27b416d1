//! Boundary between a node and whatever delivers its messages and timers.

use std::time::Duration;

use crate::messages::{Message, NodeId};

/// Delivery substrate seen by a node.
///
/// Implementations must deliver each `send` exactly once, no earlier than
/// `delay` after the call, and fire each scheduled timer once. Delays are
/// relative; nodes never read a clock to schedule work.
pub trait Transport {
    fn schedule_timer(&mut self, node: NodeId, delay: Duration);

    fn send(&mut self, from: NodeId, to: NodeId, message: Message, delay: Duration);
}
