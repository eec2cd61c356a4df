//! Event queue with deterministic ordering.

use std::cmp::Ordering;
use vidis_core::LinkId;

/// Key for ordering deliveries in the queue.
///
/// Deliveries are ordered by:
/// 1. Tick (earlier first)
/// 2. Receiving node index (deterministic ordering)
/// 3. Sequence number (FIFO for the same tick and node)
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EventKey {
    /// Tick at which the packet arrives.
    pub tick: u64,
    /// Which node receives the packet.
    pub node_index: usize,
    /// Sequence number for deterministic FIFO ordering.
    pub sequence: u64,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.tick.cmp(&other.tick) {
            Ordering::Equal => {}
            ord => return ord,
        }

        match self.node_index.cmp(&other.node_index) {
            Ordering::Equal => {}
            ord => return ord,
        }

        self.sequence.cmp(&other.sequence)
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A packet in flight.
#[derive(Debug, Clone)]
pub struct Delivery<P> {
    pub to: usize,
    /// Link the packet arrives on, as seen by the receiver.
    pub link: LinkId,
    pub packet: P,
}
