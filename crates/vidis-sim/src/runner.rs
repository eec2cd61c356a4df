//! Deterministic simulation runner.
//!
//! One call to [`Simulation::step`] is one simulation tick: every packet due
//! at the current tick is delivered (one handler invocation per packet), then
//! every node is ticked in registration order, then the clock advances.

use crate::event_queue::{Delivery, EventKey};
use crate::topology::{Topology, TopologyError};
use std::collections::BTreeMap;
use tracing::{debug, trace};
use vidis_core::{NodeId, Outbox, ProtocolNode, SeededEntropy, Sent, Substrate};

/// Statistics collected during simulation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulationStats {
    /// Ticks run so far.
    pub ticks: u64,
    /// Packets handed to the substrate by nodes.
    pub packets_sent: u64,
    /// Packets handed back to a receiving node.
    pub packets_delivered: u64,
}

impl SimulationStats {
    /// Packets still on a link.
    pub fn in_flight(&self) -> u64 {
        self.packets_sent - self.packets_delivered
    }
}

/// Deterministic simulation of one protocol over one topology.
///
/// Given the same topology, nodes and seed, every run is identical.
pub struct Simulation<N: ProtocolNode> {
    /// All nodes, indexed like the topology.
    nodes: Vec<N>,

    topology: Topology,

    /// Packets in flight, ordered deterministically.
    queue: BTreeMap<EventKey, Delivery<N::Packet>>,

    /// Sequence counter for deterministic ordering.
    sequence: u64,

    /// Current tick.
    now: u64,

    /// Randomness for delays and protocol draws (seeded for determinism).
    entropy: SeededEntropy,

    stats: SimulationStats,
}

impl<N: ProtocolNode> Simulation<N> {
    /// Nodes must be given in the topology's registration order.
    pub fn new(
        topology: Topology,
        nodes: Vec<N>,
        entropy: SeededEntropy,
    ) -> Result<Self, TopologyError> {
        if nodes.len() != topology.node_count() {
            let index = nodes.len().min(topology.node_count());
            return Err(TopologyError::IndexOutOfRange(index));
        }
        for (expected, node) in topology.node_ids().iter().zip(&nodes) {
            if expected != node.id() {
                return Err(TopologyError::NodeMismatch {
                    expected: expected.clone(),
                    found: node.id().clone(),
                });
            }
        }

        Ok(Self {
            nodes,
            topology,
            queue: BTreeMap::new(),
            sequence: 0,
            now: 0,
            entropy,
            stats: SimulationStats::default(),
        })
    }

    /// Build a simulation whose nodes are created from the topology's ids.
    pub fn from_topology(
        topology: Topology,
        entropy: SeededEntropy,
        mut make: impl FnMut(&NodeId) -> N,
    ) -> Self {
        let nodes = topology.node_ids().iter().map(&mut make).collect();
        Self {
            nodes,
            topology,
            queue: BTreeMap::new(),
            sequence: 0,
            now: 0,
            entropy,
            stats: SimulationStats::default(),
        }
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    pub fn node(&self, id: &NodeId) -> Option<&N> {
        self.topology.index_of(id).map(|i| &self.nodes[i])
    }

    /// Number of links currently attached to `id` (0 for unknown nodes).
    pub fn link_count(&self, id: &NodeId) -> usize {
        self.topology
            .index_of(id)
            .map_or(0, |i| self.topology.links_of(i).len())
    }

    pub fn pending_packets(&self) -> usize {
        self.queue.len()
    }

    /// Harness-level randomness, shared with the nodes.
    pub fn entropy_mut(&mut self) -> &mut SeededEntropy {
        &mut self.entropy
    }

    /// Run `f` against node `id` with a live substrate, e.g. to issue a command.
    pub fn with_node<R>(
        &mut self,
        id: &NodeId,
        f: impl FnOnce(&mut N, &mut dyn Substrate<N::Packet>) -> R,
    ) -> Option<R> {
        let index = self.topology.index_of(id)?;
        Some(self.with_node_at(index, f))
    }

    /// Like [`Simulation::with_node`], by registration index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn with_node_at<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut N, &mut dyn Substrate<N::Packet>) -> R,
    ) -> R {
        let links = self.topology.links_of(index).to_vec();
        let mut outbox = Outbox::new(links, &mut self.entropy);
        let result = f(&mut self.nodes[index], &mut outbox);
        for sent in outbox.into_sent() {
            self.schedule(index, sent);
        }
        result
    }

    /// Advance the simulation by exactly one tick.
    pub fn step(&mut self) {
        while let Some(entry) = self.queue.first_entry() {
            if entry.key().tick > self.now {
                break;
            }
            let Delivery { to, link, packet } = entry.remove();
            self.stats.packets_delivered += 1;
            self.with_node_at(to, |node, net| node.on_packet(packet, link, net));
        }

        for index in 0..self.nodes.len() {
            self.with_node_at(index, |node, net| node.on_tick(net));
        }

        self.now += 1;
        self.stats.ticks += 1;
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Step until `done` holds or `max_ticks` ran out. Returns whether `done` held.
    pub fn run_until(&mut self, max_ticks: u64, mut done: impl FnMut(&Self) -> bool) -> bool {
        for _ in 0..max_ticks {
            if done(self) {
                return true;
            }
            self.step();
        }
        let reached = done(self);
        debug!(tick = self.now, reached, "run_until finished");
        reached
    }

    /// Step until no packet is in flight, bounded by `max_ticks`.
    pub fn run_until_quiet(&mut self, max_ticks: u64) -> bool {
        self.run_until(max_ticks, |sim| sim.queue.is_empty())
    }

    fn schedule(&mut self, from: usize, sent: Sent<N::Packet>) {
        let Some(to) = self.topology.other_end(sent.link, from) else {
            trace!(from, link = %sent.link, "send on a link the node is not attached to");
            return;
        };
        let key = EventKey {
            tick: self.now + 1 + sent.delay,
            node_index: to,
            sequence: self.sequence,
        };
        self.sequence += 1;
        self.stats.packets_sent += 1;
        trace!(from, to, link = %sent.link, due = key.tick, packet = ?sent.packet, "scheduled");
        self.queue.insert(
            key,
            Delivery {
                to,
                link: sent.link,
                packet: sent.packet,
            },
        );
    }
}
