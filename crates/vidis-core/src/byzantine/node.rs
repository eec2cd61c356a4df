//! # node
//!
//! why: a general that floods orders and decides once every neighbor reported
//! relations: uses packet.rs for orders, ballot.rs for tallies, substrate.rs for sends
//! what: GeneralKind relay policies, GeneralNode with its ballot boxes and queries

use super::ballot::{BallotBox, Decisions, Verdict};
use super::packet::{GeneralPacket, OriginId, Vote};
use crate::entropy::Entropy;
use crate::node::{LinkId, NodeColor, NodeId, ProtocolNode};
use crate::substrate::Substrate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// How a general treats the orders it relays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneralKind {
    /// Relays every order unchanged
    #[default]
    Good,
    /// Relays the opposite of every order
    Bad,
    /// Relays a fresh coin flip for every order
    Undecided,
}

impl GeneralKind {
    /// The vote this kind of general passes on after receiving `vote`.
    pub fn relay_vote(self, vote: Vote, entropy: &mut dyn Entropy) -> Vote {
        match self {
            Self::Good => vote,
            Self::Bad => vote.opposite(),
            Self::Undecided => {
                if entropy.coin_flip() {
                    Vote::Attack
                } else {
                    Vote::Retreat
                }
            }
        }
    }

    pub fn color(self) -> NodeColor {
        match self {
            Self::Good => NodeColor::Green,
            Self::Bad => NodeColor::Red,
            Self::Undecided => NodeColor::Orange,
        }
    }
}

/// A general in the byzantine generals flooding protocol.
#[derive(Debug, Clone)]
pub struct GeneralNode {
    pub id: NodeId,
    pub kind: GeneralKind,
    /// One ballot box per origin, kept for the whole run
    ballots: BTreeMap<OriginId, BallotBox>,
}

impl GeneralNode {
    pub fn new(id: impl Into<NodeId>, kind: GeneralKind) -> Self {
        Self {
            id: id.into(),
            kind,
            ballots: BTreeMap::new(),
        }
    }

    pub fn issue_attack(&mut self, net: &mut dyn Substrate<GeneralPacket>) -> OriginId {
        self.issue(Vote::Attack, net)
    }

    pub fn issue_retreat(&mut self, net: &mut dyn Substrate<GeneralPacket>) -> OriginId {
        self.issue(Vote::Retreat, net)
    }

    /// Flood a fresh order to every neighbor and return its ballot key.
    pub fn issue(&mut self, vote: Vote, net: &mut dyn Substrate<GeneralPacket>) -> OriginId {
        let origin = net.entropy().origin_id();
        self.ballots.entry(origin).or_default();
        debug!(node = %self.id, %origin, ?vote, "issuing order");
        self.broadcast(GeneralPacket::new(vote, origin), net);
        origin
    }

    pub fn receive(
        &mut self,
        packet: GeneralPacket,
        arrival: LinkId,
        net: &mut dyn Substrate<GeneralPacket>,
    ) {
        let origin = packet.origin();
        let ballot = self.ballots.entry(origin).or_default();
        if !ballot.record(arrival, packet.vote()) {
            trace!(node = %self.id, %packet, %arrival, "duplicate vote, not relaying");
            return;
        }
        let relayed = self.kind.relay_vote(packet.vote(), net.entropy());
        self.broadcast(GeneralPacket::new(relayed, origin), net);
    }

    pub fn ballot(&self, origin: OriginId) -> Option<&BallotBox> {
        self.ballots.get(&origin)
    }

    pub fn verdict(&self, origin: OriginId, link_count: usize) -> Option<Verdict> {
        self.ballots.get(&origin).map(|b| b.verdict(link_count))
    }

    /// Every known origin grouped by verdict, in origin order.
    pub fn decisions(&self, link_count: usize) -> Decisions {
        let mut decisions = Decisions::default();
        for (origin, ballot) in &self.ballots {
            decisions.push(*origin, ballot.verdict(link_count));
        }
        decisions
    }

    pub fn attacked_origins(&self, link_count: usize) -> Vec<OriginId> {
        self.origins_with(Verdict::Attack, link_count)
    }

    pub fn retreated_origins(&self, link_count: usize) -> Vec<OriginId> {
        self.origins_with(Verdict::Retreat, link_count)
    }

    pub fn clashing_origins(&self, link_count: usize) -> Vec<OriginId> {
        self.origins_with(Verdict::Clash, link_count)
    }

    pub fn pending_origins(&self, link_count: usize) -> Vec<OriginId> {
        self.origins_with(Verdict::Pending, link_count)
    }

    fn origins_with(&self, verdict: Verdict, link_count: usize) -> Vec<OriginId> {
        self.ballots
            .iter()
            .filter(|(_, ballot)| ballot.verdict(link_count) == verdict)
            .map(|(origin, _)| *origin)
            .collect()
    }

    fn broadcast(&self, packet: GeneralPacket, net: &mut dyn Substrate<GeneralPacket>) {
        for link in net.connected_links() {
            let delay = net.entropy().delivery_delay();
            net.send(packet, link, delay);
        }
    }
}

impl ProtocolNode for GeneralNode {
    type Packet = GeneralPacket;

    fn id(&self) -> &NodeId {
        &self.id
    }

    fn on_tick(&mut self, _net: &mut dyn Substrate<GeneralPacket>) {}

    fn on_packet(
        &mut self,
        packet: GeneralPacket,
        arrival: LinkId,
        net: &mut dyn Substrate<GeneralPacket>,
    ) {
        self.receive(packet, arrival, net);
    }

    fn color(&self) -> NodeColor {
        self.kind.color()
    }

    fn summary(&self) -> String {
        format!("{:?}: {} orders seen", self.kind, self.ballots.len())
    }
}
