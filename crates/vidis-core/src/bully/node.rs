//! # node
//!
//! why: the per-node bully election state machine
//! relations: uses packet.rs for wire types, substrate.rs for links and sends
//! what: BullyNode, BullyConfig timeouts, BullyStatus for renderers

use super::packet::{BullyMessage, BullyPacket};
use crate::node::{LinkId, NodeColor, NodeId, ProtocolNode};
use crate::substrate::Substrate;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Timeouts, in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BullyConfig {
    /// How long a ping may go unanswered before the leader is presumed dead
    pub check_timeout: u32,
    /// Delay between a failed check and the fresh election it triggers
    pub restart_timeout: u32,
}

impl Default for BullyConfig {
    fn default() -> Self {
        Self {
            check_timeout: 100,
            restart_timeout: 60,
        }
    }
}

/// Coarse state, in the priority a renderer shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BullyStatus {
    Disabled,
    /// Waiting for the leader to answer a ping
    Checking,
    /// Waiting to start a fresh election
    Restarting,
    Leader,
    Idle,
}

impl BullyStatus {
    pub fn color(self) -> NodeColor {
        match self {
            Self::Disabled => NodeColor::Red,
            Self::Checking => NodeColor::LightOrange,
            Self::Restarting => NodeColor::Orange,
            Self::Leader => NodeColor::Green,
            Self::Idle => NodeColor::Grey,
        }
    }
}

/// A single node taking part in bully elections.
#[derive(Debug, Clone)]
pub struct BullyNode {
    /// Unique identifier, also the node's candidacy
    pub id: NodeId,
    pub config: BullyConfig,
    /// Leader this node currently believes in (`None` while an election runs)
    pub leader: Option<NodeId>,
    /// Ticks left before an unanswered ping counts as a dead leader
    pub check_timer: Option<u32>,
    /// Ticks left before a fresh election starts
    pub restart_timer: Option<u32>,
    /// A disabled node neither sends nor receives
    pub enabled: bool,
}

impl BullyNode {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self::with_config(id, BullyConfig::default())
    }

    pub fn with_config(id: impl Into<NodeId>, config: BullyConfig) -> Self {
        Self {
            id: id.into(),
            config,
            leader: None,
            check_timer: None,
            restart_timer: None,
            enabled: true,
        }
    }

    pub fn has_leader(&self) -> bool {
        self.leader.is_some()
    }

    pub fn is_leader(&self) -> bool {
        self.leader.as_ref() == Some(&self.id)
    }

    pub fn status(&self) -> BullyStatus {
        if !self.enabled {
            BullyStatus::Disabled
        } else if self.check_timer.is_some_and(|t| t > 0) {
            BullyStatus::Checking
        } else if self.restart_timer.is_some_and(|t| t > 0) {
            BullyStatus::Restarting
        } else if self.is_leader() {
            BullyStatus::Leader
        } else {
            BullyStatus::Idle
        }
    }

    pub fn toggle_enabled(&mut self) {
        self.set_enabled(!self.enabled);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            debug!(node = %self.id, enabled, "toggled");
        }
        self.enabled = enabled;
    }

    /// Advance both timers by one tick and fire whichever runs out.
    pub fn tick(&mut self, net: &mut dyn Substrate<BullyPacket>) {
        if !self.enabled {
            return;
        }

        if let Some(remaining) = self.check_timer {
            let remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                self.check_timer = None;
                debug!(node = %self.id, "leader did not answer, restarting election");
                self.restart_election(net);
                self.restart_timer = Some(self.config.restart_timeout);
            } else {
                self.check_timer = Some(remaining);
            }
        }

        if let Some(remaining) = self.restart_timer {
            let remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                self.restart_timer = None;
                self.start_election(net);
            } else {
                self.restart_timer = Some(remaining);
            }
        }
    }

    /// Nominate ourselves and tell every neighbor.
    pub fn start_election(&mut self, net: &mut dyn Substrate<BullyPacket>) {
        if !self.enabled {
            return;
        }
        debug!(node = %self.id, "starting election");
        self.leader = Some(self.id.clone());
        let message = BullyMessage::Election {
            leader: self.id.clone(),
        };
        self.broadcast(&message, net);
    }

    /// Forget the leader and ask every neighbor to do the same.
    pub fn restart_election(&mut self, net: &mut dyn Substrate<BullyPacket>) {
        if !self.enabled {
            return;
        }
        debug!(node = %self.id, "restarting election");
        self.leader = None;
        self.broadcast(&BullyMessage::ElectionRestart, net);
    }

    /// Probe the known leader, or start an election when there is none.
    pub fn check_leader(&mut self, net: &mut dyn Substrate<BullyPacket>) {
        if !self.enabled {
            return;
        }
        match self.leader.clone() {
            Some(leader) => {
                self.check_timer = Some(self.config.check_timeout);
                let message = BullyMessage::Ping {
                    leader,
                    sender: self.id.clone(),
                };
                self.broadcast(&message, net);
            }
            None => self.start_election(net),
        }
    }

    pub fn receive(
        &mut self,
        packet: BullyPacket,
        arrival: LinkId,
        net: &mut dyn Substrate<BullyPacket>,
    ) {
        if !self.enabled {
            trace!(node = %self.id, %packet, "disabled, dropping inbound packet");
            return;
        }
        let budget = packet.hops();
        match packet.message {
            BullyMessage::ElectionRestart => self.on_restart(budget, arrival, net),
            BullyMessage::Election { leader } => self.on_election(leader, budget, arrival, net),
            BullyMessage::Ping { leader, sender } => {
                self.on_ping(leader, sender, budget, arrival, net)
            }
            BullyMessage::Pong { leader, sender } => {
                self.on_pong(leader, sender, budget, arrival, net)
            }
        }
    }

    fn on_restart(&mut self, budget: u32, arrival: LinkId, net: &mut dyn Substrate<BullyPacket>) {
        if self.has_leader() {
            self.relay_except(&BullyMessage::ElectionRestart, budget, arrival, net);
        }
        self.leader = None;
    }

    fn on_election(
        &mut self,
        candidate: NodeId,
        budget: u32,
        arrival: LinkId,
        net: &mut dyn Substrate<BullyPacket>,
    ) {
        match self.leader.clone() {
            None if self.id > candidate => {
                let ours = BullyMessage::Election {
                    leader: self.id.clone(),
                };
                self.dispatch(BullyPacket::relayed(ours.clone(), budget), arrival, net);
                self.adopt(self.id.clone());
                self.relay_except(&ours, budget, arrival, net);
            }
            None => {
                self.adopt(candidate.clone());
                let theirs = BullyMessage::Election { leader: candidate };
                self.relay_except(&theirs, budget, arrival, net);
            }
            Some(current) if current == candidate => {}
            Some(current) if current > candidate => {
                let ours = BullyMessage::Election { leader: current };
                self.dispatch(BullyPacket::relayed(ours, budget), arrival, net);
            }
            Some(_) => {
                self.adopt(candidate.clone());
                let theirs = BullyMessage::Election { leader: candidate };
                self.relay_except(&theirs, budget, arrival, net);
            }
        }
    }

    fn on_ping(
        &mut self,
        leader: NodeId,
        sender: NodeId,
        budget: u32,
        arrival: LinkId,
        net: &mut dyn Substrate<BullyPacket>,
    ) {
        if self.leader.as_ref() != Some(&leader) {
            debug!(node = %self.id, claimed = %leader, "ping for a leader we disagree with");
            self.restart_election(net);
            return;
        }

        if leader == self.id {
            // the pong may travel back as far as the ping still could have
            let pong = BullyMessage::Pong {
                leader: self.id.clone(),
                sender,
            };
            self.dispatch(BullyPacket::relayed(pong, budget), arrival, net);
        } else if sender != self.id {
            let ping = BullyMessage::Ping { leader, sender };
            self.relay_except(&ping, budget, arrival, net);
        }
    }

    fn on_pong(
        &mut self,
        leader: NodeId,
        sender: NodeId,
        budget: u32,
        arrival: LinkId,
        net: &mut dyn Substrate<BullyPacket>,
    ) {
        if sender == self.id {
            if self.check_timer.take().is_some() {
                debug!(node = %self.id, %leader, "leader answered");
            }
        } else {
            let pong = BullyMessage::Pong { leader, sender };
            self.relay_except(&pong, budget, arrival, net);
        }
    }

    fn adopt(&mut self, leader: NodeId) {
        if self.leader.as_ref() != Some(&leader) {
            debug!(node = %self.id, %leader, "new leader");
        }
        self.leader = Some(leader);
    }

    fn broadcast(&self, message: &BullyMessage, net: &mut dyn Substrate<BullyPacket>) {
        for link in net.connected_links() {
            self.dispatch(BullyPacket::new(message.clone()), link, net);
        }
    }

    fn relay_except(
        &self,
        message: &BullyMessage,
        budget: u32,
        arrival: LinkId,
        net: &mut dyn Substrate<BullyPacket>,
    ) {
        for link in net.connected_links() {
            if link != arrival {
                self.dispatch(BullyPacket::relayed(message.clone(), budget), link, net);
            }
        }
    }

    fn dispatch(&self, packet: BullyPacket, link: LinkId, net: &mut dyn Substrate<BullyPacket>) {
        if !self.enabled {
            trace!(node = %self.id, %packet, "disabled, suppressing send");
            return;
        }
        if packet.is_exhausted() {
            trace!(node = %self.id, %packet, %link, "hop budget exhausted");
            return;
        }
        let delay = net.entropy().delivery_delay();
        net.send(packet, link, delay);
    }
}

impl ProtocolNode for BullyNode {
    type Packet = BullyPacket;

    fn id(&self) -> &NodeId {
        &self.id
    }

    fn on_tick(&mut self, net: &mut dyn Substrate<BullyPacket>) {
        self.tick(net);
    }

    fn on_packet(
        &mut self,
        packet: BullyPacket,
        arrival: LinkId,
        net: &mut dyn Substrate<BullyPacket>,
    ) {
        self.receive(packet, arrival, net);
    }

    fn color(&self) -> NodeColor {
        self.status().color()
    }

    fn summary(&self) -> String {
        let mut out = match &self.leader {
            Some(leader) if *leader == self.id => "Bully=ME!".to_string(),
            Some(leader) => format!("Bully={leader}"),
            None => "Bully=???".to_string(),
        };
        if let Some(ticks) = self.check_timer {
            out.push_str(&format!("-CHECK={ticks}"));
        }
        if let Some(ticks) = self.restart_timer {
            out.push_str(&format!("-STARTIN={ticks}"));
        }
        if !self.enabled {
            out.push_str("-DISABLED");
        }
        out
    }
}
