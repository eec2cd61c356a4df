//! # packet
//!
//! why: define what bully nodes say to each other and how far it may travel
//! relations: produced and consumed by bully/node.rs
//! what: BullyMessage variants, BullyPacket with its hop budget

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every bully packet starts its life with this many hops.
pub const MAX_HOPS: u32 = 15;

/// Payload of a bully packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BullyMessage {
    /// Announce `leader` as the winner known to the sender
    Election { leader: NodeId },
    /// Tell everyone to forget their leader
    ElectionRestart,
    /// Liveness probe from `sender` towards `leader`
    Ping { leader: NodeId, sender: NodeId },
    /// `leader`'s answer to the probe issued by `sender`
    Pong { leader: NodeId, sender: NodeId },
}

/// A message together with its remaining hop budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BullyPacket {
    pub message: BullyMessage,
    hops: u32,
}

impl BullyPacket {
    /// Fresh packet with the full hop budget.
    pub fn new(message: BullyMessage) -> Self {
        Self {
            message,
            hops: MAX_HOPS,
        }
    }

    pub fn election(leader: NodeId) -> Self {
        Self::new(BullyMessage::Election { leader })
    }

    pub fn restart() -> Self {
        Self::new(BullyMessage::ElectionRestart)
    }

    pub fn ping(leader: NodeId, sender: NodeId) -> Self {
        Self::new(BullyMessage::Ping { leader, sender })
    }

    pub fn pong(leader: NodeId, sender: NodeId) -> Self {
        Self::new(BullyMessage::Pong { leader, sender })
    }

    /// Packet carrying `message` one hop further than a packet that still had
    /// `budget` hops left. A result of zero hops is never put on a link.
    pub fn relayed(message: BullyMessage, budget: u32) -> Self {
        Self {
            message,
            hops: budget.saturating_sub(1),
        }
    }

    pub fn with_hops(mut self, hops: u32) -> Self {
        self.hops = hops;
        self
    }

    /// Remaining hops.
    pub fn hops(&self) -> u32 {
        self.hops
    }

    pub fn max_hops(&self) -> u32 {
        MAX_HOPS
    }

    pub fn is_exhausted(&self) -> bool {
        self.hops == 0
    }
}

impl fmt::Display for BullyPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            BullyMessage::Election { leader } => {
                write!(f, "Elect{{{},{}/{}}}", leader, self.hops, MAX_HOPS)
            }
            BullyMessage::ElectionRestart => write!(f, "Restart{{{}/{}}}", self.hops, MAX_HOPS),
            BullyMessage::Ping { leader, sender } => {
                write!(f, "Ping{{{},{},{}/{}}}", leader, sender, self.hops, MAX_HOPS)
            }
            BullyMessage::Pong { leader, sender } => {
                write!(f, "Pong{{{},{},{}/{}}}", leader, sender, self.hops, MAX_HOPS)
            }
        }
    }
}
