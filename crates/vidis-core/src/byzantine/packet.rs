//! # packet
//!
//! why: define the orders generals flood through the graph
//! relations: produced and consumed by byzantine/node.rs, tallied by ballot.rs
//! what: Vote, OriginId ballot key, GeneralPacket

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ballot key chosen by the issuing general, kept unchanged by every relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginId(pub u32);

impl fmt::Display for OriginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Attack,
    Retreat,
}

impl Vote {
    pub fn opposite(self) -> Self {
        match self {
            Self::Attack => Self::Retreat,
            Self::Retreat => Self::Attack,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneralPacket {
    Attack(OriginId),
    Retreat(OriginId),
}

impl GeneralPacket {
    pub fn new(vote: Vote, origin: OriginId) -> Self {
        match vote {
            Vote::Attack => Self::Attack(origin),
            Vote::Retreat => Self::Retreat(origin),
        }
    }

    pub fn origin(self) -> OriginId {
        match self {
            Self::Attack(origin) | Self::Retreat(origin) => origin,
        }
    }

    pub fn vote(self) -> Vote {
        match self {
            Self::Attack(_) => Vote::Attack,
            Self::Retreat(_) => Vote::Retreat,
        }
    }
}

impl fmt::Display for GeneralPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attack(origin) => write!(f, "Attack{{{origin}}}"),
            Self::Retreat(origin) => write!(f, "Retreat{{{origin}}}"),
        }
    }
}
