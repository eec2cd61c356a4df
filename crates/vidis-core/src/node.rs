//! # node
//!
//! why: give both protocol engines one shape the simulator can drive
//! relations: implemented by bully.rs and byzantine.rs, driven through substrate.rs
//! what: NodeId, LinkId, NodeColor, ProtocolNode trait

use crate::substrate::Substrate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique, immutable node identifier.
///
/// Ordering is lexicographic on the underlying string and is used as the
/// tie-break key everywhere: the larger id wins.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Opaque handle of a bidirectional link, assigned by the substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkId(pub u32);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Status color a renderer may paint a node with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeColor {
    Red,
    LightOrange,
    Orange,
    Green,
    Grey,
}

/// A protocol participant the simulator can tick and deliver packets to.
///
/// Implementations are synchronous and perform no I/O: every outbound packet
/// goes through the [`Substrate`] handed in with the call.
pub trait ProtocolNode {
    /// Packet type exchanged between nodes of this protocol
    type Packet: Clone + fmt::Debug;

    fn id(&self) -> &NodeId;

    /// Called exactly once per simulation step.
    fn on_tick(&mut self, net: &mut dyn Substrate<Self::Packet>);

    /// Called once per delivered packet, with the link it arrived on.
    fn on_packet(
        &mut self,
        packet: Self::Packet,
        arrival: LinkId,
        net: &mut dyn Substrate<Self::Packet>,
    );

    fn color(&self) -> NodeColor;

    /// Short human-readable status line.
    fn summary(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_order_lexicographically() {
        assert!(NodeId::from("b") > NodeId::from("a"));
        assert!(NodeId::from("node-9") > NodeId::from("node-10"));
        assert!(NodeId::from("ab") > NodeId::from("a"));
    }

    #[test]
    fn node_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&NodeId::from("alpha")).unwrap();
        assert_eq!(json, "\"alpha\"");
    }
}
