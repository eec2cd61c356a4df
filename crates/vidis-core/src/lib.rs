//! # vidis-core
//!
//! why: implement the distributed-algorithm node logic in pure, portable rust
//! relations: driven by vidis-sim, which provides links, delivery and ticks
//! what: substrate contract, randomness source, bully election, byzantine generals

pub mod bully;
pub mod byzantine;
pub mod entropy;
pub mod node;
pub mod substrate;

pub use bully::{BullyConfig, BullyMessage, BullyNode, BullyPacket, BullyStatus, MAX_HOPS};
pub use byzantine::{BallotBox, Decisions, GeneralKind, GeneralNode, GeneralPacket, OriginId, Verdict, Vote};
pub use entropy::{Entropy, SeededEntropy};
pub use node::{LinkId, NodeColor, NodeId, ProtocolNode};
pub use substrate::{Outbox, Sent, Substrate};
