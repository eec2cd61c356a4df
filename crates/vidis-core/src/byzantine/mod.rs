//! # byzantine
//!
//! why: flooding consensus on attack/retreat orders under corrupting relays
//! relations: uses substrate.rs for links and delivery, entropy.rs for ids and coin flips
//! what: GeneralNode with per-origin ballot boxes, GeneralPacket, relay policies

mod ballot;
mod node;
mod packet;

pub use ballot::{BallotBox, Decisions, Verdict};
pub use node::{GeneralKind, GeneralNode};
pub use packet::{GeneralPacket, OriginId, Vote};
