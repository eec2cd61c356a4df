//! # bully
//!
//! why: leader election over an arbitrary graph where the largest id wins
//! relations: uses substrate.rs for links and delivery, entropy.rs for delays
//! what: BullyNode state machine, BullyPacket wire type, timeouts config

mod node;
mod packet;

pub use node::{BullyConfig, BullyNode, BullyStatus};
pub use packet::{BullyMessage, BullyPacket, MAX_HOPS};
