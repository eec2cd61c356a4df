//! # vidis-sim
//!
//! why: run the vidis-core protocol engines over a simulated network
//! relations: depends on vidis-core for nodes and packets, used by the vidis-sim binary
//! what: topology builders, a deterministic tick-driven runner, json configs, scenarios
//!
//! A run is fully determined by its [`SimulationConfig`]: the same topology,
//! commands and seed always produce the same trace.

pub mod config;
pub mod event_queue;
pub mod runner;
pub mod scenario;
pub mod topology;

pub use config::{ConfigError, ProtocolConfig, SimulationConfig, TopologyConfig};
pub use runner::{Simulation, SimulationStats};
pub use scenario::{
    BullyCommand, BullyScenario, ByzantineScenario, GeneralCommand, IssuedOrder, NodeReport,
    Scenario, Scheduled,
};
pub use topology::{Shape, Topology, TopologyError};
