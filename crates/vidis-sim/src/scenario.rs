//! # scenario
//!
//! why: turn a SimulationConfig into a running simulation of either protocol
//! relations: built from config.rs, drives runner.rs, reported by the vidis-sim binary
//! what: scheduled commands, BullyScenario, ByzantineScenario, Scenario, NodeReport

use crate::config::{ConfigError, ProtocolConfig, SimulationConfig};
use crate::runner::{Simulation, SimulationStats};
use crate::topology::Topology;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vidis_core::{
    BullyConfig, BullyNode, BullyPacket, GeneralNode, NodeColor, NodeId, OriginId, ProtocolNode,
    SeededEntropy, Substrate, Vote,
};

/// A command handed to one node at the start of tick `at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheduled<C> {
    #[serde(default)]
    pub at: u64,
    pub node: NodeId,
    pub command: C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BullyCommand {
    Start,
    Restart,
    Check,
    Enable,
    Disable,
    Toggle,
}

impl BullyCommand {
    pub fn apply(self, node: &mut BullyNode, net: &mut dyn Substrate<BullyPacket>) {
        match self {
            Self::Start => node.start_election(net),
            Self::Restart => node.restart_election(net),
            Self::Check => node.check_leader(net),
            Self::Enable => node.set_enabled(true),
            Self::Disable => node.set_enabled(false),
            Self::Toggle => node.toggle_enabled(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneralCommand {
    Attack,
    Retreat,
}

impl GeneralCommand {
    pub fn vote(self) -> Vote {
        match self {
            Self::Attack => Vote::Attack,
            Self::Retreat => Vote::Retreat,
        }
    }
}

/// Final per-node view of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeReport {
    pub id: NodeId,
    pub color: NodeColor,
    pub summary: String,
}

pub struct BullyScenario {
    pub sim: Simulation<BullyNode>,
    auto_check_rate: f64,
    commands: Vec<Scheduled<BullyCommand>>,
}

impl BullyScenario {
    pub fn new(
        sim: Simulation<BullyNode>,
        auto_check_rate: f64,
        commands: Vec<Scheduled<BullyCommand>>,
    ) -> Self {
        Self {
            sim,
            auto_check_rate,
            commands,
        }
    }

    /// Run due commands, draw automatic leader checks, then step once.
    pub fn step(&mut self) {
        let now = self.sim.now();
        for scheduled in self.commands.iter().filter(|c| c.at == now) {
            debug!(tick = now, node = %scheduled.node, command = ?scheduled.command, "bully command");
            let command = scheduled.command;
            self.sim
                .with_node(&scheduled.node, |node, net| command.apply(node, net));
        }

        if self.auto_check_rate > 0.0 {
            for index in 0..self.sim.nodes().len() {
                if self.sim.entropy_mut().rng().gen_bool(self.auto_check_rate) {
                    self.sim
                        .with_node_at(index, |node, net| node.check_leader(net));
                }
            }
        }

        self.sim.step();
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Leader every enabled node believes in, `None` if they disagree or any is unsure.
    pub fn agreed_leader(&self) -> Option<NodeId> {
        let mut beliefs = self
            .sim
            .nodes()
            .iter()
            .filter(|n| n.enabled)
            .map(|n| n.leader.clone());
        let first = beliefs.next()??;
        beliefs
            .all(|l| l.as_ref() == Some(&first))
            .then_some(first)
    }

    pub fn report(&self) -> Vec<NodeReport> {
        self.sim
            .nodes()
            .iter()
            .map(|n| NodeReport {
                id: n.id.clone(),
                color: n.color(),
                summary: n.summary(),
            })
            .collect()
    }
}

/// An order issued during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedOrder {
    pub tick: u64,
    pub issuer: NodeId,
    pub vote: Vote,
    pub origin: OriginId,
}

pub struct ByzantineScenario {
    pub sim: Simulation<GeneralNode>,
    commands: Vec<Scheduled<GeneralCommand>>,
    issued: Vec<IssuedOrder>,
}

impl ByzantineScenario {
    pub fn new(sim: Simulation<GeneralNode>, commands: Vec<Scheduled<GeneralCommand>>) -> Self {
        Self {
            sim,
            commands,
            issued: Vec::new(),
        }
    }

    pub fn step(&mut self) {
        let now = self.sim.now();
        for scheduled in self.commands.iter().filter(|c| c.at == now) {
            let vote = scheduled.command.vote();
            let origin = self
                .sim
                .with_node(&scheduled.node, |node, net| node.issue(vote, net));
            if let Some(origin) = origin {
                debug!(tick = now, node = %scheduled.node, ?vote, %origin, "order issued");
                self.issued.push(IssuedOrder {
                    tick: now,
                    issuer: scheduled.node.clone(),
                    vote,
                    origin,
                });
            }
        }
        self.sim.step();
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    pub fn issued(&self) -> &[IssuedOrder] {
        &self.issued
    }

    pub fn report(&self) -> Vec<NodeReport> {
        self.sim
            .nodes()
            .iter()
            .map(|n| {
                let decisions = n.decisions(self.sim.link_count(&n.id));
                NodeReport {
                    id: n.id.clone(),
                    color: n.color(),
                    summary: format!(
                        "{:?}: attack={} retreat={} clash={} pending={}",
                        n.kind,
                        list(&decisions.attacked),
                        list(&decisions.retreated),
                        list(&decisions.clashing),
                        list(&decisions.pending),
                    ),
                }
            })
            .collect()
    }
}

fn list(origins: &[OriginId]) -> String {
    let items: Vec<String> = origins.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(","))
}

pub enum Scenario {
    Bully(BullyScenario),
    Byzantine(ByzantineScenario),
}

impl Scenario {
    pub fn from_config(config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let topology = config.topology.build()?;
        let entropy = config.entropy();
        info!(
            nodes = topology.node_count(),
            links = topology.link_count(),
            seed = config.seed,
            "building scenario"
        );

        let scenario = match &config.protocol {
            ProtocolConfig::Bully {
                timeouts,
                auto_check_rate,
                commands,
            } => Self::Bully(BullyScenario::new(
                bully_simulation(topology, entropy, *timeouts),
                *auto_check_rate,
                commands.clone(),
            )),
            ProtocolConfig::Byzantine {
                default_kind,
                kinds,
                commands,
            } => {
                let sim = Simulation::from_topology(topology, entropy, |id| {
                    let kind = kinds.get(id).copied().unwrap_or(*default_kind);
                    GeneralNode::new(id.clone(), kind)
                });
                Self::Byzantine(ByzantineScenario::new(sim, commands.clone()))
            }
        };
        Ok(scenario)
    }

    pub fn run(&mut self, ticks: u64) {
        match self {
            Self::Bully(s) => s.run(ticks),
            Self::Byzantine(s) => s.run(ticks),
        }
        info!(tick = self.now(), stats = ?self.stats(), "run finished");
    }

    pub fn now(&self) -> u64 {
        match self {
            Self::Bully(s) => s.sim.now(),
            Self::Byzantine(s) => s.sim.now(),
        }
    }

    pub fn stats(&self) -> &SimulationStats {
        match self {
            Self::Bully(s) => s.sim.stats(),
            Self::Byzantine(s) => s.sim.stats(),
        }
    }

    pub fn report(&self) -> Vec<NodeReport> {
        match self {
            Self::Bully(s) => s.report(),
            Self::Byzantine(s) => s.report(),
        }
    }
}

fn bully_simulation(
    topology: Topology,
    entropy: SeededEntropy,
    timeouts: BullyConfig,
) -> Simulation<BullyNode> {
    Simulation::from_topology(topology, entropy, |id| {
        BullyNode::with_config(id.clone(), timeouts)
    })
}
