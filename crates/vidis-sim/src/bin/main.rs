//! VIDIS protocol simulator CLI
//!
//! Runs one protocol over one topology, deterministically for a given seed,
//! and prints every node's final state.
//!
//! # Example
//!
//! ```bash
//! # Bully election on a ten node ring, first node starts the election
//! vidis-sim --protocol bully --shape ring -n 10 -t 500 --seed 7
//!
//! # Byzantine generals on a complete graph with two traitors
//! vidis-sim --protocol byzantine --shape complete -n 6 --bad n02 --bad n04
//!
//! # Anything more elaborate goes through a config file
//! vidis-sim --config run.json --json
//! ```

use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vidis_core::{BullyConfig, GeneralKind, NodeId};
use vidis_sim::{
    BullyCommand, ConfigError, GeneralCommand, ProtocolConfig, Scenario, Scheduled, Shape,
    SimulationConfig, Topology, TopologyConfig,
};

#[derive(Parser, Debug)]
#[command(name = "vidis-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON run description; every other option except --json is ignored when given
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "bully")]
    protocol: ProtocolArg,

    #[arg(long, value_enum, default_value = "ring")]
    shape: ShapeArg,

    /// Number of nodes
    #[arg(short = 'n', long, default_value = "5")]
    nodes: usize,

    /// Ticks to simulate
    #[arg(short = 't', long, default_value = "1000")]
    ticks: u64,

    /// Random seed for reproducible results. When omitted, a random seed is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Largest random delay added to a packet, in ticks
    #[arg(long, default_value = "1")]
    max_delay: u64,

    /// Bully: per node and tick probability of probing the leader.
    /// Ping floods grow exponentially with node degree, keep this at 0 on dense shapes.
    #[arg(long, default_value = "0")]
    check_rate: f64,

    /// Byzantine: node that relays inverted orders (repeatable)
    #[arg(long)]
    bad: Vec<String>,

    /// Byzantine: node that relays coin flips (repeatable)
    #[arg(long)]
    undecided: Vec<String>,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProtocolArg {
    Bully,
    Byzantine,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ShapeArg {
    Line,
    Ring,
    Star,
    Complete,
}

impl From<ShapeArg> for Shape {
    fn from(shape: ShapeArg) -> Self {
        match shape {
            ShapeArg::Line => Shape::Line,
            ShapeArg::Ring => Shape::Ring,
            ShapeArg::Star => Shape::Star,
            ShapeArg::Complete => Shape::Complete,
        }
    }
}

impl Args {
    fn to_config(&self) -> Result<SimulationConfig, ConfigError> {
        if let Some(path) = &self.config {
            return SimulationConfig::from_file(path);
        }

        let first = Topology::generated_ids(self.nodes)
            .into_iter()
            .next()
            .unwrap_or_else(|| NodeId::new("n00"));
        let protocol = match self.protocol {
            ProtocolArg::Bully => {
                if self.check_rate > 0.0 && matches!(self.shape, ShapeArg::Complete) {
                    warn!(
                        check_rate = self.check_rate,
                        nodes = self.nodes,
                        "leader checks on a complete graph flood exponentially"
                    );
                }
                ProtocolConfig::Bully {
                    timeouts: BullyConfig::default(),
                    auto_check_rate: self.check_rate,
                    commands: vec![Scheduled {
                        at: 0,
                        node: first,
                        command: BullyCommand::Start,
                    }],
                }
            }
            ProtocolArg::Byzantine => {
                let mut kinds = BTreeMap::new();
                for id in &self.bad {
                    kinds.insert(NodeId::new(id.as_str()), GeneralKind::Bad);
                }
                for id in &self.undecided {
                    kinds.insert(NodeId::new(id.as_str()), GeneralKind::Undecided);
                }
                ProtocolConfig::Byzantine {
                    default_kind: GeneralKind::Good,
                    kinds,
                    commands: vec![Scheduled {
                        at: 0,
                        node: first,
                        command: GeneralCommand::Attack,
                    }],
                }
            }
        };

        let config = SimulationConfig {
            seed: self.seed.unwrap_or_else(rand::random),
            ticks: self.ticks,
            max_delay: self.max_delay,
            topology: TopologyConfig::Shaped {
                shape: self.shape.into(),
                nodes: self.nodes,
            },
            protocol,
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,vidis_sim=info")),
        )
        .init();

    let args = Args::parse();

    let config = match args.to_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(seed = config.seed, ticks = config.ticks, "starting simulation");

    let mut scenario = match Scenario::from_config(&config) {
        Ok(scenario) => scenario,
        Err(e) => {
            error!(error = %e, "could not build simulation");
            return ExitCode::FAILURE;
        }
    };
    scenario.run(config.ticks);

    let report = scenario.report();
    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!(error = %e, "could not serialize report");
                return ExitCode::FAILURE;
            }
        }
    } else {
        let stats = scenario.stats();
        println!(
            "tick {}: {} packets sent, {} delivered, {} in flight",
            scenario.now(),
            stats.packets_sent,
            stats.packets_delivered,
            stats.in_flight()
        );
        for node in &report {
            println!("{:>8} {:<12} {}", node.id.as_str(), format!("{:?}", node.color), node.summary);
        }
    }

    ExitCode::SUCCESS
}
