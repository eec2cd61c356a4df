//! # config
//!
//! why: describe a whole simulation run in one json file
//! relations: consumed by scenario.rs to build a simulation, loaded by the vidis-sim binary
//! what: SimulationConfig, TopologyConfig, ProtocolConfig, ConfigError

use crate::scenario::{BullyCommand, GeneralCommand, Scheduled};
use crate::topology::{Shape, Topology, TopologyError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vidis_core::{BullyConfig, GeneralKind, NodeId, SeededEntropy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error("auto_check_rate must be within 0..=1, got {0}")]
    InvalidRate(f64),
}

/// A complete simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    /// Upper bound of the random per-packet delay, in ticks
    #[serde(default = "default_max_delay")]
    pub max_delay: u64,
    pub topology: TopologyConfig,
    pub protocol: ProtocolConfig,
}

fn default_ticks() -> u64 {
    2000
}

fn default_max_delay() -> u64 {
    SeededEntropy::DEFAULT_MAX_DELAY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopologyConfig {
    /// Generated ids (`n00`, `n01`, ...) wired up as `shape`
    Shaped { shape: Shape, nodes: usize },
    Explicit {
        nodes: Vec<NodeId>,
        #[serde(default)]
        links: Vec<(NodeId, NodeId)>,
    },
}

impl TopologyConfig {
    pub fn build(&self) -> Result<Topology, TopologyError> {
        match self {
            Self::Shaped { shape, nodes } => {
                Topology::shaped(*shape, Topology::generated_ids(*nodes))
            }
            Self::Explicit { nodes, links } => {
                let mut topology = Topology::new(nodes.clone())?;
                for (a, b) in links {
                    topology.connect(a, b)?;
                }
                Ok(topology)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProtocolConfig {
    Bully {
        #[serde(default)]
        timeouts: BullyConfig,
        /// Per node and tick probability of probing the leader
        #[serde(default)]
        auto_check_rate: f64,
        #[serde(default)]
        commands: Vec<Scheduled<BullyCommand>>,
    },
    Byzantine {
        #[serde(default)]
        default_kind: GeneralKind,
        /// Overrides of `default_kind` per node
        #[serde(default)]
        kinds: BTreeMap<NodeId, GeneralKind>,
        #[serde(default)]
        commands: Vec<Scheduled<GeneralCommand>>,
    },
}

impl SimulationConfig {
    /// Load and validate a config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check everything that can be checked without running.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let topology = self.topology.build()?;
        match &self.protocol {
            ProtocolConfig::Bully {
                auto_check_rate,
                commands,
                ..
            } => {
                if !(0.0..=1.0).contains(auto_check_rate) {
                    return Err(ConfigError::InvalidRate(*auto_check_rate));
                }
                for scheduled in commands {
                    topology.require(&scheduled.node)?;
                }
            }
            ProtocolConfig::Byzantine {
                kinds, commands, ..
            } => {
                for id in kinds.keys() {
                    topology.require(id)?;
                }
                for scheduled in commands {
                    topology.require(&scheduled.node)?;
                }
            }
        }
        Ok(())
    }

    pub fn entropy(&self) -> SeededEntropy {
        SeededEntropy::with_max_delay(self.seed, self.max_delay)
    }
}
