//! # topology
//!
//! why: describe which nodes exist and which links join them
//! relations: read by runner.rs for link enumeration and routing, built by config.rs
//! what: Topology graph, Shape builders, TopologyError

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use vidis_core::{LinkId, NodeId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("node index {0} out of range")]
    IndexOutOfRange(usize),
    #[error("self loop on node {0}")]
    SelfLoop(NodeId),
    #[error("duplicate link between {0} and {1}")]
    DuplicateLink(NodeId, NodeId),
    #[error("node {found} registered where topology expects {expected}")]
    NodeMismatch { expected: NodeId, found: NodeId },
    #[error("link ids exhausted after {0} links")]
    TooManyLinks(usize),
}

/// Canned topologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Line,
    Ring,
    /// First node in the middle, every other node a spoke
    Star,
    Complete,
}

/// Undirected graph of named nodes.
///
/// Node indices follow registration order, link ids follow insertion order,
/// and `links_of` lists a node's links in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: Vec<NodeId>,
    index: HashMap<NodeId, usize>,
    links: Vec<(usize, usize)>,
    /// Endpoint pairs, smaller index first
    linked: HashSet<(usize, usize)>,
    adjacency: Vec<Vec<LinkId>>,
}

impl Topology {
    pub fn new(nodes: Vec<NodeId>) -> Result<Self, TopologyError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, id) in nodes.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(TopologyError::DuplicateNode(id.clone()));
            }
        }
        let adjacency = vec![Vec::new(); nodes.len()];
        Ok(Self {
            nodes,
            index,
            links: Vec::new(),
            linked: HashSet::new(),
            adjacency,
        })
    }

    /// `n00`, `n01`, ... zero padded so lexicographic and numeric order agree.
    pub fn generated_ids(count: usize) -> Vec<NodeId> {
        let width = count.saturating_sub(1).to_string().len().max(2);
        (0..count)
            .map(|i| NodeId::new(format!("n{i:0width$}")))
            .collect()
    }

    pub fn shaped(shape: Shape, nodes: Vec<NodeId>) -> Result<Self, TopologyError> {
        let mut topology = Self::new(nodes)?;
        let n = topology.node_count();
        match shape {
            Shape::Line => {
                for i in 1..n {
                    topology.add_link(i - 1, i)?;
                }
            }
            Shape::Ring => {
                for i in 1..n {
                    topology.add_link(i - 1, i)?;
                }
                if n > 2 {
                    topology.add_link(n - 1, 0)?;
                }
            }
            Shape::Star => {
                for i in 1..n {
                    topology.add_link(0, i)?;
                }
            }
            Shape::Complete => {
                for i in 0..n {
                    for j in i + 1..n {
                        topology.add_link(i, j)?;
                    }
                }
            }
        }
        Ok(topology)
    }

    pub fn add_link(&mut self, a: usize, b: usize) -> Result<LinkId, TopologyError> {
        let n = self.nodes.len();
        if a >= n {
            return Err(TopologyError::IndexOutOfRange(a));
        }
        if b >= n {
            return Err(TopologyError::IndexOutOfRange(b));
        }
        if a == b {
            return Err(TopologyError::SelfLoop(self.nodes[a].clone()));
        }
        if self.linked.contains(&(a.min(b), a.max(b))) {
            return Err(TopologyError::DuplicateLink(
                self.nodes[a].clone(),
                self.nodes[b].clone(),
            ));
        }

        let raw = u32::try_from(self.links.len())
            .map_err(|_| TopologyError::TooManyLinks(self.links.len()))?;
        let link = LinkId(raw);
        self.links.push((a, b));
        self.linked.insert((a.min(b), a.max(b)));
        self.adjacency[a].push(link);
        self.adjacency[b].push(link);
        Ok(link)
    }

    pub fn connect(&mut self, a: &NodeId, b: &NodeId) -> Result<LinkId, TopologyError> {
        let a = self.require(a)?;
        let b = self.require(b)?;
        self.add_link(a, b)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn require(&self, id: &NodeId) -> Result<usize, TopologyError> {
        self.index_of(id)
            .ok_or_else(|| TopologyError::UnknownNode(id.clone()))
    }

    /// Links attached to `index`; empty for an unknown index.
    pub fn links_of(&self, index: usize) -> &[LinkId] {
        match self.adjacency.get(index) {
            Some(links) => links,
            None => &[],
        }
    }

    pub fn endpoints(&self, link: LinkId) -> Option<(usize, usize)> {
        self.links.get(link.0 as usize).copied()
    }

    /// The node at the far side of `link` when seen from `from`.
    pub fn other_end(&self, link: LinkId, from: usize) -> Option<usize> {
        let (a, b) = self.endpoints(link)?;
        if a == from {
            Some(b)
        } else if b == from {
            Some(a)
        } else {
            None
        }
    }
}
