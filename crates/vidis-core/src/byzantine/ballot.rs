//! # ballot
//!
//! why: tally the votes a general has seen for one order
//! relations: owned per origin by byzantine/node.rs
//! what: BallotBox (one vote per arrival link), Verdict, Decisions

use super::packet::{OriginId, Vote};
use crate::node::LinkId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Votes received for a single origin, at most one per link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BallotBox {
    votes: BTreeMap<LinkId, Vote>,
}

/// Outcome of a ballot relative to the current number of links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Attack,
    Retreat,
    /// Full quorum but an even split
    Clash,
    /// Quorum not reached yet
    Pending,
}

impl BallotBox {
    /// Record `vote` as arrived over `link`.
    ///
    /// Returns `false` (and keeps the first vote) when the link already voted.
    pub fn record(&mut self, link: LinkId, vote: Vote) -> bool {
        if self.votes.contains_key(&link) {
            return false;
        }
        self.votes.insert(link, vote);
        true
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn vote_on(&self, link: LinkId) -> Option<Vote> {
        self.votes.get(&link).copied()
    }

    /// `(attacks, retreats)`
    pub fn tally(&self) -> (usize, usize) {
        let attacks = self.votes.values().filter(|v| **v == Vote::Attack).count();
        (attacks, self.votes.len() - attacks)
    }

    /// Quorum means one vote from each of the node's current links.
    pub fn verdict(&self, link_count: usize) -> Verdict {
        if self.votes.len() != link_count {
            return Verdict::Pending;
        }
        let (attacks, retreats) = self.tally();
        match attacks.cmp(&retreats) {
            std::cmp::Ordering::Greater => Verdict::Attack,
            std::cmp::Ordering::Less => Verdict::Retreat,
            std::cmp::Ordering::Equal => Verdict::Clash,
        }
    }
}

/// All origins a general knows about, grouped by verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decisions {
    pub attacked: Vec<OriginId>,
    pub retreated: Vec<OriginId>,
    pub clashing: Vec<OriginId>,
    pub pending: Vec<OriginId>,
}

impl Decisions {
    pub fn push(&mut self, origin: OriginId, verdict: Verdict) {
        match verdict {
            Verdict::Attack => self.attacked.push(origin),
            Verdict::Retreat => self.retreated.push(origin),
            Verdict::Clash => self.clashing.push(origin),
            Verdict::Pending => self.pending.push(origin),
        }
    }
}
