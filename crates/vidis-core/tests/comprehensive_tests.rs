//! # comprehensive protocol tests
//!
//! why: verify both protocol engines over small multi-node topologies
//! relations: tests vidis-core through its public api only
//! what: convergence, tie-break, hop budget, liveness recovery, quorum, corruption, silence

use std::collections::VecDeque;
use vidis_core::{
    BullyConfig, BullyMessage, BullyNode, BullyPacket, GeneralKind, GeneralNode, GeneralPacket,
    LinkId, OriginId, Outbox, ProtocolNode, SeededEntropy, Substrate,
};

// =============================================================================
// TEST HARNESS: zero-delay FIFO network
// =============================================================================

/// Delivers packets in send order, ignoring the requested delay.
struct Harness<N: ProtocolNode> {
    nodes: Vec<N>,
    links: Vec<(usize, usize)>,
    queue: VecDeque<(usize, LinkId, N::Packet)>,
    entropy: SeededEntropy,
    delivered: usize,
}

impl<N: ProtocolNode> Harness<N> {
    fn new(nodes: Vec<N>, links: Vec<(usize, usize)>) -> Self {
        Self {
            nodes,
            links,
            queue: VecDeque::new(),
            entropy: SeededEntropy::new(1),
            delivered: 0,
        }
    }

    fn links_of(&self, node: usize) -> Vec<LinkId> {
        self.links
            .iter()
            .enumerate()
            .filter(|(_, (a, b))| *a == node || *b == node)
            .map(|(i, _)| LinkId(i as u32))
            .collect()
    }

    fn other_end(&self, link: LinkId, from: usize) -> usize {
        let (a, b) = self.links[link.0 as usize];
        if a == from {
            b
        } else {
            a
        }
    }

    fn act(&mut self, node: usize, f: impl FnOnce(&mut N, &mut dyn Substrate<N::Packet>)) {
        let links = self.links_of(node);
        let mut outbox = Outbox::new(links, &mut self.entropy);
        f(&mut self.nodes[node], &mut outbox);
        for sent in outbox.into_sent() {
            let to = self.other_end(sent.link, node);
            self.queue.push_back((to, sent.link, sent.packet));
        }
    }

    fn inject(&mut self, to: usize, link: LinkId, packet: N::Packet) {
        self.queue.push_back((to, link, packet));
    }

    fn deliver_all(&mut self) {
        while let Some((to, link, packet)) = self.queue.pop_front() {
            self.delivered += 1;
            self.act(to, |node, net| node.on_packet(packet, link, net));
            assert!(self.delivered < 1_000_000, "flooding did not terminate");
        }
    }

    fn tick_all(&mut self) {
        for i in 0..self.nodes.len() {
            self.act(i, |node, net| node.on_tick(net));
        }
        self.deliver_all();
    }
}

fn ring(n: usize) -> Vec<(usize, usize)> {
    (0..n).map(|i| (i, (i + 1) % n)).collect()
}

fn bully_nodes(ids: &[&str]) -> Vec<BullyNode> {
    ids.iter().map(|id| BullyNode::new(*id)).collect()
}

fn leaders(harness: &Harness<BullyNode>) -> Vec<Option<String>> {
    harness
        .nodes
        .iter()
        .map(|n| n.leader.as_ref().map(|l| l.to_string()))
        .collect()
}

// =============================================================================
// SECTION 1: BULLY CONVERGENCE
// =============================================================================

mod convergence {
    use super::*;

    #[test]
    fn single_initiator_on_a_ring_elects_the_maximum() {
        let mut net = Harness::new(bully_nodes(&["b", "e", "a", "d", "c"]), ring(5));

        net.act(2, |node, net| node.start_election(net));
        net.deliver_all();

        assert!(leaders(&net).iter().all(|l| l.as_deref() == Some("e")));
        assert!(net.nodes[1].is_leader());
    }

    #[test]
    fn every_node_initiating_still_converges() {
        let ids = ["n3", "n7", "n1", "n5", "n2", "n6"];
        let mut net = Harness::new(bully_nodes(&ids), ring(6));

        for i in 0..ids.len() {
            net.act(i, |node, net| node.start_election(net));
        }
        net.deliver_all();

        assert!(leaders(&net).iter().all(|l| l.as_deref() == Some("n7")));
    }

    #[test]
    fn line_topology_converges_from_the_far_end() {
        let ids = ["a", "b", "c", "d"];
        let links = vec![(0, 1), (1, 2), (2, 3)];
        let mut net = Harness::new(bully_nodes(&ids), links);

        net.act(0, |node, net| node.start_election(net));
        net.deliver_all();

        assert!(leaders(&net).iter().all(|l| l.as_deref() == Some("d")));
    }

    #[test]
    fn lexicographic_not_numeric_order_decides() {
        let ids = ["node-10", "node-9", "node-2"];
        let mut net = Harness::new(bully_nodes(&ids), ring(3));

        net.act(0, |node, net| node.start_election(net));
        net.deliver_all();

        assert!(leaders(&net).iter().all(|l| l.as_deref() == Some("node-9")));
    }
}

// =============================================================================
// SECTION 2: TIE-BREAK
// =============================================================================

mod tie_break {
    use super::*;

    fn receive_both(own: &str, first: &str, second: &str) -> BullyNode {
        let mut entropy = SeededEntropy::new(3);
        let mut outbox = Outbox::new(vec![LinkId(0), LinkId(1)], &mut entropy);
        let mut node = BullyNode::new(own);
        node.receive(BullyPacket::election(first.into()), LinkId(0), &mut outbox);
        node.receive(BullyPacket::election(second.into()), LinkId(1), &mut outbox);
        node
    }

    #[test]
    fn larger_claim_wins_in_either_order() {
        assert_eq!(receive_both("a", "k", "x").leader, Some("x".into()));
        assert_eq!(receive_both("a", "x", "k").leader, Some("x".into()));
    }

    #[test]
    fn own_id_beats_smaller_claims() {
        assert!(receive_both("z", "k", "x").is_leader());
        assert!(receive_both("z", "x", "k").is_leader());
    }
}

// =============================================================================
// SECTION 3: HOP BUDGET
// =============================================================================

mod hop_budget {
    use super::*;

    #[test]
    fn circulating_pong_dies_after_fifteen_deliveries() {
        let ids = ["a", "b", "c", "d", "e", "f"];
        let mut net = Harness::new(bully_nodes(&ids), ring(6));
        for node in &mut net.nodes {
            node.leader = Some("f".into());
        }

        // nobody on the ring is "ghost", so the pong keeps going round
        net.inject(0, LinkId(5), BullyPacket::pong("f".into(), "ghost".into()));
        net.deliver_all();

        assert_eq!(net.delivered, 15);
    }

    #[test]
    fn restart_flood_on_a_complete_graph_terminates() {
        let ids = ["a", "b", "c", "d", "e"];
        let mut links = Vec::new();
        for i in 0..ids.len() {
            for j in i + 1..ids.len() {
                links.push((i, j));
            }
        }
        let mut net = Harness::new(bully_nodes(&ids), links);
        for node in &mut net.nodes {
            node.leader = Some("e".into());
        }

        net.act(0, |node, net| node.restart_election(net));
        net.deliver_all();

        assert!(leaders(&net).iter().all(Option::is_none));
    }

    #[test]
    fn relayed_election_carries_decremented_budget() {
        let mut entropy = SeededEntropy::new(3);
        let mut outbox = Outbox::new(vec![LinkId(0), LinkId(1)], &mut entropy);
        let mut node = BullyNode::new("a");

        node.receive(BullyPacket::election("z".into()).with_hops(9), LinkId(0), &mut outbox);

        let sent = outbox.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].packet.hops(), 8);
        assert_eq!(sent[0].packet.message, BullyMessage::Election { leader: "z".into() });
    }
}

// =============================================================================
// SECTION 4: LIVENESS CHECK
// =============================================================================

mod liveness {
    use super::*;

    #[test]
    fn answered_check_is_cancelled() {
        let mut net = Harness::new(bully_nodes(&["a", "b", "c"]), ring(3));
        net.act(0, |node, net| node.start_election(net));
        net.deliver_all();

        net.act(0, |node, net| node.check_leader(net));
        assert_eq!(net.nodes[0].check_timer, Some(100));
        net.deliver_all();

        assert_eq!(net.nodes[0].check_timer, None);
        assert_eq!(net.nodes[0].leader, Some("c".into()));
    }

    #[test]
    fn dead_leader_triggers_restart_then_new_election() {
        let mut net = Harness::new(bully_nodes(&["a", "b", "c", "d"]), ring(4));
        net.act(0, |node, net| node.start_election(net));
        net.deliver_all();
        assert!(leaders(&net).iter().all(|l| l.as_deref() == Some("d")));

        net.nodes[3].set_enabled(false);
        net.act(0, |node, net| node.check_leader(net));
        net.deliver_all();

        for _ in 0..99 {
            net.tick_all();
        }
        assert_eq!(net.nodes[0].check_timer, Some(1));
        assert_eq!(net.nodes[0].leader, Some("d".into()));

        net.tick_all();
        assert_eq!(net.nodes[0].check_timer, None);
        assert_eq!(net.nodes[0].restart_timer, Some(59));
        assert!(leaders(&net)[..3].iter().all(Option::is_none));

        for _ in 0..59 {
            net.tick_all();
        }
        assert_eq!(net.nodes[0].restart_timer, None);
        assert!(leaders(&net)[..3].iter().all(|l| l.as_deref() == Some("c")));
    }

    #[test]
    fn shorter_timeouts_are_honoured() {
        let config = BullyConfig {
            check_timeout: 5,
            restart_timeout: 2,
        };
        let nodes = vec![BullyNode::with_config("a", config), BullyNode::with_config("b", config)];
        let mut net = Harness::new(nodes, vec![(0, 1)]);
        net.act(0, |node, net| node.start_election(net));
        net.deliver_all();
        net.nodes[1].set_enabled(false);

        net.act(0, |node, net| node.check_leader(net));
        for _ in 0..6 {
            net.tick_all();
        }

        assert!(net.nodes[0].is_leader());
        assert_eq!(net.nodes[0].restart_timer, None);
    }
}

// =============================================================================
// SECTION 5: DISABLED NODES
// =============================================================================

mod disabled {
    use super::*;

    #[test]
    fn disabled_node_cuts_the_line() {
        let mut net = Harness::new(bully_nodes(&["a", "b", "c"]), vec![(0, 1), (1, 2)]);
        net.nodes[1].set_enabled(false);

        net.act(0, |node, net| node.start_election(net));
        net.deliver_all();

        assert_eq!(leaders(&net), vec![Some("a".into()), None, None]);
    }

    #[test]
    fn re_enabled_node_takes_part_again() {
        let mut net = Harness::new(bully_nodes(&["a", "b", "c"]), vec![(0, 1), (1, 2)]);
        net.nodes[1].toggle_enabled();
        net.act(0, |node, net| node.start_election(net));
        net.deliver_all();

        net.nodes[1].toggle_enabled();
        net.act(0, |node, net| node.check_leader(net));
        net.deliver_all();

        // b has no leader, so the ping makes it restart; a fresh election fixes it
        net.act(1, |node, net| node.start_election(net));
        net.deliver_all();
        assert!(leaders(&net).iter().all(|l| l.as_deref() == Some("c")));
    }

    #[test]
    fn disabled_node_timers_are_frozen() {
        let mut node = BullyNode::new("a");
        node.leader = Some("b".into());
        node.check_timer = Some(3);
        node.set_enabled(false);

        let mut entropy = SeededEntropy::new(3);
        let mut outbox = Outbox::new(vec![LinkId(0)], &mut entropy);
        for _ in 0..10 {
            node.tick(&mut outbox);
        }

        assert_eq!(node.check_timer, Some(3));
        assert!(outbox.sent().is_empty());
    }
}

// =============================================================================
// SECTION 6: BYZANTINE QUORUM
// =============================================================================

mod byzantine {
    use super::*;

    fn star(kinds: &[GeneralKind]) -> Harness<GeneralNode> {
        let mut nodes = vec![GeneralNode::new("general", GeneralKind::Good)];
        nodes.extend(
            kinds
                .iter()
                .enumerate()
                .map(|(i, kind)| GeneralNode::new(format!("lieutenant-{i}"), *kind)),
        );
        let links = (1..nodes.len()).map(|i| (0, i)).collect();
        Harness::new(nodes, links)
    }

    fn issue(net: &mut Harness<GeneralNode>, node: usize, attack: bool) -> OriginId {
        let mut origin = OriginId(0);
        net.act(node, |general, net| {
            origin = if attack {
                general.issue_attack(net)
            } else {
                general.issue_retreat(net)
            };
        });
        net.deliver_all();
        origin
    }

    #[test]
    fn loyal_star_attacks_together() {
        let mut net = star(&[GeneralKind::Good; 4]);

        let origin = issue(&mut net, 0, true);

        for lieutenant in &net.nodes[1..] {
            assert_eq!(lieutenant.attacked_origins(1), vec![origin]);
            assert!(lieutenant.retreated_origins(1).is_empty());
            assert!(lieutenant.clashing_origins(1).is_empty());
            assert!(lieutenant.pending_origins(1).is_empty());
        }
        assert_eq!(net.nodes[0].attacked_origins(4), vec![origin]);
    }

    #[test]
    fn loyal_star_retreats_together() {
        let mut net = star(&[GeneralKind::Good; 3]);

        let origin = issue(&mut net, 0, false);

        for lieutenant in &net.nodes[1..] {
            assert_eq!(lieutenant.retreated_origins(1), vec![origin]);
        }
    }

    #[test]
    fn bad_relay_splits_a_lieutenant() {
        // general(0) -- lieutenant(1), general(0) -- traitor(2), traitor(2) -- lieutenant(1)
        let nodes = vec![
            GeneralNode::new("general", GeneralKind::Bad),
            GeneralNode::new("lieutenant", GeneralKind::Good),
            GeneralNode::new("traitor", GeneralKind::Bad),
        ];
        let mut net = Harness::new(nodes, vec![(0, 1), (0, 2), (2, 1)]);

        let origin = issue(&mut net, 0, true);

        let lieutenant = &net.nodes[1];
        assert_eq!(lieutenant.clashing_origins(2), vec![origin]);
        assert!(lieutenant.attacked_origins(2).is_empty());
        assert!(lieutenant.retreated_origins(2).is_empty());
        let ballot = lieutenant.ballot(origin).map(|b| b.tally());
        assert_eq!(ballot, Some((1, 1)));
    }

    #[test]
    fn duplicate_delivery_is_idempotent() {
        let mut net = star(&[GeneralKind::Good]);
        let origin = issue(&mut net, 0, true);
        let before = net.delivered;

        net.inject(1, LinkId(0), GeneralPacket::Attack(origin));
        net.deliver_all();

        // only the injected packet itself was delivered, nothing was relayed
        assert_eq!(net.delivered, before + 1);
        assert_eq!(net.nodes[1].ballot(origin).map(|b| b.len()), Some(1));
    }

    #[test]
    fn every_order_keeps_its_own_ballot() {
        let mut net = star(&[GeneralKind::Good; 2]);

        let attack = issue(&mut net, 0, true);
        let retreat = issue(&mut net, 0, false);
        assert_ne!(attack, retreat);

        let decisions = net.nodes[1].decisions(1);
        assert_eq!(decisions.attacked, vec![attack]);
        assert_eq!(decisions.retreated, vec![retreat]);
    }

    #[test]
    fn undecided_lieutenants_still_reach_quorum() {
        let mut net = star(&[GeneralKind::Undecided; 5]);

        let origin = issue(&mut net, 0, true);

        // lieutenants only hear from the general, whose order is honest
        for lieutenant in &net.nodes[1..] {
            assert_eq!(lieutenant.attacked_origins(1), vec![origin]);
        }
        assert!(net.nodes[0].pending_origins(5).is_empty());
    }
}
