//! # substrate
//!
//! why: define the narrow contract between protocol nodes and whatever delivers packets
//! relations: consumed by bully.rs and byzantine.rs, filled in by vidis-sim's runner
//! what: Substrate trait, Outbox recorder, Sent records

use crate::entropy::Entropy;
use crate::node::LinkId;

/// Everything a node may ask of the network it lives in.
pub trait Substrate<P> {
    /// Links currently attached to the node, in a stable order.
    fn connected_links(&self) -> Vec<LinkId>;

    /// Enqueue `packet` for delivery over `link` after `delay` extra ticks.
    fn send(&mut self, packet: P, link: LinkId, delay: u64);

    /// Randomness source for delays, coin flips and ballot keys.
    fn entropy(&mut self) -> &mut dyn Entropy;
}

/// One packet handed to the substrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent<P> {
    pub packet: P,
    pub link: LinkId,
    pub delay: u64,
}

/// Substrate that records sends for a single node invocation.
///
/// The simulator builds one per call into a node and schedules whatever was
/// recorded afterwards. Tests use it directly to inspect outbound traffic.
pub struct Outbox<'a, P> {
    links: Vec<LinkId>,
    sent: Vec<Sent<P>>,
    entropy: &'a mut dyn Entropy,
}

impl<'a, P> Outbox<'a, P> {
    pub fn new(links: Vec<LinkId>, entropy: &'a mut dyn Entropy) -> Self {
        Self {
            links,
            sent: Vec::new(),
            entropy,
        }
    }

    pub fn sent(&self) -> &[Sent<P>] {
        &self.sent
    }

    /// Drain what has been recorded so far, keeping the outbox usable.
    pub fn take_sent(&mut self) -> Vec<Sent<P>> {
        std::mem::take(&mut self.sent)
    }

    pub fn into_sent(self) -> Vec<Sent<P>> {
        self.sent
    }
}

impl<P> Substrate<P> for Outbox<'_, P> {
    fn connected_links(&self) -> Vec<LinkId> {
        self.links.clone()
    }

    fn send(&mut self, packet: P, link: LinkId, delay: u64) {
        self.sent.push(Sent {
            packet,
            link,
            delay,
        });
    }

    fn entropy(&mut self) -> &mut dyn Entropy {
        &mut *self.entropy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::SeededEntropy;

    #[test]
    fn outbox_records_sends_in_order() {
        let mut entropy = SeededEntropy::new(1);
        let mut outbox: Outbox<'_, &str> = Outbox::new(vec![LinkId(0), LinkId(1)], &mut entropy);

        outbox.send("first", LinkId(1), 0);
        outbox.send("second", LinkId(0), 1);

        let sent = outbox.into_sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].packet, "first");
        assert_eq!(sent[0].link, LinkId(1));
        assert_eq!(sent[1].delay, 1);
    }

    #[test]
    fn take_sent_drains_but_keeps_links() {
        let mut entropy = SeededEntropy::new(1);
        let mut outbox: Outbox<'_, u8> = Outbox::new(vec![LinkId(4)], &mut entropy);

        outbox.send(1, LinkId(4), 0);
        assert_eq!(outbox.take_sent().len(), 1);
        assert!(outbox.sent().is_empty());
        assert_eq!(outbox.connected_links(), vec![LinkId(4)]);
    }
}
