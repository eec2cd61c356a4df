//! # entropy
//!
//! why: keep every random draw of the protocols behind one injectable source
//! relations: reached through Substrate::entropy by bully.rs and byzantine.rs
//! what: Entropy trait, SeededEntropy over a ChaCha8 rng

use crate::byzantine::OriginId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of the random inputs the protocols consume.
pub trait Entropy {
    /// Extra ticks a packet spends on its link before delivery.
    fn delivery_delay(&mut self) -> u64;

    /// Fair coin, used by undecided generals.
    fn coin_flip(&mut self) -> bool;

    /// Fresh ballot key for a general's command.
    fn origin_id(&mut self) -> OriginId;
}

/// Deterministic entropy: the same seed replays the same run.
#[derive(Debug, Clone)]
pub struct SeededEntropy {
    rng: ChaCha8Rng,
    max_delay: u64,
}

impl SeededEntropy {
    /// Delays are drawn uniformly from `0..=1` unless configured otherwise.
    pub const DEFAULT_MAX_DELAY: u64 = 1;

    pub fn new(seed: u64) -> Self {
        Self::with_max_delay(seed, Self::DEFAULT_MAX_DELAY)
    }

    pub fn with_max_delay(seed: u64, max_delay: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            max_delay,
        }
    }

    /// Raw access for harness-level draws (e.g. periodic checks).
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

impl Entropy for SeededEntropy {
    fn delivery_delay(&mut self) -> u64 {
        self.rng.gen_range(0..=self.max_delay)
    }

    fn coin_flip(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    fn origin_id(&mut self) -> OriginId {
        OriginId(self.rng.gen_range(0..i32::MAX as u32))
    }
}
