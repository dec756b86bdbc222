//! Deterministic random number generation.
//!
//! RULE: Nothing in the crate may call a platform RNG.
//! Every random draw (today: the explainer's background sample) flows
//! through a SampleRng seeded from configuration, so two runs over the
//! same dataset with the same seed see the same rows.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct SampleRng {
    inner: Pcg64Mcg,
}

impl SampleRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Draw `k` distinct indices from `0..population` without replacement,
    /// returned in ascending order. `k` is clamped to the population size.
    pub fn sample_indices(&mut self, population: usize, k: usize) -> Vec<usize> {
        let k = k.min(population);
        let mut pool: Vec<usize> = (0..population).collect();
        // Partial Fisher–Yates: the first k slots end up as the sample.
        for i in 0..k {
            let remaining = (population - i) as u64;
            let j = i + self.next_u64_below(remaining) as usize;
            pool.swap(i, j);
        }
        let mut picked = pool[..k].to_vec();
        picked.sort_unstable();
        picked
    }
}
