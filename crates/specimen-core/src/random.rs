//! Seeded random stream used by one build.
//!
//! Every build owns its own [`RandomSource`]; nothing random is shared
//! between concurrent builds. For a fixed seed the stream, and therefore the
//! populated output, is fully reproducible.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

pub struct RandomSource {
    rng: StdRng,
    seed: u64,
}

impl RandomSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed the stream was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Integer in `[min, max]`. Bounds are swapped if given in reverse.
    pub fn int_range(&mut self, min: i64, max: i64) -> i64 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.rng.gen_range(lo..=hi)
    }

    pub fn uint_range(&mut self, min: u64, max: u64) -> u64 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.rng.gen_range(lo..=hi)
    }

    pub fn usize_range(&mut self, min: usize, max: usize) -> usize {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.rng.gen_range(lo..=hi)
    }

    /// Float in `[min, max)`, or `min` when the range is empty.
    pub fn float_range(&mut self, min: f64, max: f64) -> f64 {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return min;
        }
        self.rng.gen_range(min..max)
    }

    pub fn coin(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    /// True with probability `p`, clamped to `[0, 1]`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    /// One-in-six roll, only when `allowed`. Used for every nullability decision.
    pub fn null_roll(&mut self, allowed: bool) -> bool {
        allowed && self.rng.gen_range(0..6) == 1
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..items.len());
        items.get(idx)
    }

    pub fn alphabetic(&mut self) -> char {
        let c = self.rng.gen_range(b'a'..=b'z') as char;
        if self.coin() {
            c.to_ascii_uppercase()
        } else {
            c
        }
    }

    pub fn bytes<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        self.rng.fill_bytes(&mut out);
        out
    }

    /// A fresh seed drawn from this stream, for derived sources.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.next_u64()
    }
}

/// Seed from the thread-local generator, for builds that specify none.
pub fn random_seed() -> u64 {
    rand::thread_rng().gen()
}
