//! Deterministic randomness.
//!
//! All sampling the engine does goes through [`PseudoRandom`], a dyn-safe trait with the
//! handful of primitives the mutators need. Production code uses [`SeededRandom`]; tests
//! drive mutators through scripted implementations to pin down exact decisions.

use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::engine_bug;

/// Deterministic random source. Every method is a pure function of the internal state and its
/// arguments; a fresh instance with the same seed produces the same sequence.
pub trait PseudoRandom {
    /// Uniform value in the closed interval `[lo, hi]`. Handles ranges spanning the full
    /// signed 64-bit domain.
    fn closed_range(&mut self, lo: i64, hi: i64) -> i64;

    /// Uniform index in `[0, n)`. `n == 0` is an engine bug.
    fn index_in(&mut self, n: usize) -> usize;

    /// Uniform boolean.
    fn choice(&mut self) -> bool;

    /// True with probability `1/n`. `n == 0` is an engine bug.
    fn true_in_one_out_of(&mut self, n: usize) -> bool;

    /// Fills `dest` with uniform bytes.
    fn fill_bytes(&mut self, dest: &mut [u8]);
}

/// Generic sampling helpers available on every [`PseudoRandom`].
pub trait PickOne: PseudoRandom {
    /// Picks one uniform element of a non-empty slice.
    fn pick_in<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.index_in(items.len())]
    }

    /// Picks one element with probability proportional to its weight. Zero total weight is an
    /// engine bug.
    fn pick_weighted<'a, T>(&mut self, items: &'a [(u32, T)]) -> &'a T {
        let total: u64 = items.iter().map(|(weight, _)| *weight as u64).sum();
        if total == 0 {
            engine_bug!("pick_weighted over zero total weight");
        }
        let mut ticket = self.index_in(total as usize) as u64;
        for (weight, item) in items {
            if ticket < *weight as u64 {
                return item;
            }
            ticket -= *weight as u64;
        }
        unreachable!()
    }
}

impl<R: PseudoRandom + ?Sized> PickOne for R {}

/// The production source: a [`SmallRng`] seeded by the driver so that runs replay exactly.
pub struct SeededRandom {
    inner: SmallRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self { inner: SmallRng::seed_from_u64(seed) }
    }
}

impl PseudoRandom for SeededRandom {
    fn closed_range(&mut self, lo: i64, hi: i64) -> i64 {
        if lo > hi {
            engine_bug!("closed_range over empty interval [{lo}, {hi}]");
        }
        let span = hi.wrapping_sub(lo) as u64;
        if span == u64::MAX {
            return self.inner.random::<i64>();
        }
        lo.wrapping_add(self.inner.random_range(0..=span) as i64)
    }

    fn index_in(&mut self, n: usize) -> usize {
        if n == 0 {
            engine_bug!("index_in(0)");
        }
        self.inner.random_range(0..n)
    }

    fn choice(&mut self) -> bool {
        self.inner.random()
    }

    fn true_in_one_out_of(&mut self, n: usize) -> bool {
        if n == 0 {
            engine_bug!("true_in_one_out_of(0)");
        }
        self.inner.random_range(0..n) == 0
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        RngCore::fill_bytes(&mut self.inner, dest);
    }
}
